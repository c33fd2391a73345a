use carrierwave_core::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Two-sided power spectral density, DC in the middle.
#[derive(Debug, Clone)]
pub struct Psd {
    /// Normalized frequency in cycles/sample, ascending over [-0.5, 0.5).
    pub freqs: Vec<f64>,
    pub power: Vec<f64>,
}

/// Peak-to-average power ratio in dB.
pub fn papr_db(samples: &[Complex64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let peak = samples.iter().map(|s| s.norm_sqr()).fold(0.0, f64::max);
    let mean = samples.iter().map(|s| s.norm_sqr()).sum::<f64>() / samples.len() as f64;
    if mean > 0.0 {
        10.0 * (peak / mean).log10()
    } else {
        0.0
    }
}

/// Welch estimate with a Hann window and 50% overlap.
///
/// A trailing partial segment is dropped. `segment_len` must be non-zero
/// and no longer than `samples`.
pub fn welch_psd(samples: &[Complex64], segment_len: usize) -> Psd {
    assert!(segment_len > 0 && segment_len <= samples.len(), "invalid Welch segment length");

    let window: Vec<f64> = (0..segment_len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / segment_len as f64).cos())
        .collect();
    let window_energy: f64 = window.iter().map(|w| w * w).sum();

    let fft = FftPlanner::<f64>::new().plan_fft_forward(segment_len);
    let hop = (segment_len / 2).max(1);
    let mut accum = vec![0.0; segment_len];
    let mut segments = 0usize;

    let mut start = 0;
    while start + segment_len <= samples.len() {
        let mut buffer: Vec<Complex64> = samples[start..start + segment_len]
            .iter()
            .zip(&window)
            .map(|(s, w)| *s * *w)
            .collect();
        fft.process(&mut buffer);
        for (acc, x) in accum.iter_mut().zip(&buffer) {
            *acc += x.norm_sqr();
        }
        segments += 1;
        start += hop;
    }

    let scale = 1.0 / (window_energy * segments as f64);
    let half = segment_len / 2;
    let mut freqs = Vec::with_capacity(segment_len);
    let mut power = Vec::with_capacity(segment_len);
    for k in 0..segment_len {
        // rotate so the most negative frequency comes first
        let index = (k + segment_len - half) % segment_len;
        let signed = k as f64 - half as f64;
        freqs.push(signed / segment_len as f64);
        power.push(accum[index] * scale);
    }

    Psd { freqs, power }
}

/// Share of total power at |f| >= `edge` cycles/sample.
pub fn out_of_band_fraction(psd: &Psd, edge: f64) -> f64 {
    let total: f64 = psd.power.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let outside: f64 = psd
        .freqs
        .iter()
        .zip(&psd.power)
        .filter(|(f, _)| f.abs() >= edge)
        .map(|(_, p)| p)
        .sum();
    outside / total
}
