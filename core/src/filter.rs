use crate::error::{Result, WaveformError};
use rustfft::num_complex::{Complex, Complex64};
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Dolph-Chebyshev window of `len` taps with sidelobes `atten_db` below the
/// main lobe.
///
/// The window is the inverse DFT of the Chebyshev polynomial of degree
/// `len - 1` sampled on the unit circle, so all sidelobes sit at exactly
/// `-atten_db`. Output is symmetric and normalized to a peak of 1.
pub fn chebyshev_window(len: usize, atten_db: f64) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }

    let order = (len - 1) as f64;
    let ripple = 10f64.powf(atten_db.abs() / 20.0);
    let beta = (ripple.acosh() / order).cosh();
    let odd = len % 2 == 1;

    let mut buffer: Vec<Complex64> = (0..len)
        .map(|k| {
            let x = beta * (PI * k as f64 / len as f64).cos();
            let p = if x > 1.0 {
                (order * x.acosh()).cosh()
            } else if x < -1.0 {
                let sign = if odd { 1.0 } else { -1.0 };
                sign * (order * (-x).acosh()).cosh()
            } else {
                (order * x.acos()).cos()
            };
            if odd {
                Complex::new(p, 0.0)
            } else {
                // half-sample shift centres an even-length window
                Complex::from_polar(p, PI * k as f64 / len as f64)
            }
        })
        .collect();

    FftPlanner::<f64>::new().plan_fft_forward(len).process(&mut buffer);

    // buffer holds the right half of the window starting at its centre
    let mut window = Vec::with_capacity(len);
    if odd {
        let half = (len + 1) / 2;
        window.extend(buffer[1..half].iter().rev().map(|c| c.re));
        window.extend(buffer[..half].iter().map(|c| c.re));
    } else {
        let half = len / 2 + 1;
        window.extend(buffer[1..half].iter().rev().map(|c| c.re));
        window.extend(buffer[1..half].iter().map(|c| c.re));
    }

    let peak = window.iter().cloned().fold(f64::MIN, f64::max);
    if peak > 0.0 {
        for w in window.iter_mut() {
            *w /= peak;
        }
    }
    window
}

/// Linear-phase lowpass prototype shared by every UFMC subband.
#[derive(Debug, Clone, PartialEq)]
pub struct PrototypeFilter {
    /// Real, symmetric taps with unit DC gain.
    pub taps: Vec<f64>,
    pub sidelobe_atten_db: f64,
    /// Cutoff as a fraction of Nyquist, i.e. one subband's share of the
    /// transform bandwidth.
    pub cutoff: f64,
}

impl PrototypeFilter {
    /// Windowed-sinc design: ideal lowpass at `cutoff` (fraction of Nyquist,
    /// in `(0, 1]`) shaped by a Dolph-Chebyshev window.
    pub fn design(len: usize, sidelobe_atten_db: f64, cutoff: f64) -> Result<Self> {
        if len == 0 {
            return Err(WaveformError::InvalidConfig("filter length must be non-zero".to_string()));
        }
        if !(cutoff > 0.0 && cutoff <= 1.0) {
            return Err(WaveformError::InvalidConfig(format!(
                "filter cutoff must be in (0, 1], got {}",
                cutoff
            )));
        }
        if !sidelobe_atten_db.is_finite() || sidelobe_atten_db <= 0.0 {
            return Err(WaveformError::InvalidConfig(format!(
                "stopband attenuation must be positive, got {}",
                sidelobe_atten_db
            )));
        }

        let window = chebyshev_window(len, sidelobe_atten_db);
        let mid = (len - 1) as f64 / 2.0;
        let mut taps: Vec<f64> = window
            .iter()
            .enumerate()
            .map(|(n, w)| cutoff * sinc(cutoff * (n as f64 - mid)) * w)
            .collect();

        let dc_gain: f64 = taps.iter().sum();
        for t in taps.iter_mut() {
            *t /= dc_gain;
        }

        log::debug!(
            "designed {}-tap prototype filter, cutoff {:.4}, {} dB sidelobes",
            len,
            cutoff,
            sidelobe_atten_db
        );

        Ok(Self {
            taps,
            sidelobe_atten_db,
            cutoff,
        })
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Taps modulated up to `center_bin` of an `fft_len`-point transform:
    /// `h[n] * exp(j*2*pi*center_bin*n/fft_len)`.
    pub fn shifted(&self, center_bin: i32, fft_len: usize) -> Vec<Complex64> {
        let step = 2.0 * PI * center_bin as f64 / fft_len as f64;
        self.taps
            .iter()
            .enumerate()
            .map(|(n, &h)| Complex64::from_polar(h, step * n as f64))
            .collect()
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Full linear convolution, output length `signal.len() + taps.len() - 1`.
pub fn convolve(signal: &[Complex64], taps: &[Complex64]) -> Vec<Complex64> {
    if signal.is_empty() || taps.is_empty() {
        return Vec::new();
    }

    let mut output = vec![Complex64::new(0.0, 0.0); signal.len() + taps.len() - 1];
    for (i, &x) in signal.iter().enumerate() {
        for (j, &h) in taps.iter().enumerate() {
            output[i + j] += x * h;
        }
    }
    output
}
