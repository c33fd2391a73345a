use crate::spectrum::Psd;
use carrierwave_core::{Complex64, Frame, SchemeLayout};
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sample rate {0} Hz cannot be stored in a WAV header")]
    SampleRate(f64),

    #[error("PSD estimates have different lengths ({0} vs {1})")]
    PsdMismatch(usize, usize),
}

/// Write complex samples as a 2-channel (I, Q) 32-bit float WAV file.
pub fn write_iq_wav(
    path: &Path,
    samples: &[Complex64],
    sample_rate: f64,
) -> Result<(), OutputError> {
    let rate = sample_rate.round();
    if !(1.0..=u32::MAX as f64).contains(&rate) {
        return Err(OutputError::SampleRate(sample_rate));
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate: rate as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for sample in samples {
        writer.write_sample(sample.re as f32)?;
        writer.write_sample(sample.im as f32)?;
    }
    writer.finalize()?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct SubbandReport {
    pub bins: Vec<i32>,
    pub center_bin: i32,
}

#[derive(Debug, Serialize)]
pub struct UfmcReport {
    pub tones_per_subband: usize,
    pub subbands: Vec<SubbandReport>,
    pub dropped_bins: Vec<i32>,
    pub filter_taps: Vec<f64>,
    pub sidelobe_atten_db: f64,
    pub cutoff: f64,
}

/// JSON view of `FrameMetadata` for external plotting tools.
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub scheme: String,
    pub sample_rate: f64,
    pub fft_len: usize,
    pub modulation_order: usize,
    pub num_symbols: usize,
    pub bins: Vec<i32>,
    pub preamble_len: usize,
    pub guard_len: usize,
    pub block_len: usize,
    pub total_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cyclic_prefix_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ufmc: Option<UfmcReport>,
}

impl FrameReport {
    pub fn new(frame: &Frame, sample_rate: f64) -> Self {
        let meta = &frame.metadata;
        let (cyclic_prefix_len, ufmc) = match &meta.layout {
            SchemeLayout::Ofdm { cyclic_prefix_len } => (Some(*cyclic_prefix_len), None),
            SchemeLayout::Ufmc { subbands, filter } => (
                None,
                Some(UfmcReport {
                    tones_per_subband: subbands.tones_per_subband,
                    subbands: subbands
                        .subbands
                        .iter()
                        .map(|s| SubbandReport {
                            bins: s.bins.clone(),
                            center_bin: s.center_bin,
                        })
                        .collect(),
                    dropped_bins: subbands.dropped.clone(),
                    filter_taps: filter.taps.clone(),
                    sidelobe_atten_db: filter.sidelobe_atten_db,
                    cutoff: filter.cutoff,
                }),
            ),
        };

        Self {
            scheme: meta.scheme.to_string(),
            sample_rate,
            fft_len: meta.fft_len,
            modulation_order: meta.modulation_order,
            num_symbols: meta.num_symbols,
            bins: meta.bins.clone(),
            preamble_len: meta.preamble.len(),
            guard_len: meta.guard_len,
            block_len: meta.block_len,
            total_len: meta.total_len,
            cyclic_prefix_len,
            ufmc,
        }
    }
}

pub fn write_metadata(path: &Path, report: &FrameReport) -> Result<(), OutputError> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

/// CSV with one row per frequency bin: `freq_hz,ofdm_db,ufmc_db`.
pub fn write_psd_csv(
    path: &Path,
    ofdm: &Psd,
    ufmc: &Psd,
    sample_rate: f64,
) -> Result<(), OutputError> {
    if ofdm.power.len() != ufmc.power.len() {
        return Err(OutputError::PsdMismatch(ofdm.power.len(), ufmc.power.len()));
    }

    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "freq_hz,ofdm_db,ufmc_db")?;
    for ((f, a), b) in ofdm.freqs.iter().zip(&ofdm.power).zip(&ufmc.power) {
        writeln!(
            file,
            "{:.3},{:.4},{:.4}",
            f * sample_rate,
            10.0 * a.max(f64::MIN_POSITIVE).log10(),
            10.0 * b.max(f64::MIN_POSITIVE).log10()
        )?;
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrierwave_core::{Numerology, UfmcParams, UfmcSynthesizer};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ufmc_report_fields() {
        let numerology = Numerology { num_symbols: 1, ..Numerology::default() };
        let mut synth = UfmcSynthesizer::new(numerology, UfmcParams::default()).unwrap();
        let bits = vec![true; synth.frame_bits()];
        let frame = synth.synthesize(&bits, &mut StdRng::seed_from_u64(0)).unwrap();

        let report = FrameReport::new(&frame, numerology.sample_rate);
        assert_eq!(report.scheme, "UFMC");
        assert_eq!(report.total_len, 256 + 42 + 298);
        assert!(report.cyclic_prefix_len.is_none());

        let ufmc = report.ufmc.as_ref().unwrap();
        assert_eq!(ufmc.subbands.len(), 10);
        assert_eq!(ufmc.filter_taps.len(), 43);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ufmc"]["tones_per_subband"], 20);
        assert!(json.get("cyclic_prefix_len").is_none());
    }

    #[test]
    fn test_rejects_unrepresentable_sample_rate() {
        let path = std::env::temp_dir().join("carrierwave_bad_rate.wav");
        let result = write_iq_wav(&path, &[], 1.0e12);
        assert!(matches!(result, Err(OutputError::SampleRate(_))));
    }
}
