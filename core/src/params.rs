use crate::error::{Result, WaveformError};
use crate::preamble::PreambleKind;
use crate::{DEFAULT_FILTER_LEN, DEFAULT_NUM_SUBBANDS, DEFAULT_SIDELOBE_ATTEN_DB};

/// Numerology shared by the OFDM and UFMC synthesizers.
///
/// The record is immutable once built; synthesizers take a copy at
/// construction and never consult any other configuration source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Numerology {
    /// Sampling rate in Hz. Informational only, carried into reports.
    pub sample_rate: f64,
    /// Inverse transform size in samples.
    pub fft_len: usize,
    /// Cyclic prefix length in samples (OFDM only).
    pub cyclic_prefix_len: usize,
    /// Number of occupied tones, DC excluded.
    pub used_tones: usize,
    /// Constellation size M.
    pub modulation_order: usize,
    /// Number of data symbol intervals per frame.
    pub num_symbols: usize,
    pub preamble: PreambleKind,
}

impl Numerology {
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(WaveformError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.fft_len < 4 || !self.fft_len.is_power_of_two() {
            return Err(WaveformError::InvalidConfig(format!(
                "FFT length must be a power of two >= 4, got {}",
                self.fft_len
            )));
        }
        if self.used_tones == 0 || self.used_tones >= self.fft_len - 1 {
            return Err(WaveformError::InvalidConfig(format!(
                "used tones must be in 1..{}, got {}",
                self.fft_len - 1,
                self.used_tones
            )));
        }
        if self.cyclic_prefix_len > self.fft_len {
            return Err(WaveformError::InvalidConfig(format!(
                "cyclic prefix {} exceeds FFT length {}",
                self.cyclic_prefix_len, self.fft_len
            )));
        }
        if self.modulation_order < 2 || !self.modulation_order.is_power_of_two() {
            return Err(WaveformError::InvalidModulationOrder(self.modulation_order));
        }
        if self.num_symbols == 0 {
            return Err(WaveformError::InvalidConfig(
                "at least one symbol interval is required".to_string(),
            ));
        }
        Ok(())
    }

    /// log2(M)
    pub fn bits_per_symbol(&self) -> usize {
        self.modulation_order.trailing_zeros() as usize
    }

    /// Bits consumed by one OFDM symbol interval.
    pub fn bits_per_interval(&self) -> usize {
        self.used_tones * self.bits_per_symbol()
    }

    /// OFDM frame length: preamble + CP-sized guard + intervals of N + Ncp.
    pub fn ofdm_frame_len(&self) -> usize {
        let symbol_len = self.fft_len + self.cyclic_prefix_len;
        self.fft_len + self.cyclic_prefix_len + self.num_symbols * symbol_len
    }
}

/// Check that `len` bits fill exactly `num_symbols` intervals of
/// `bits_per_interval` bits each.
pub(crate) fn check_bit_count(
    len: usize,
    bits_per_interval: usize,
    num_symbols: usize,
) -> Result<()> {
    if len % bits_per_interval != 0 {
        return Err(WaveformError::BitLength {
            len,
            chunk: bits_per_interval,
        });
    }
    let intervals = len / bits_per_interval;
    if intervals != num_symbols {
        return Err(WaveformError::SymbolCount {
            expected: num_symbols,
            actual: intervals,
        });
    }
    Ok(())
}

impl Default for Numerology {
    fn default() -> Self {
        Self {
            sample_rate: 15.36e6,
            fft_len: 256,
            cyclic_prefix_len: 32,
            used_tones: 200,
            modulation_order: 4,
            num_symbols: 10,
            preamble: PreambleKind::RepeatedHalves,
        }
    }
}

/// Subband filtering parameters for the UFMC path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UfmcParams {
    pub num_subbands: usize,
    /// Prototype filter length L (odd).
    pub filter_len: usize,
    /// Stopband attenuation target in dB.
    pub sidelobe_atten_db: f64,
}

impl UfmcParams {
    pub fn validate(&self, numerology: &Numerology) -> Result<()> {
        if self.filter_len < 3 || self.filter_len % 2 == 0 {
            return Err(WaveformError::InvalidConfig(format!(
                "filter length must be odd and >= 3, got {}",
                self.filter_len
            )));
        }
        if self.num_subbands == 0 || self.num_subbands > numerology.used_tones {
            return Err(WaveformError::InvalidConfig(format!(
                "subband count must be in 1..={}, got {}",
                numerology.used_tones, self.num_subbands
            )));
        }
        if !self.sidelobe_atten_db.is_finite() || self.sidelobe_atten_db <= 0.0 {
            return Err(WaveformError::InvalidConfig(format!(
                "stopband attenuation must be positive, got {}",
                self.sidelobe_atten_db
            )));
        }
        Ok(())
    }

    /// Filter transient length, which is also the UFMC guard length.
    pub fn tail_len(&self) -> usize {
        self.filter_len - 1
    }
}

impl Default for UfmcParams {
    fn default() -> Self {
        Self {
            num_subbands: DEFAULT_NUM_SUBBANDS,
            filter_len: DEFAULT_FILTER_LEN,
            sidelobe_atten_db: DEFAULT_SIDELOBE_ATTEN_DB,
        }
    }
}
