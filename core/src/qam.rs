use crate::error::{Result, WaveformError};
use rustfft::num_complex::Complex64;

/// Gray-coded rectangular QAM mapper
///
/// A chunk of b = log2(M) bits is read most-significant-bit first. The
/// first ceil(b/2) bits pick the in-phase level and the remaining floor(b/2)
/// bits the quadrature level. Each axis label is Gray-decoded into a level
/// position p, placed at amplitude 2p - (levels - 1), so neighbouring
/// points on either axis differ in exactly one bit. M = 2 collapses to BPSK
/// on the real axis.
#[derive(Debug, Clone, Copy)]
pub struct QamMapper {
    order: usize,
    i_bits: usize,
    q_bits: usize,
}

impl QamMapper {
    pub fn new(order: usize) -> Result<Self> {
        if order < 2 || !order.is_power_of_two() {
            return Err(WaveformError::InvalidModulationOrder(order));
        }
        let bits = order.trailing_zeros() as usize;
        Ok(Self {
            order,
            i_bits: (bits + 1) / 2,
            q_bits: bits / 2,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn bits_per_symbol(&self) -> usize {
        self.i_bits + self.q_bits
    }

    /// All M points in label order, scaled to unit average power over the
    /// whole constellation.
    pub fn constellation(&self) -> Vec<Complex64> {
        let mut points: Vec<Complex64> =
            (0..self.order).map(|label| self.lattice_point(label)).collect();
        normalize_power(&mut points);
        points
    }

    /// Map bits to symbols and rescale the sequence to unit mean power.
    ///
    /// The scale depends on the data, so a mapped symbol only coincides with
    /// its `constellation()` point when the labels are used evenly.
    /// Fails if `bits.len()` is not a multiple of log2(M). An empty input
    /// yields an empty output.
    pub fn map(&self, bits: &[bool]) -> Result<Vec<Complex64>> {
        let chunk = self.bits_per_symbol();
        if bits.len() % chunk != 0 {
            return Err(WaveformError::BitLength { len: bits.len(), chunk });
        }

        let mut symbols: Vec<Complex64> = bits
            .chunks_exact(chunk)
            .map(|group| {
                let label = group
                    .iter()
                    .fold(0usize, |acc, &bit| (acc << 1) | bit as usize);
                self.lattice_point(label)
            })
            .collect();

        normalize_power(&mut symbols);
        Ok(symbols)
    }

    fn lattice_point(&self, label: usize) -> Complex64 {
        let i_label = label >> self.q_bits;
        let q_label = label & ((1 << self.q_bits) - 1);
        Complex64::new(
            axis_amplitude(i_label, self.i_bits),
            axis_amplitude(q_label, self.q_bits),
        )
    }
}

fn axis_amplitude(label: usize, bits: usize) -> f64 {
    if bits == 0 {
        return 0.0;
    }
    let levels = 1usize << bits;
    let position = gray_to_binary(label);
    (2 * position) as f64 - (levels - 1) as f64
}

fn gray_to_binary(gray: usize) -> usize {
    let mut binary = gray;
    let mut shifted = gray >> 1;
    while shifted != 0 {
        binary ^= shifted;
        shifted >>= 1;
    }
    binary
}

fn normalize_power(symbols: &mut [Complex64]) {
    if symbols.is_empty() {
        return;
    }
    let mean_power = symbols.iter().map(|s| s.norm_sqr()).sum::<f64>() / symbols.len() as f64;
    if mean_power > 0.0 {
        let scale = 1.0 / mean_power.sqrt();
        for s in symbols.iter_mut() {
            *s *= scale;
        }
    }
}
