use crate::bins::SubbandLayout;
use crate::filter::PrototypeFilter;
use rustfft::num_complex::Complex64;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ofdm,
    Ufmc,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Ofdm => write!(f, "OFDM"),
            Scheme::Ufmc => write!(f, "UFMC"),
        }
    }
}

/// Scheme-specific structure of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemeLayout {
    Ofdm { cyclic_prefix_len: usize },
    Ufmc { subbands: SubbandLayout, filter: PrototypeFilter },
}

/// Structural description of a synthesized frame
///
/// Informational only: nothing here is read back during synthesis.
///
/// ```text
/// | preamble | guard (zeros) | block 0 | block 1 | ... | block K-1 |
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetadata {
    pub scheme: Scheme,
    /// Occupied bins in the order symbols were placed on them.
    pub bins: Vec<i32>,
    pub modulation_order: usize,
    pub fft_len: usize,
    pub num_symbols: usize,
    /// Zero samples between preamble and data.
    pub guard_len: usize,
    /// Samples per interval block: N + Ncp (OFDM) or N + L - 1 (UFMC).
    pub block_len: usize,
    pub preamble: Vec<Complex64>,
    pub total_len: usize,
    pub layout: SchemeLayout,
}

impl FrameMetadata {
    pub fn data_offset(&self) -> usize {
        self.preamble.len() + self.guard_len
    }
}

/// Finished baseband frame and its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub samples: Vec<Complex64>,
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn preamble(&self) -> &[Complex64] {
        &self.samples[..self.metadata.preamble.len()]
    }

    /// Samples after the preamble and guard.
    pub fn data(&self) -> &[Complex64] {
        &self.samples[self.metadata.data_offset()..]
    }

    /// Block of symbol interval `index`, or `None` past the last interval.
    pub fn block(&self, index: usize) -> Option<&[Complex64]> {
        if index >= self.metadata.num_symbols {
            return None;
        }
        let start = index * self.metadata.block_len;
        self.data().get(start..start + self.metadata.block_len)
    }
}
