//! Baseband frame synthesis for OFDM and UFMC multicarrier waveforms
//!
//! Bits are mapped to Gray-coded QAM, placed on DC-free bins and turned into
//! a complex frame: `preamble | zero guard | data blocks`. OFDM blocks carry
//! a cyclic prefix; UFMC blocks are subband-filtered with a shared
//! Dolph-Chebyshev prototype instead.

pub mod error;
pub mod params;
pub mod qam;
pub mod bins;
pub mod preamble;
pub mod filter;
pub mod frame;
pub mod ofdm;
pub mod ufmc;

pub use bins::{allocate_bins, Subband, SubbandLayout};
pub use error::{Result, WaveformError};
pub use filter::{chebyshev_window, PrototypeFilter};
pub use frame::{Frame, FrameMetadata, Scheme, SchemeLayout};
pub use ofdm::{OfdmModulator, OfdmSynthesizer};
pub use params::{Numerology, UfmcParams};
pub use preamble::{generate_preamble, PreambleKind};
pub use qam::QamMapper;
pub use ufmc::UfmcSynthesizer;

pub use rustfft::num_complex::Complex64;

// UFMC defaults
pub const DEFAULT_NUM_SUBBANDS: usize = 10;
pub const DEFAULT_FILTER_LEN: usize = 43;
pub const DEFAULT_SIDELOBE_ATTEN_DB: f64 = 60.0;
