use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaveformError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid modulation order {0}: must be a power of two >= 2")]
    InvalidModulationOrder(usize),

    #[error("Bit sequence length {len} is not a multiple of {chunk}")]
    BitLength { len: usize, chunk: usize },

    #[error("Bit sequence describes {actual} symbol intervals, expected {expected}")]
    SymbolCount { expected: usize, actual: usize },

    #[error("Invalid input size: expected {expected} symbols, got {actual}")]
    InvalidInputSize { expected: usize, actual: usize },

    #[error("Unknown preamble variant: {0}")]
    UnknownPreamble(String),
}

pub type Result<T> = std::result::Result<T, WaveformError>;
