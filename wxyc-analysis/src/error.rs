//! Analysis errors

use thiserror::Error;

/// Errors raised while building or running the spectrum analyzer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("FFT size must be a power of two >= 8, got {0}")]
    InvalidFftSize(usize),
    #[error("Band count must be at least 1")]
    InvalidBandCount,
    #[error("{bands} bands do not fit in {bins} usable bins")]
    TooManyBands { bands: usize, bins: usize },
    #[error("FFT expected {expected} samples, got {actual}")]
    FftLength { expected: usize, actual: usize },
    #[error("Analysis window holds {buffered} of {needed} samples")]
    IncompleteWindow { buffered: usize, needed: usize },
    #[error("FFT failed: {0}")]
    Fft(String),
}
