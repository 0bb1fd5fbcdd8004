//! Audio analysis for WXYC
//!
//! Real-time spectrum analysis for the stream visualizer:
//! - Band mapping: logarithmic grouping of FFT bins into display bars
//! - FFT: windowed real-input transform behind a swappable engine trait
//! - Normalization: decaying peak trackers that auto-scale bar heights
//! - Transformer: sample accumulation and per-window band magnitudes

mod bands;
mod error;
mod fft;
mod normalizer;
mod transformer;

pub use bands::BandLayout;
pub use error::AnalysisError;
pub use fft::{RustFftEngine, SpectralFft};
pub use normalizer::{
    GlobalPeakNormalizer, NoNormalizer, NormalizationMode, Normalizer, PeakSettings,
    PerBandPeakNormalizer, WindowedPeakNormalizer,
};
pub use rustfft::num_complex::Complex;
pub use transformer::{AnalyzerSettings, SpectrumTransformer};

/// Samples per analysis window
pub const FFT_SIZE: usize = 2048;

/// Number of spectrum bars
pub const BAR_COUNT: usize = 16;

/// Snapshots kept by render-side smoothing
pub const HISTORY_LENGTH: usize = 8;

/// Ceiling of normalized bar magnitudes
pub const MAGNITUDE_LIMIT: f32 = 64.0;

/// Lowest value a running peak may decay to
pub const PEAK_FLOOR: f32 = 0.001;

/// Per-window decay of each band's running peak
pub const PER_BAND_PEAK_DECAY: f32 = 0.9997;

/// Per-window decay of the shared running peak
pub const GLOBAL_PEAK_DECAY: f32 = 0.99983;

/// Window peaks remembered by the windowed normalizer
pub const PEAK_HISTORY_SIZE: usize = 6000;

/// First usable FFT bin (0 is DC, 1 is near-DC rumble)
pub const MIN_BIN: usize = 2;
