//! Audio pipeline for WXYC - decoding, the visualizer tap, shared state
//!
//! - Decoder: packet-at-a-time Symphonia decoding to 16-bit PCM
//! - Tap: passthrough filter that feeds the spectrum analyzer
//! - State: lock-free latest-frame hand-off to the render thread
//! - Engine: playback thread wiring decoder, tap and output buffer together

mod decoder;
mod engine;
mod format;
mod state;
mod tap;

pub use decoder::{DecodeError, DecodeStep, StreamDecoder, StreamSource};
pub use engine::{EngineCommand, EngineError, EngineEvent, PlaybackEngine};
pub use format::{PcmFormat, SampleEncoding};
pub use state::{
    FrameInfo, SpectrumPublisher, VisualizerHistory, VisualizerSnapshot, VisualizerState,
};
pub use tap::{AudioSinkFilter, SpectrumTap, TapError};
