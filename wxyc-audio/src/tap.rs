//! Intercepted-audio tap - observes PCM on its way to the output device
//!
//! The host engine hands every decoded chunk to an [`AudioSinkFilter`] and
//! plays whatever comes back. [`SpectrumTap`] copies each chunk through
//! untouched before looking at it, then feeds the samples to the spectrum
//! transformer and publishes a frame into the shared [`VisualizerState`]
//! whenever an analysis window completes.

use crate::format::{PcmFormat, SampleEncoding};
use crate::state::{SpectrumPublisher, VisualizerState};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use wxyc_analysis::{AnalysisError, AnalyzerSettings, SpectrumTransformer};

/// Errors raised while building or configuring a tap
#[derive(Error, Debug)]
pub enum TapError {
    #[error("Unsupported PCM format: {0}")]
    UnsupportedFormat(PcmFormat),
    #[error("Analyzer error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Visualizer state already has a writer")]
    PublisherTaken,
}

/// Processing stage the playback engine calls with every decoded chunk
pub trait AudioSinkFilter: Send {
    /// Accept a new input format, returning the output format
    fn configure(&mut self, format: PcmFormat) -> Result<PcmFormat, TapError>;

    /// Process one chunk; `output` is replaced with the bytes to play
    fn queue_input(&mut self, input: &[u8], output: &mut Vec<u8>);

    /// Stream discontinuity (seek, reconnect)
    fn flush(&mut self);

    /// Playback stopped
    fn reset(&mut self);
}

/// Spectrum-analyzing passthrough filter for 16-bit PCM
pub struct SpectrumTap {
    transformer: SpectrumTransformer,
    state: Arc<VisualizerState>,
    publisher: SpectrumPublisher,
    format: Option<PcmFormat>,
    /// First byte of a sample split across two chunks
    pending_byte: Option<u8>,
    /// Mute state seen on the previous chunk
    muted: bool,
    skipped_windows: u64,
}

impl SpectrumTap {
    pub fn new(settings: AnalyzerSettings, state: Arc<VisualizerState>) -> Result<Self, TapError> {
        Self::from_transformer(SpectrumTransformer::new(settings)?, state)
    }

    /// Wrap an already-built transformer (custom FFT engine, tests)
    pub fn from_transformer(
        transformer: SpectrumTransformer,
        state: Arc<VisualizerState>,
    ) -> Result<Self, TapError> {
        let publisher = state.take_publisher().ok_or(TapError::PublisherTaken)?;
        Ok(Self::with_publisher(transformer, state, publisher))
    }

    /// Build around a publisher claimed earlier from `state`
    pub fn with_publisher(
        transformer: SpectrumTransformer,
        state: Arc<VisualizerState>,
        publisher: SpectrumPublisher,
    ) -> Self {
        Self {
            transformer,
            state,
            publisher,
            format: None,
            pending_byte: None,
            muted: false,
            skipped_windows: 0,
        }
    }

    pub fn format(&self) -> Option<PcmFormat> {
        self.format
    }

    pub fn transformer(&self) -> &SpectrumTransformer {
        &self.transformer
    }

    pub fn state(&self) -> &Arc<VisualizerState> {
        &self.state
    }

    /// Completed analysis windows
    pub fn windows_processed(&self) -> u64 {
        self.transformer.windows_processed()
    }

    /// Windows dropped because the FFT failed
    pub fn skipped_windows(&self) -> u64 {
        self.skipped_windows
    }

    /// Pick up the shared mute flag. Returns whether the tap is muted.
    ///
    /// Going muted drops the analysis state and publishes silence once.
    pub fn sync_mute(&mut self) -> bool {
        let muted = self.state.is_muted();
        if muted && !self.muted {
            debug!("Visualizer muted");
            self.transformer.reset();
            self.publisher.clear();
        }
        self.muted = muted;
        muted
    }

    #[inline]
    fn feed(&mut self, sample: i16) {
        if !self.transformer.push(sample as f32 / 32768.0) {
            return;
        }

        match self.transformer.transform() {
            Ok(magnitudes) => self.publisher.publish(magnitudes),
            Err(e) => {
                self.skipped_windows += 1;
                // 1st, 2nd, 4th, 8th... failure only
                if self.skipped_windows.is_power_of_two() {
                    warn!(error = %e, skipped = self.skipped_windows, "Skipping spectrum window");
                }
            }
        }
    }
}

impl AudioSinkFilter for SpectrumTap {
    fn configure(&mut self, format: PcmFormat) -> Result<PcmFormat, TapError> {
        if format.encoding != SampleEncoding::Pcm16 || format.channels == 0 || format.sample_rate == 0 {
            return Err(TapError::UnsupportedFormat(format));
        }

        match self.format {
            Some(previous) if previous.sample_rate != format.sample_rate => {
                // Bin layout is rate independent; only the running state goes
                debug!(
                    from = previous.sample_rate,
                    to = format.sample_rate,
                    "Sample rate changed, resetting spectrum analyzer"
                );
                self.transformer.reset();
            }
            _ => self.transformer.clear(),
        }

        debug!(%format, "Spectrum tap configured");
        self.format = Some(format);
        self.pending_byte = None;
        Ok(format)
    }

    fn queue_input(&mut self, input: &[u8], output: &mut Vec<u8>) {
        // Passthrough first; analysis never touches what gets played
        output.clear();
        output.extend_from_slice(input);

        if input.is_empty() {
            return;
        }

        if self.sync_mute() {
            // Track sample alignment so unmuting resumes on a sample boundary
            let odd = self.pending_byte.is_some() != (input.len() % 2 == 1);
            self.pending_byte = if odd { input.last().copied() } else { None };
            return;
        }

        let mut bytes = input;
        if let Some(first) = self.pending_byte.take() {
            self.feed(i16::from_ne_bytes([first, bytes[0]]));
            bytes = &bytes[1..];
        }

        let mut samples = bytes.chunks_exact(2);
        for pair in &mut samples {
            self.feed(i16::from_ne_bytes([pair[0], pair[1]]));
        }
        if let [first] = samples.remainder() {
            self.pending_byte = Some(*first);
        }
    }

    fn flush(&mut self) {
        self.transformer.clear();
        self.pending_byte = None;
        self.publisher.clear();
    }

    fn reset(&mut self) {
        self.transformer.reset();
        self.pending_byte = None;
        self.format = None;
        self.publisher.clear();
    }
}
