//! Windowed spectrum transformer for real-time visualization
//!
//! Samples are appended one at a time into a fixed analysis window. When the
//! window fills, the caller runs [`SpectrumTransformer::transform`], which
//! applies a Hann taper, runs the FFT, averages bin magnitudes per band,
//! applies the band gains and finally normalizes. All buffers are allocated
//! up front; nothing allocates once audio is flowing.

use crate::bands::BandLayout;
use crate::fft::{RustFftEngine, SpectralFft};
use crate::normalizer::{NormalizationMode, Normalizer, PeakSettings};
use crate::{AnalysisError, BAR_COUNT, FFT_SIZE, MAGNITUDE_LIMIT};
use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use tracing::debug;

/// Construction-time analyzer parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerSettings {
    pub fft_size: usize,
    pub bar_count: usize,
    /// Ceiling of normalized output
    pub output_scale: f32,
    pub normalization: NormalizationMode,
    pub peaks: PeakSettings,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            fft_size: FFT_SIZE,
            bar_count: BAR_COUNT,
            output_scale: MAGNITUDE_LIMIT,
            normalization: NormalizationMode::default(),
            peaks: PeakSettings::default(),
        }
    }
}

/// Accumulates samples and turns each full window into bar magnitudes
pub struct SpectrumTransformer {
    settings: AnalyzerSettings,
    layout: BandLayout,
    fft: Box<dyn SpectralFft>,
    normalizer: Box<dyn Normalizer>,
    /// Analysis window, filled up to `write_index`
    window_buffer: Vec<f32>,
    write_index: usize,
    /// Precomputed Hann taper
    hann: Vec<f32>,
    /// Tapered copy of the window handed to the FFT
    fft_input: Vec<f32>,
    fft_output: Vec<Complex<f32>>,
    /// Latest magnitudes (raw, then normalized in place)
    magnitudes: Vec<f32>,
    windows_processed: u64,
}

impl SpectrumTransformer {
    /// Create a transformer using the `rustfft` engine
    pub fn new(settings: AnalyzerSettings) -> Result<Self, AnalysisError> {
        Self::with_fft(settings, Box::new(RustFftEngine::new(settings.fft_size)))
    }

    /// Create a transformer around a caller-supplied FFT engine
    pub fn with_fft(
        settings: AnalyzerSettings,
        fft: Box<dyn SpectralFft>,
    ) -> Result<Self, AnalysisError> {
        let n = settings.fft_size;
        let layout = BandLayout::new(n, settings.bar_count)?;
        if fft.len() != n {
            return Err(AnalysisError::FftLength {
                expected: n,
                actual: fft.len(),
            });
        }

        let hann = (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (n - 1) as f32).cos()))
            .collect();

        debug!(
            fft_size = n,
            bars = settings.bar_count,
            normalization = %settings.normalization,
            boundaries = ?layout.boundaries(),
            "Spectrum transformer ready"
        );

        Ok(Self {
            normalizer: settings
                .normalization
                .build(settings.bar_count, &settings.peaks),
            settings,
            layout,
            fft,
            window_buffer: vec![0.0; n],
            write_index: 0,
            hann,
            fft_input: vec![0.0; n],
            fft_output: vec![Complex::new(0.0, 0.0); n / 2],
            magnitudes: vec![0.0; settings.bar_count],
            windows_processed: 0,
        })
    }

    /// Append one sample in [-1, 1]. Returns true once the window is full.
    #[inline]
    pub fn push(&mut self, sample: f32) -> bool {
        if self.write_index < self.window_buffer.len() {
            self.window_buffer[self.write_index] = sample;
            self.write_index += 1;
        }
        self.write_index >= self.window_buffer.len()
    }

    /// Transform the current window into normalized bar magnitudes.
    ///
    /// Only valid once [`push`](Self::push) has reported a full window; an
    /// incomplete window is left in place and reported as an error. A full
    /// window is consumed either way; on FFT failure the previous magnitudes
    /// stay untouched and the error is returned for the caller to log.
    pub fn transform(&mut self) -> Result<&[f32], AnalysisError> {
        let needed = self.window_buffer.len();
        if self.write_index < needed {
            return Err(AnalysisError::IncompleteWindow {
                buffered: self.write_index,
                needed,
            });
        }

        self.write_index = 0;
        self.windows_processed += 1;

        for ((out, &sample), &w) in self
            .fft_input
            .iter_mut()
            .zip(&self.window_buffer)
            .zip(&self.hann)
        {
            *out = sample * w;
        }

        self.fft.forward(&self.fft_input, &mut self.fft_output)?;

        let bins = self.fft_output.len();
        for (band, (magnitude, &gain)) in self
            .magnitudes
            .iter_mut()
            .zip(self.layout.gains())
            .enumerate()
        {
            let range = self.layout.bin_range(band);
            let end = range.end.min(bins);
            let start = range.start.min(end);

            let count = end - start;
            let sum: f32 = self.fft_output[start..end].iter().map(|c| c.norm()).sum();

            *magnitude = if count > 0 {
                (sum / count as f32) * gain
            } else {
                0.0
            };
        }

        self.normalizer
            .normalize(&mut self.magnitudes, self.settings.output_scale);

        Ok(&self.magnitudes)
    }

    /// Discard samples accumulated toward the current window
    pub fn clear(&mut self) {
        self.write_index = 0;
    }

    /// Discard accumulated samples and drop peak state to the floor
    pub fn reset(&mut self) {
        self.clear();
        self.normalizer.reset();
        self.magnitudes.fill(0.0);
    }

    /// Latest computed magnitudes
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Samples waiting in the current window
    pub fn buffered(&self) -> usize {
        self.write_index
    }

    /// Completed windows since construction
    pub fn windows_processed(&self) -> u64 {
        self.windows_processed
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    pub fn normalizer(&self) -> &dyn Normalizer {
        self.normalizer.as_ref()
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }
}
