//! Logarithmic band layout - maps FFT bins onto display bars
//!
//! Bars are spaced evenly in log-frequency between the first usable bin and
//! the last bin below Nyquist, so low bars are a few bins wide and high bars
//! span hundreds. Each bar also carries a gain proportional to its center
//! frequency, which flattens the natural bass-heavy tilt of music spectra.

use crate::{AnalysisError, MIN_BIN};

/// Precomputed bin boundaries and gains for a fixed FFT size and bar count
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    fft_size: usize,
    /// `bar_count + 1` strictly increasing bin indices
    boundaries: Vec<usize>,
    /// One multiplicative weight per bar
    gains: Vec<f32>,
}

impl BandLayout {
    /// Build the layout for `fft_size` samples split into `bar_count` bars
    pub fn new(fft_size: usize, bar_count: usize) -> Result<Self, AnalysisError> {
        if fft_size < 8 || !fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidFftSize(fft_size));
        }
        if bar_count == 0 {
            return Err(AnalysisError::InvalidBandCount);
        }

        let min_bin = MIN_BIN;
        let max_bin = fft_size / 2 - 1;
        // B bars need B + 1 distinct boundaries inside [min_bin, max_bin]
        if bar_count > max_bin - min_bin {
            return Err(AnalysisError::TooManyBands {
                bands: bar_count,
                bins: max_bin - min_bin,
            });
        }

        let log_min = (min_bin as f64).ln();
        let log_max = (max_bin as f64).ln();

        let mut boundaries: Vec<usize> = (0..=bar_count)
            .map(|i| {
                let log_bin = log_min + (log_max - log_min) * i as f64 / bar_count as f64;
                (log_bin.exp().round() as usize).clamp(min_bin, max_bin)
            })
            .collect();

        // Low bars collapse onto the same bin; push them apart
        for i in 1..=bar_count {
            if boundaries[i] <= boundaries[i - 1] {
                boundaries[i] = boundaries[i - 1] + 1;
            }
        }

        // The forward pass can overshoot Nyquist; pull the top back down
        if boundaries[bar_count] > max_bin {
            boundaries[bar_count] = max_bin;
            for i in (0..bar_count).rev() {
                if boundaries[i] >= boundaries[i + 1] {
                    boundaries[i] = boundaries[i + 1] - 1;
                }
            }
        }

        // Linear frequency weighting (exponent 1.0)
        let gains = boundaries
            .windows(2)
            .map(|pair| {
                let center_bin = (pair[0] + pair[1]) as f32 / 2.0;
                center_bin / min_bin as f32
            })
            .collect();

        Ok(Self {
            fft_size,
            boundaries,
            gains,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bar_count(&self) -> usize {
        self.gains.len()
    }

    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    pub fn gains(&self) -> &[f32] {
        &self.gains
    }

    /// Half-open bin range `[start, end)` covered by `band`
    pub fn bin_range(&self, band: usize) -> std::ops::Range<usize> {
        self.boundaries[band]..self.boundaries[band + 1]
    }

    /// Frequency span of `band` in Hz at the given sample rate
    pub fn frequency_range(&self, band: usize, sample_rate: u32) -> (f32, f32) {
        let bin_hz = sample_rate as f32 / self.fft_size as f32;
        let range = self.bin_range(band);
        (range.start as f32 * bin_hz, range.end as f32 * bin_hz)
    }

    /// Index of the band whose range contains `freq_hz`, if any
    pub fn band_for_frequency(&self, freq_hz: f32, sample_rate: u32) -> Option<usize> {
        (0..self.bar_count()).find(|&band| {
            let (lo, hi) = self.frequency_range(band, sample_rate);
            freq_hz >= lo && freq_hz < hi
        })
    }
}
