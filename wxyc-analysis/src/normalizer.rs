//! Peak normalizers - auto-scale raw band magnitudes for display
//!
//! Raw magnitudes depend on mastering level, genre and band width, so they are
//! divided by a running peak that jumps up instantly and relaxes slowly. Quiet
//! passages grow back into the display range over a few seconds while loud
//! transients never overflow it.

use crate::{
    BAR_COUNT, GLOBAL_PEAK_DECAY, PEAK_FLOOR, PEAK_HISTORY_SIZE, PER_BAND_PEAK_DECAY,
};
use ringbuf::traits::{Consumer, RingBuffer};
use ringbuf::HeapRb;
use std::fmt;
use std::str::FromStr;

/// Rescales a magnitude vector in place
pub trait Normalizer: Send {
    /// Update peak state from `values` and rescale them to `[0, output_scale]`
    fn normalize(&mut self, values: &mut [f32], output_scale: f32);

    /// Drop all peak state back to the floor
    fn reset(&mut self);

    /// Current effective peaks (one per band, a single shared one, or none)
    fn peaks(&self) -> &[f32];
}

/// Peak tracking parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakSettings {
    pub floor: f32,
    pub per_band_decay: f32,
    pub global_decay: f32,
    /// Windows remembered by [`WindowedPeakNormalizer`]
    pub history_size: usize,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            floor: PEAK_FLOOR,
            per_band_decay: PER_BAND_PEAK_DECAY,
            global_decay: GLOBAL_PEAK_DECAY,
            history_size: PEAK_HISTORY_SIZE,
        }
    }
}

/// Which normalizer the analyzer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationMode {
    /// Raw magnitudes, unscaled
    None,
    /// One decaying peak shared by all bands
    Global,
    /// An independent decaying peak per band
    #[default]
    PerBand,
    /// Maximum window peak over a fixed history
    Windowed,
}

impl NormalizationMode {
    pub fn build(self, bar_count: usize, settings: &PeakSettings) -> Box<dyn Normalizer> {
        match self {
            NormalizationMode::None => Box::new(NoNormalizer),
            NormalizationMode::Global => Box::new(GlobalPeakNormalizer::new(
                settings.global_decay,
                settings.floor,
            )),
            NormalizationMode::PerBand => Box::new(PerBandPeakNormalizer::new(
                bar_count,
                settings.per_band_decay,
                settings.floor,
            )),
            NormalizationMode::Windowed => Box::new(WindowedPeakNormalizer::new(
                settings.history_size,
                settings.floor,
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NormalizationMode::None => "none",
            NormalizationMode::Global => "global",
            NormalizationMode::PerBand => "per_band",
            NormalizationMode::Windowed => "windowed",
        }
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(NormalizationMode::None),
            "global" => Ok(NormalizationMode::Global),
            "per_band" | "per-band" | "perband" => Ok(NormalizationMode::PerBand),
            "windowed" => Ok(NormalizationMode::Windowed),
            other => Err(format!("unknown normalization mode '{}'", other)),
        }
    }
}

/// Pass-through, for debugging raw magnitudes
#[derive(Debug, Default)]
pub struct NoNormalizer;

impl Normalizer for NoNormalizer {
    fn normalize(&mut self, _values: &mut [f32], _output_scale: f32) {}

    fn reset(&mut self) {}

    fn peaks(&self) -> &[f32] {
        &[]
    }
}

/// Single running peak across all bands.
///
/// Simple, but a bass-heavy track holds the ceiling up and keeps treble bars
/// short.
#[derive(Debug)]
pub struct GlobalPeakNormalizer {
    running_peak: f32,
    decay: f32,
    floor: f32,
}

impl GlobalPeakNormalizer {
    pub fn new(decay: f32, floor: f32) -> Self {
        Self {
            running_peak: floor,
            decay,
            floor,
        }
    }
}

impl Default for GlobalPeakNormalizer {
    fn default() -> Self {
        Self::new(GLOBAL_PEAK_DECAY, PEAK_FLOOR)
    }
}

impl Normalizer for GlobalPeakNormalizer {
    fn normalize(&mut self, values: &mut [f32], output_scale: f32) {
        let current_peak = values.iter().copied().fold(0.0f32, f32::max);

        self.running_peak = current_peak.max(self.running_peak * self.decay);
        self.running_peak = self.running_peak.max(self.floor);

        for value in values.iter_mut() {
            *value = (*value / self.running_peak) * output_scale;
        }
    }

    fn reset(&mut self) {
        self.running_peak = self.floor;
    }

    fn peaks(&self) -> &[f32] {
        std::slice::from_ref(&self.running_peak)
    }
}

/// One running peak per band (default)
#[derive(Debug)]
pub struct PerBandPeakNormalizer {
    running_peaks: Vec<f32>,
    decay: f32,
    floor: f32,
}

impl PerBandPeakNormalizer {
    pub fn new(bar_count: usize, decay: f32, floor: f32) -> Self {
        Self {
            running_peaks: vec![floor; bar_count],
            decay,
            floor,
        }
    }
}

impl Default for PerBandPeakNormalizer {
    fn default() -> Self {
        Self::new(BAR_COUNT, PER_BAND_PEAK_DECAY, PEAK_FLOOR)
    }
}

impl Normalizer for PerBandPeakNormalizer {
    fn normalize(&mut self, values: &mut [f32], output_scale: f32) {
        for (value, peak) in values.iter_mut().zip(self.running_peaks.iter_mut()) {
            *peak = value.max(*peak * self.decay).max(self.floor);
            *value = (*value / *peak) * output_scale;
        }
    }

    fn reset(&mut self) {
        self.running_peaks.fill(self.floor);
    }

    fn peaks(&self) -> &[f32] {
        &self.running_peaks
    }
}

/// Ceiling is the loudest window seen in the last `history_size` windows.
///
/// Unlike the decaying trackers, a loud passage holds the ceiling for a fixed
/// time and then drops out entirely.
pub struct WindowedPeakNormalizer {
    history: HeapRb<f32>,
    capacity: usize,
    ceiling: f32,
    floor: f32,
}

impl WindowedPeakNormalizer {
    pub fn new(history_size: usize, floor: f32) -> Self {
        let capacity = history_size.max(1);
        Self {
            history: HeapRb::new(capacity),
            capacity,
            ceiling: floor,
            floor,
        }
    }
}

impl Normalizer for WindowedPeakNormalizer {
    fn normalize(&mut self, values: &mut [f32], output_scale: f32) {
        let current_peak = values.iter().copied().fold(0.0f32, f32::max);
        self.history.push_overwrite(current_peak);

        self.ceiling = self
            .history
            .iter()
            .copied()
            .fold(self.floor, f32::max);

        for value in values.iter_mut() {
            *value = (*value / self.ceiling) * output_scale;
        }
    }

    fn reset(&mut self) {
        self.history = HeapRb::new(self.capacity);
        self.ceiling = self.floor;
    }

    fn peaks(&self) -> &[f32] {
        std::slice::from_ref(&self.ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAGNITUDE_LIMIT;

    /// Deterministic pseudo-random magnitudes in [0, 1e6]
    fn magnitude_sequence(windows: usize, bands: usize) -> Vec<Vec<f32>> {
        let mut state: u32 = 0x1234_5678;
        (0..windows)
            .map(|w| {
                (0..bands)
                    .map(|_| {
                        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                        let unit = (state >> 8) as f32 / (1u32 << 24) as f32;
                        // Alternate loud and near-silent stretches
                        if (w / 50) % 2 == 0 {
                            unit * 1.0e6
                        } else {
                            unit * 1.0e-2
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn assert_bounded(normalizer: &mut dyn Normalizer) {
        for mut frame in magnitude_sequence(400, BAR_COUNT) {
            normalizer.normalize(&mut frame, MAGNITUDE_LIMIT);
            for &v in &frame {
                assert!(
                    (0.0..=MAGNITUDE_LIMIT).contains(&v),
                    "normalized value {} out of range",
                    v
                );
            }
        }
    }

    #[test]
    fn test_outputs_stay_bounded() {
        let settings = PeakSettings::default();
        for mode in [
            NormalizationMode::Global,
            NormalizationMode::PerBand,
            NormalizationMode::Windowed,
        ] {
            let mut normalizer = mode.build(BAR_COUNT, &settings);
            assert_bounded(normalizer.as_mut());
        }
    }

    #[test]
    fn test_peak_relaxes_after_loud_window() {
        let mut normalizer = PerBandPeakNormalizer::default();
        let mut loud = vec![1000.0; BAR_COUNT];
        normalizer.normalize(&mut loud, MAGNITUDE_LIMIT);

        let mut previous = normalizer.peaks()[0];
        assert_eq!(previous, 1000.0);
        for _ in 0..1000 {
            let mut silent = vec![0.0; BAR_COUNT];
            normalizer.normalize(&mut silent, MAGNITUDE_LIMIT);
            let peak = normalizer.peaks()[0];
            assert!(peak < previous, "peak did not decay: {} -> {}", previous, peak);
            previous = peak;
        }
    }

    #[test]
    fn test_global_peak_relaxes_to_floor() {
        let mut normalizer = GlobalPeakNormalizer::default();
        let mut loud = vec![1.0; BAR_COUNT];
        normalizer.normalize(&mut loud, MAGNITUDE_LIMIT);

        let mut previous = normalizer.peaks()[0];
        loop {
            let mut silent = vec![0.0; BAR_COUNT];
            normalizer.normalize(&mut silent, MAGNITUDE_LIMIT);
            let peak = normalizer.peaks()[0];
            if peak == PEAK_FLOOR {
                break;
            }
            assert!(peak < previous, "peak did not decay: {} -> {}", previous, peak);
            previous = peak;
        }
        assert_eq!(normalizer.peaks()[0], PEAK_FLOOR);
    }

    #[test]
    fn test_silence_yields_zero_not_nan() {
        let mut normalizer = PerBandPeakNormalizer::default();
        let mut silent = vec![0.0; BAR_COUNT];
        normalizer.normalize(&mut silent, MAGNITUDE_LIMIT);
        assert!(silent.iter().all(|&v| v == 0.0));
        assert!(normalizer.peaks().iter().all(|&p| p == PEAK_FLOOR));
    }

    #[test]
    fn test_per_band_peaks_are_independent() {
        let mut normalizer = PerBandPeakNormalizer::new(2, PER_BAND_PEAK_DECAY, PEAK_FLOOR);
        let mut frame = vec![100.0, 1.0];
        normalizer.normalize(&mut frame, MAGNITUDE_LIMIT);
        // Each band is at its own peak, so both fill the display
        assert_eq!(frame, vec![MAGNITUDE_LIMIT, MAGNITUDE_LIMIT]);

        let mut global = GlobalPeakNormalizer::default();
        let mut frame = vec![100.0, 1.0];
        global.normalize(&mut frame, MAGNITUDE_LIMIT);
        assert_eq!(frame[0], MAGNITUDE_LIMIT);
        assert!((frame[1] - 0.64).abs() < 1e-4);
    }

    #[test]
    fn test_reset_returns_to_floor() {
        let mut normalizer = PerBandPeakNormalizer::default();
        let mut loud = vec![500.0; BAR_COUNT];
        normalizer.normalize(&mut loud, MAGNITUDE_LIMIT);
        normalizer.reset();
        assert!(normalizer.peaks().iter().all(|&p| p == PEAK_FLOOR));

        // A quiet track right after reset fills the display again
        let mut quiet = vec![0.5; BAR_COUNT];
        normalizer.normalize(&mut quiet, MAGNITUDE_LIMIT);
        assert!(quiet.iter().all(|&v| v == MAGNITUDE_LIMIT));
    }

    #[test]
    fn test_windowed_ceiling_expires() {
        let mut normalizer = WindowedPeakNormalizer::new(4, PEAK_FLOOR);
        let mut loud = vec![100.0; 2];
        normalizer.normalize(&mut loud, MAGNITUDE_LIMIT);

        for _ in 0..3 {
            let mut quiet = vec![1.0; 2];
            normalizer.normalize(&mut quiet, MAGNITUDE_LIMIT);
            assert_eq!(normalizer.peaks()[0], 100.0);
        }

        // Fifth window pushes the loud one out of a 4-slot history
        let mut quiet = vec![1.0; 2];
        normalizer.normalize(&mut quiet, MAGNITUDE_LIMIT);
        assert_eq!(normalizer.peaks()[0], 1.0);
        assert_eq!(quiet, vec![MAGNITUDE_LIMIT, MAGNITUDE_LIMIT]);
    }

    #[test]
    fn test_no_normalizer_passes_through() {
        let mut normalizer = NoNormalizer;
        let mut frame = vec![3.0, 7.5];
        normalizer.normalize(&mut frame, MAGNITUDE_LIMIT);
        assert_eq!(frame, vec![3.0, 7.5]);
        assert!(normalizer.peaks().is_empty());
    }

    #[test]
    fn test_mode_parse_roundtrip() {
        for mode in [
            NormalizationMode::None,
            NormalizationMode::Global,
            NormalizationMode::PerBand,
            NormalizationMode::Windowed,
        ] {
            assert_eq!(mode.to_string().parse::<NormalizationMode>(), Ok(mode));
        }
        assert!("loudest".parse::<NormalizationMode>().is_err());
    }
}
