//! FFT engine abstraction
//!
//! The transformer only needs "N real samples in, N/2 complex bins out".
//! Keeping that behind a trait lets tests inject failing or instrumented
//! engines and keeps the packing convention of any particular library out of
//! the band-averaging code.

use crate::AnalysisError;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Forward real-input FFT producing the lower half of the spectrum
pub trait SpectralFft: Send {
    /// Number of real input samples per transform
    fn len(&self) -> usize;

    /// Transform `input` (exactly `len()` samples) into `len() / 2` bins.
    ///
    /// `output[0]` is DC; `output[k]` is bin `k`. Magnitudes are unscaled.
    fn forward(&mut self, input: &[f32], output: &mut [Complex<f32>]) -> Result<(), AnalysisError>;
}

/// `rustfft`-backed engine with pre-allocated work buffers
pub struct RustFftEngine {
    fft: Arc<dyn Fft<f32>>,
    /// Complex working buffer (real input, zero imaginary)
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RustFftEngine {
    /// Plan a forward transform of `size` samples
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch_len = fft.get_inplace_scratch_len();

        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }
}

impl SpectralFft for RustFftEngine {
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn forward(&mut self, input: &[f32], output: &mut [Complex<f32>]) -> Result<(), AnalysisError> {
        let n = self.buffer.len();
        if input.len() != n {
            return Err(AnalysisError::FftLength {
                expected: n,
                actual: input.len(),
            });
        }
        if output.len() < n / 2 {
            return Err(AnalysisError::FftLength {
                expected: n / 2,
                actual: output.len(),
            });
        }

        for (slot, &sample) in self.buffer.iter_mut().zip(input) {
            *slot = Complex::new(sample, 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Upper half mirrors the lower half for real input
        output[..n / 2].copy_from_slice(&self.buffer[..n / 2]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let n = 256;
        let mut engine = RustFftEngine::new(n);
        let input: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 8.0 * i as f32 / n as f32).sin())
            .collect();
        let mut output = vec![Complex::new(0.0, 0.0); n / 2];

        engine.forward(&input, &mut output).unwrap();

        let peak_bin = output
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 8);
        // Unscaled transform: a unit sine lands at N/2 in its bin
        assert!((output[8].norm() - n as f32 / 2.0).abs() < 0.01 * n as f32);
    }

    #[test]
    fn test_dc_only_in_bin_zero() {
        let n = 64;
        let mut engine = RustFftEngine::new(n);
        let input = vec![0.5f32; n];
        let mut output = vec![Complex::new(0.0, 0.0); n / 2];

        engine.forward(&input, &mut output).unwrap();

        assert!((output[0].re - 32.0).abs() < 1e-3);
        for bin in &output[1..] {
            assert!(bin.norm() < 1e-3);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let mut engine = RustFftEngine::new(64);
        let mut output = vec![Complex::new(0.0, 0.0); 32];
        let result = engine.forward(&[0.0; 63], &mut output);
        assert_eq!(
            result,
            Err(AnalysisError::FftLength {
                expected: 64,
                actual: 63
            })
        );
    }
}
