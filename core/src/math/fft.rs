use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Helper that wraps a planned forward/inverse `rustfft` pair of one size.
pub struct FftHelper {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            forward,
            inverse,
            scratch: vec![Complex64::zero(); scratch_len],
            size,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Transforms a real signal, zero-padded or truncated to the plan size.
    pub fn forward_real(&mut self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&value| Complex64::new(value, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::zero());
        self.forward_in_place(&mut buffer);
        buffer
    }

    pub fn forward_in_place(&mut self, buffer: &mut [Complex64]) {
        self.forward.process_with_scratch(buffer, &mut self.scratch);
    }

    /// Inverse transform scaled by `1 / size`, returning the real part.
    pub fn inverse_real(&mut self, mut spectrum: Vec<Complex64>) -> Vec<f64> {
        spectrum.resize(self.size, Complex64::zero());
        self.inverse.process_with_scratch(&mut spectrum, &mut self.scratch);
        let scale = 1.0 / self.size as f64;
        spectrum.iter().map(|c| c.re * scale).collect()
    }

    /// Inverse of a one-sided spectrum (`size / 2 + 1` bins) of a real signal.
    pub fn inverse_half_spectrum(&mut self, half: &[Complex64]) -> Vec<f64> {
        let mut full = vec![Complex64::zero(); self.size];
        for (bin, value) in half.iter().enumerate().take(self.size / 2 + 1) {
            full[bin] = *value;
            if bin > 0 && bin < self.size - bin {
                full[self.size - bin] = value.conj();
            }
        }
        self.inverse_real(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fft_helper_returns_same_length() {
        let mut helper = FftHelper::new(4);
        let output = helper.forward_real(&[1.0, 0.0, -1.0, 0.0]);
        assert_eq!(output.len(), 4);
        assert_relative_eq!(output[1].re, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn half_spectrum_inverse_recovers_signal() {
        let signal = [0.5, -1.0, 2.0, 0.25, 0.0, 3.0];
        let mut helper = FftHelper::new(signal.len());
        let spectrum = helper.forward_real(&signal);
        let recovered = helper.inverse_half_spectrum(&spectrum[..signal.len() / 2 + 1]);
        for (expected, actual) in signal.iter().zip(recovered.iter()) {
            assert_relative_eq!(expected, actual, epsilon = 1e-12);
        }
    }
}
