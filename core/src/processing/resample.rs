use num_complex::Complex64;
use rustfft::num_traits::Zero;

use crate::math::fft::FftHelper;
use crate::prelude::{
    ProcessingStage, StageError, StageInput, StageMetadata, StageOutput, StageResult,
};

/// Band-limited integer upsampler working on the whole channel spectrum.
///
/// Both channels of a pair share the same plan and length, so the
/// interpolation adds no relative delay between them.
pub struct Resampler {
    factor: usize,
}

impl Resampler {
    pub fn new(factor: usize) -> Self {
        Self {
            factor: factor.max(1),
        }
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    fn upsample_with(&self, fft_in: &mut FftHelper, fft_out: &mut FftHelper, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        let m = fft_out.len();
        let spectrum = fft_in.forward_real(input);

        let half = n / 2;
        let mut padded = vec![Complex64::zero(); m];
        if n % 2 == 0 {
            padded[..half].copy_from_slice(&spectrum[..half]);
            let nyquist = spectrum[half] * 0.5;
            padded[half] += nyquist;
            padded[m - half] += nyquist;
            padded[m - half + 1..].copy_from_slice(&spectrum[half + 1..]);
        } else {
            padded[..=half].copy_from_slice(&spectrum[..=half]);
            padded[m - half..].copy_from_slice(&spectrum[n - half..]);
        }

        // `inverse_real` divides by m; the interpolated signal needs 1 / n.
        let gain = m as f64;
        fft_out
            .inverse_real(padded)
            .into_iter()
            .map(|v| v * gain / n as f64)
            .collect()
    }

    /// Upsamples a single channel.
    pub fn upsample(&self, input: &[f64]) -> StageResult<Vec<f64>> {
        let target = self.target_len(input.len())?;
        if self.factor == 1 {
            return Ok(input.to_vec());
        }
        let mut fft_in = FftHelper::new(input.len());
        let mut fft_out = FftHelper::new(target);
        Ok(self.upsample_with(&mut fft_in, &mut fft_out, input))
    }

    fn target_len(&self, len: usize) -> StageResult<usize> {
        if len == 0 {
            return Err(StageError::InputShape("cannot resample an empty channel".into()));
        }
        len.checked_mul(self.factor).ok_or_else(|| {
            StageError::InputShape(format!(
                "resampled length overflows for {} samples x{}",
                len, self.factor
            ))
        })
    }
}

/// Stage lifting both channels to `factor` times the input rate.
pub struct ResampleStage {
    resampler: Resampler,
}

impl ResampleStage {
    pub fn new(factor: usize) -> Self {
        Self {
            resampler: Resampler::new(factor),
        }
    }
}

impl ProcessingStage for ResampleStage {
    fn name(&self) -> &'static str {
        "resample"
    }

    fn execute(&self, input: &StageInput) -> StageResult<StageOutput> {
        let factor = self.resampler.factor();
        let target_rate = u32::try_from(input.sample_rate as u64 * factor as u64).map_err(|_| {
            StageError::InputShape(format!(
                "upsampled rate {} x{} exceeds u32",
                input.sample_rate, factor
            ))
        })?;

        let pair = if factor == 1 {
            input.clone()
        } else {
            let target = self.resampler.target_len(input.len())?;
            let mut fft_in = FftHelper::new(input.len());
            let mut fft_out = FftHelper::new(target);
            input.map_channels(target_rate, |samples| {
                Ok(self.resampler.upsample_with(&mut fft_in, &mut fft_out, samples))
            })?
        };

        let metadata = StageMetadata {
            notes: vec![format!("{} Hz -> {} Hz", input.sample_rate, target_rate)],
        };
        Ok(StageOutput { pair, metadata })
    }
}
