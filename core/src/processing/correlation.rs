use serde::{Deserialize, Serialize};

use crate::math::fft::FftHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{StageError, StageResult};

/// Circular cross-correlation with lag 0 at index `len / 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationBuffer {
    pub values: Vec<f64>,
    /// `sqrt(sum(a^2) * sum(b^2))` of the correlated channels.
    pub norm: f64,
}

impl CorrelationBuffer {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn midpoint(&self) -> usize {
        self.values.len() / 2
    }

    /// Largest symmetric lag reachable on both sides of the midpoint.
    pub fn max_lag(&self) -> usize {
        let mid = self.midpoint();
        mid.min(self.values.len().saturating_sub(1) - mid)
    }

    pub fn at_lag(&self, lag: isize) -> Option<f64> {
        let index = self.midpoint() as isize + lag;
        if index < 0 {
            return None;
        }
        self.values.get(index as usize).copied()
    }
}

/// FFT-based correlator. The value at lag `m` is `sum_i a[i + m] * b[i]`, so a
/// `b` that lags `a` by `k` samples peaks at lag `-k`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossCorrelator;

impl CrossCorrelator {
    pub fn new() -> Self {
        Self
    }

    pub fn correlate(&self, a: &[f64], b: &[f64]) -> StageResult<CorrelationBuffer> {
        if a.is_empty() || a.len() != b.len() {
            return Err(StageError::InputShape(format!(
                "correlation needs equal non-empty channels, got {} and {}",
                a.len(),
                b.len()
            )));
        }

        let size = (2 * a.len() - 1).next_power_of_two();
        let mut fft = FftHelper::new(size);
        let spectrum_a = fft.forward_real(a);
        let spectrum_b = fft.forward_real(b);
        let cross = spectrum_a
            .iter()
            .zip(spectrum_b.iter())
            .map(|(x, y)| x * y.conj())
            .collect();

        let mut values = fft.inverse_real(cross);
        values.rotate_right(size / 2);

        let norm = (StatsHelper::energy(a) * StatsHelper::energy(b)).sqrt();
        Ok(CorrelationBuffer { values, norm })
    }
}
