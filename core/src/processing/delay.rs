use serde::{Deserialize, Serialize};

use crate::processing::correlation::CorrelationBuffer;
use crate::prelude::{StageError, StageResult};

/// Correlation peak found inside the physical lag window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayEstimate {
    /// Samples relative to the correlation midpoint.
    pub lag: isize,
    pub peak: f64,
    /// Normalised peak in `[0, 1]`; zero for silent input.
    pub confidence: f64,
}

/// Searches `±floor(rate * factor * distance / speed)` samples around lag 0.
#[derive(Debug, Clone, Copy)]
pub struct DelayEstimator {
    speed_of_sound: f64,
    mic_distance: f64,
    window_factor: f64,
}

impl DelayEstimator {
    pub fn new(speed_of_sound: f64, mic_distance: f64, window_factor: f64) -> Self {
        Self {
            speed_of_sound,
            mic_distance,
            window_factor,
        }
    }

    pub fn half_window(&self, rate: f64) -> usize {
        (rate * self.window_factor * self.mic_distance / self.speed_of_sound).floor() as usize
    }

    /// Returns the lag of the largest correlation value in the window.
    ///
    /// Equal maxima resolve to the lag closest to zero, and to the negative
    /// lag when two are equally close. Non-finite values are skipped.
    pub fn estimate(&self, buffer: &CorrelationBuffer, rate: f64) -> StageResult<DelayEstimate> {
        let half = self.half_window(rate);
        if buffer.is_empty() || half > buffer.max_lag() {
            return Err(StageError::InputShape(format!(
                "lag window ±{} exceeds correlation half-length {}",
                half,
                buffer.max_lag()
            )));
        }

        let half = half as isize;
        let mut best: Option<(isize, f64)> = None;
        for lag in -half..=half {
            let Some(value) = buffer.at_lag(lag).filter(|v| v.is_finite()) else {
                continue;
            };
            let replace = match best {
                None => true,
                Some((best_lag, best_value)) => {
                    value > best_value || (value == best_value && lag.abs() < best_lag.abs())
                }
            };
            if replace {
                best = Some((lag, value));
            }
        }

        let (lag, peak) = best.unwrap_or((0, 0.0));
        let confidence = if buffer.norm > f64::MIN_POSITIVE && buffer.norm.is_finite() {
            (peak / buffer.norm).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(DelayEstimate {
            lag,
            peak,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::correlation::CrossCorrelator;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const RATE: f64 = 705_600.0;

    fn estimator() -> DelayEstimator {
        DelayEstimator::new(343.0, 0.1, 2.0)
    }

    fn delayed_pair(len: usize, delay: usize) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(42);
        let a: Vec<f64> = (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let mut b = vec![0.0; len];
        b[delay..].copy_from_slice(&a[..len - delay]);
        (a, b)
    }

    #[test]
    fn pure_delay_is_recovered_exactly() {
        let (a, b) = delayed_pair(1024, 37);
        let buffer = CrossCorrelator::new().correlate(&a, &b).unwrap();
        let estimate = estimator().estimate(&buffer, RATE).unwrap();
        assert_eq!(estimate.lag, -37);

        let buffer = CrossCorrelator::new().correlate(&b, &a).unwrap();
        assert_eq!(estimator().estimate(&buffer, RATE).unwrap().lag, 37);
    }

    #[test]
    fn peaks_outside_window_are_ignored() {
        let mut values = vec![0.0; 2048];
        values[1024 + 600] = 10.0;
        values[1024 - 20] = 1.0;
        let buffer = CorrelationBuffer { values, norm: 10.0 };
        let estimate = estimator().estimate(&buffer, RATE).unwrap();
        assert_eq!(estimator().half_window(RATE), 411);
        assert_eq!(estimate.lag, -20);
        assert_relative_eq!(estimate.confidence, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn flat_buffer_resolves_to_zero_lag() {
        let buffer = CorrelationBuffer {
            values: vec![0.0; 2048],
            norm: 0.0,
        };
        let estimate = estimator().estimate(&buffer, RATE).unwrap();
        assert_eq!(estimate.lag, 0);
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn symmetric_tie_prefers_negative_lag() {
        let mut values = vec![0.0; 2048];
        values[1024 - 5] = 3.0;
        values[1024 + 5] = 3.0;
        let buffer = CorrelationBuffer { values, norm: 3.0 };
        assert_eq!(estimator().estimate(&buffer, RATE).unwrap().lag, -5);
    }

    #[test]
    fn window_larger_than_buffer_is_rejected() {
        let buffer = CorrelationBuffer {
            values: vec![0.0; 64],
            norm: 1.0,
        };
        assert!(matches!(
            estimator().estimate(&buffer, RATE),
            Err(StageError::InputShape(_))
        ));
    }
}
