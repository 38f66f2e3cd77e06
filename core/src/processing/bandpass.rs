use std::f64::consts::PI;
use std::sync::Arc;

use crate::config::BandpassConfig;
use crate::prelude::{ProcessingStage, StageInput, StageMetadata, StageOutput, StageResult};

/// Read-only FIR coefficients shared by every recording.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterKernel {
    taps: Vec<f64>,
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

impl FilterKernel {
    /// Hamming-windowed sinc band-pass, normalised to unit gain at the centre
    /// of the pass band.
    pub fn design(config: &BandpassConfig) -> Self {
        let count = config.taps;
        let (low, high) = (config.low_cutoff, config.high_cutoff);
        let alpha = 0.5 * (count as f64 - 1.0);

        let mut taps: Vec<f64> = (0..count)
            .map(|n| {
                let m = n as f64 - alpha;
                let ideal = high * sinc(high * m) - low * sinc(low * m);
                let window = if count > 1 {
                    0.54 - 0.46 * (2.0 * PI * n as f64 / (count as f64 - 1.0)).cos()
                } else {
                    1.0
                };
                ideal * window
            })
            .collect();

        let centre = 0.5 * (low + high);
        let gain: f64 = taps
            .iter()
            .enumerate()
            .map(|(n, &h)| h * (PI * (n as f64 - alpha) * centre).cos())
            .sum();
        if gain != 0.0 {
            taps.iter_mut().for_each(|h| *h /= gain);
        }

        Self { taps }
    }

    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Causal convolution with zero initial state; output length equals input.
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        (0..input.len())
            .map(|n| {
                self.taps
                    .iter()
                    .take(n + 1)
                    .enumerate()
                    .map(|(k, &h)| h * input[n - k])
                    .sum()
            })
            .collect()
    }
}

/// Band-pass stage applying one shared kernel to both channels.
pub struct BandpassStage {
    kernel: Arc<FilterKernel>,
}

impl BandpassStage {
    pub fn new(kernel: Arc<FilterKernel>) -> Self {
        Self { kernel }
    }
}

impl ProcessingStage for BandpassStage {
    fn name(&self) -> &'static str {
        "bandpass"
    }

    fn execute(&self, input: &StageInput) -> StageResult<StageOutput> {
        let pair = input.map_channels(input.sample_rate, |samples| Ok(self.kernel.apply(samples)))?;
        let metadata = StageMetadata {
            notes: vec![format!("{} taps", self.kernel.len())],
        };
        Ok(StageOutput { pair, metadata })
    }
}
