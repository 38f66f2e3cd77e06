use std::sync::Arc;

use crate::config::EstimatorConfig;
use crate::interface::Estimate;
use crate::prelude::{ChannelPair, ProcessingStage, StageError, StageResult};
use crate::processing::{
    AngleMapper, BandpassStage, CrossCorrelator, DelayEstimator, FilterKernel, NoiseStage,
    ResampleStage,
};
use crate::telemetry::log::LogManager;

/// Full angle-of-arrival pipeline for one microphone pair.
///
/// Building an `Estimator` validates the configuration and designs the FIR
/// kernel once; `estimate` is then a pure function of its inputs and may be
/// called from many threads at the same time.
pub struct Estimator {
    config: EstimatorConfig,
    kernel: Arc<FilterKernel>,
    stages: Vec<Box<dyn ProcessingStage>>,
    correlator: CrossCorrelator,
    delay: DelayEstimator,
    mapper: AngleMapper,
    logger: LogManager,
}

impl Estimator {
    pub fn new(config: EstimatorConfig) -> StageResult<Self> {
        config.validate()?;

        let kernel = Arc::new(FilterKernel::design(&config.bandpass));
        let stages: Vec<Box<dyn ProcessingStage>> = vec![
            Box::new(BandpassStage::new(kernel.clone())),
            Box::new(NoiseStage::new(config.noise_gate.clone())),
            Box::new(ResampleStage::new(config.upsample_factor)),
        ];
        let delay = DelayEstimator::new(
            config.speed_of_sound,
            config.mic_distance,
            config.search_window_factor,
        );
        let mapper = AngleMapper::new(
            config.speed_of_sound,
            config.mic_distance,
            config.edge_correction,
        );

        Ok(Self {
            config,
            kernel,
            stages,
            correlator: CrossCorrelator::new(),
            delay,
            mapper,
            logger: LogManager::new("estimator"),
        })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn kernel(&self) -> &FilterKernel {
        &self.kernel
    }

    /// Estimates the arrival angle from two aligned channels.
    pub fn estimate(&self, left: &[f64], right: &[f64], sample_rate: u32) -> StageResult<Estimate> {
        let pair = ChannelPair::new(left.to_vec(), right.to_vec(), sample_rate)?;
        self.estimate_pair(pair)
    }

    pub fn estimate_pair(&self, pair: ChannelPair) -> StageResult<Estimate> {
        let noise_len = self.config.noise_gate.noise_len;
        if pair.len() < noise_len {
            return Err(StageError::InputShape(format!(
                "recording has {} samples, at least {} are needed for the noise reference",
                pair.len(),
                noise_len
            )));
        }

        let mut current = pair;
        for stage in &self.stages {
            let output = stage.execute(&current)?;
            self.logger.record(&format!(
                "{}: {}",
                stage.name(),
                output.metadata.notes.join(", ")
            ));
            current = output.pair;
        }

        let rate = current.sample_rate;
        let buffer = self.correlator.correlate(&current.left, &current.right)?;
        let delay = self.delay.estimate(&buffer, f64::from(rate))?;
        let cos_theta = self.mapper.cos_theta(delay.lag, f64::from(rate));
        let angle_deg = self.mapper.angle_from_cos(cos_theta);

        let low_confidence = delay.confidence < self.config.min_confidence;
        if low_confidence {
            self.logger.warn(&format!(
                "low confidence {:.3} (lag {}, angle {:.2})",
                delay.confidence, delay.lag, angle_deg
            ));
        } else {
            self.logger.record(&format!(
                "lag {} at {} Hz -> {:.2} deg (confidence {:.3})",
                delay.lag, rate, angle_deg, delay.confidence
            ));
        }

        Ok(Estimate {
            angle_deg,
            lag: delay.lag,
            cos_theta,
            upsampled_rate: rate,
            confidence: delay.confidence,
            low_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::PI;

    const RATE: u32 = 44_100;
    const LEN: usize = 16_384;
    const ONSET: usize = 6_000;

    fn envelope(t: f64) -> f64 {
        let start = ONSET as f64 / RATE as f64;
        let stop = (LEN - 1_500) as f64 / RATE as f64;
        let ramp = 0.01;
        if t <= start || t >= stop {
            0.0
        } else if t < start + ramp {
            0.5 - 0.5 * (PI * (t - start) / ramp).cos()
        } else if t > stop - ramp {
            0.5 - 0.5 * (PI * (stop - t) / ramp).cos()
        } else {
            1.0
        }
    }

    /// Multi-tone burst evaluated at continuous time, so any delay is exact.
    fn source(t: f64) -> f64 {
        let tones = [(900.0, 0.3), (1_700.0, 1.1), (2_600.0, 2.0), (3_900.0, 0.7)];
        envelope(t)
            * tones
                .iter()
                .map(|&(freq, phase)| 0.25 * (2.0 * PI * freq * t + phase).sin())
                .sum::<f64>()
    }

    /// `left` hears the source `delay` seconds later than `right`.
    fn recording(delay: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut channel = |shift: f64| -> Vec<f64> {
            (0..LEN)
                .map(|n| {
                    let t = n as f64 / RATE as f64;
                    source(t - shift) + rng.gen_range(-1e-3..1e-3)
                })
                .collect()
        };
        let left = channel(delay.max(0.0));
        let right = channel((-delay).max(0.0));
        (left, right)
    }

    fn estimator() -> Estimator {
        Estimator::new(EstimatorConfig::default()).unwrap()
    }

    #[test]
    fn identical_sines_are_broadside() {
        let tone: Vec<f64> = (0..8_192)
            .map(|n| (2.0 * PI * 1_000.0 * n as f64 / RATE as f64).sin())
            .collect();
        let estimate = estimator().estimate(&tone, &tone, RATE).unwrap();
        assert!((estimate.angle_deg - 90.0).abs() < 2.0, "{:?}", estimate);
        assert_eq!(estimate.upsampled_rate, RATE * 16);
    }

    #[test]
    fn end_fire_delay_maps_near_the_baseline() {
        let max_delay = 0.1 / 343.0;
        let estimator = estimator();

        let (left, right) = recording(-max_delay, 1);
        let estimate = estimator.estimate(&left, &right, RATE).unwrap();
        assert!(estimate.angle_deg > 170.0, "{:?}", estimate);
        assert!(estimate.lag < 0);

        let (left, right) = recording(max_delay, 2);
        let estimate = estimator.estimate(&left, &right, RATE).unwrap();
        assert!(estimate.angle_deg < 10.0, "{:?}", estimate);
        assert!(!estimate.low_confidence);
    }

    #[test]
    fn oblique_source_lands_near_its_angle() {
        let angle: f64 = 60.0;
        let delay = 0.1 * angle.to_radians().cos() / 343.0;
        let (left, right) = recording(delay, 3);
        let estimate = estimator().estimate(&left, &right, RATE).unwrap();
        assert!((estimate.angle_deg - angle).abs() < 3.0, "{:?}", estimate);
    }

    #[test]
    fn silence_yields_defined_low_confidence_angle() {
        let silence = vec![0.0; 8_192];
        let estimate = estimator().estimate(&silence, &silence, RATE).unwrap();
        assert_eq!(estimate.lag, 0);
        assert!((estimate.angle_deg - 90.0).abs() < 1e-9);
        assert!(estimate.low_confidence);
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn shape_errors_surface_before_processing() {
        let estimator = estimator();
        assert!(matches!(
            estimator.estimate(&[0.0; 5_000], &[0.0; 4_999], RATE),
            Err(StageError::InputShape(_))
        ));
        assert!(matches!(
            estimator.estimate(&[0.0; 3_999], &[0.0; 3_999], RATE),
            Err(StageError::InputShape(_))
        ));
        assert!(matches!(
            estimator.estimate(&[0.0; 5_000], &[0.0; 5_000], 0),
            Err(StageError::InputShape(_))
        ));
    }

    #[test]
    fn invalid_configuration_is_rejected_eagerly() {
        let config = EstimatorConfig {
            speed_of_sound: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Estimator::new(config),
            Err(StageError::Configuration(_))
        ));
    }

    #[test]
    fn estimator_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Estimator>();
    }
}
