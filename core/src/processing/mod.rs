pub mod angle;
pub mod bandpass;
pub mod correlation;
pub mod delay;
pub mod noise;
pub mod resample;

pub use angle::AngleMapper;
pub use bandpass::{BandpassStage, FilterKernel};
pub use correlation::{CorrelationBuffer, CrossCorrelator};
pub use delay::{DelayEstimate, DelayEstimator};
pub use noise::{NoiseStage, NoiseSuppressor};
pub use resample::{ResampleStage, Resampler};
