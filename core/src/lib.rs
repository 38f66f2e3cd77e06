//! Signal-processing core for two-microphone angle-of-arrival estimation.
//!
//! A recording pair flows through band-pass filtering, spectral noise gating,
//! band-limited upsampling and FFT cross-correlation; the correlation peak
//! inside the physical lag window is mapped to an angle in degrees.

pub mod config;
pub mod interface;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use config::EstimatorConfig;
pub use interface::Estimate;
pub use pipeline::Estimator;
pub use prelude::{ChannelPair, ProcessingStage, StageError, StageInput, StageOutput, StageResult};
