/// Two time-aligned microphone channels sharing one sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPair {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    pub sample_rate: u32,
}

impl ChannelPair {
    /// Builds a pair, rejecting empty or unequal channels and a zero rate.
    pub fn new(left: Vec<f64>, right: Vec<f64>, sample_rate: u32) -> StageResult<Self> {
        if sample_rate == 0 {
            return Err(StageError::InputShape("sample rate must be positive".into()));
        }
        if left.is_empty() || right.is_empty() {
            return Err(StageError::InputShape("channels must not be empty".into()));
        }
        if left.len() != right.len() {
            return Err(StageError::InputShape(format!(
                "channel lengths differ: left {} vs right {}",
                left.len(),
                right.len()
            )));
        }
        Ok(Self {
            left,
            right,
            sample_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Applies the same per-channel transform to both sides.
    pub(crate) fn map_channels<F>(&self, sample_rate: u32, mut transform: F) -> StageResult<Self>
    where
        F: FnMut(&[f64]) -> StageResult<Vec<f64>>,
    {
        let left = transform(&self.left)?;
        let right = transform(&self.right)?;
        Self::new(left, right, sample_rate)
    }
}

/// Input payload for a processing stage.
pub type StageInput = ChannelPair;

/// Output produced by each pair-to-pair stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub pair: ChannelPair,
    pub metadata: StageMetadata,
}

/// Metadata used for chaining stages and telemetry.
#[derive(Debug, Clone, Default)]
pub struct StageMetadata {
    pub notes: Vec<String>,
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("invalid input shape: {0}")]
    InputShape(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type StageResult<T> = Result<T, StageError>;

/// A stage that turns one channel pair into another.
///
/// Stages hold only read-only configuration, so one instance can serve many
/// recordings concurrently.
pub trait ProcessingStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(&self, input: &StageInput) -> StageResult<StageOutput>;
}
