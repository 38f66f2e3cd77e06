use serde::{Deserialize, Serialize};

/// Angle of arrival for one recording plus the values it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Degrees in `[0, 180]`; 90 is broadside.
    pub angle_deg: f64,
    /// Correlation lag in samples at `upsampled_rate`.
    pub lag: isize,
    pub cos_theta: f64,
    pub upsampled_rate: u32,
    pub confidence: f64,
    pub low_confidence: bool,
}
