use serde::{Deserialize, Serialize};

use crate::interface::Estimate;

/// Per-recording outcome as written to batch reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRecord {
    /// One-based recording number.
    pub index: usize,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<Estimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EstimateRecord {
    pub fn success(index: usize, file: impl Into<String>, estimate: Estimate) -> Self {
        Self {
            index,
            file: file.into(),
            estimate: Some(estimate),
            error: None,
        }
    }

    pub fn failure(index: usize, file: impl Into<String>, error: impl ToString) -> Self {
        Self {
            index,
            file: file.into(),
            estimate: None,
            error: Some(error.to_string()),
        }
    }

    /// Angle for the result file; failed recordings yield NaN.
    pub fn angle_or_nan(&self) -> f64 {
        self.estimate.map(|e| e.angle_deg).unwrap_or(f64::NAN)
    }
}
