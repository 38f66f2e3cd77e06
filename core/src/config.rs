use serde::{Deserialize, Serialize};

use crate::prelude::{StageError, StageResult};

/// Windowed-sinc band-pass design parameters, cut-offs relative to Nyquist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandpassConfig {
    pub taps: usize,
    pub low_cutoff: f64,
    pub high_cutoff: f64,
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            taps: 1024,
            low_cutoff: 0.02,
            high_cutoff: 0.3,
        }
    }
}

/// Spectral gate parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseGateConfig {
    /// Leading samples of each filtered channel treated as noise only.
    pub noise_len: usize,
    pub n_fft: usize,
    pub win_length: usize,
    pub hop_length: usize,
    pub n_std_thresh: f64,
    pub n_grad_freq: usize,
    pub n_grad_time: usize,
    pub prop_decrease: f64,
}

impl Default for NoiseGateConfig {
    fn default() -> Self {
        Self {
            noise_len: 4000,
            n_fft: 8192,
            win_length: 8192,
            hop_length: 128,
            n_std_thresh: 1.5,
            n_grad_freq: 2,
            n_grad_time: 6,
            prop_decrease: 1.0,
        }
    }
}

/// Empirical end-fire correction applied where `|cos θ|` exceeds `threshold`.
///
/// Near the threshold the angle is `acos(1 - scale * exp(offset - slope * cos θ))`.
/// The published values were fitted for a 0.1 m spacing at 343 m/s and leave a
/// step of roughly 0.4° at the switch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeCorrection {
    pub threshold: f64,
    pub scale: f64,
    pub offset: f64,
    pub slope: f64,
}

impl Default for EdgeCorrection {
    fn default() -> Self {
        Self {
            threshold: 0.995,
            scale: 10.92,
            offset: 24.17,
            slope: 32.16,
        }
    }
}

impl EdgeCorrection {
    /// Derives the offset so both branches meet exactly at `threshold`.
    pub fn continuous(threshold: f64, scale: f64, slope: f64) -> Self {
        let offset = slope * threshold + ((1.0 - threshold) / scale).ln();
        Self {
            threshold,
            scale,
            offset,
            slope,
        }
    }

    fn validate(&self) -> StageResult<()> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(StageError::Configuration(format!(
                "edge correction threshold {} must lie in (0, 1)",
                self.threshold
            )));
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(StageError::Configuration(
                "edge correction scale must be positive".into(),
            ));
        }
        if !(self.slope > 0.0 && self.slope.is_finite()) {
            return Err(StageError::Configuration(
                "edge correction slope must be positive".into(),
            ));
        }
        if !self.offset.is_finite() {
            return Err(StageError::Configuration(
                "edge correction offset must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Every constant the estimation pipeline depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Metres per second.
    pub speed_of_sound: f64,
    /// Metres between the two microphones.
    pub mic_distance: f64,
    pub upsample_factor: usize,
    /// Lag search half-window in units of `mic_distance / speed_of_sound`.
    pub search_window_factor: f64,
    /// Estimates whose normalised correlation peak falls below this are flagged.
    pub min_confidence: f64,
    pub bandpass: BandpassConfig,
    pub noise_gate: NoiseGateConfig,
    pub edge_correction: EdgeCorrection,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            speed_of_sound: 343.0,
            mic_distance: 0.1,
            upsample_factor: 16,
            search_window_factor: 2.0,
            min_confidence: 0.1,
            bandpass: BandpassConfig::default(),
            noise_gate: NoiseGateConfig::default(),
            edge_correction: EdgeCorrection::default(),
        }
    }
}

fn positive(name: &str, value: f64) -> StageResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(StageError::Configuration(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

fn nonzero(name: &str, value: usize) -> StageResult<()> {
    if value == 0 {
        Err(StageError::Configuration(format!("{} must be non-zero", name)))
    } else {
        Ok(())
    }
}

impl EstimatorConfig {
    /// Rejects constants the pipeline cannot work with.
    pub fn validate(&self) -> StageResult<()> {
        positive("speed_of_sound", self.speed_of_sound)?;
        positive("mic_distance", self.mic_distance)?;
        positive("search_window_factor", self.search_window_factor)?;
        nonzero("upsample_factor", self.upsample_factor)?;
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(StageError::Configuration(format!(
                "min_confidence {} must lie in [0, 1]",
                self.min_confidence
            )));
        }

        let band = &self.bandpass;
        nonzero("bandpass.taps", band.taps)?;
        if !(band.low_cutoff > 0.0 && band.low_cutoff < band.high_cutoff && band.high_cutoff < 1.0)
        {
            return Err(StageError::Configuration(format!(
                "bandpass cut-offs must satisfy 0 < low < high < 1, got [{}, {}]",
                band.low_cutoff, band.high_cutoff
            )));
        }

        let gate = &self.noise_gate;
        if gate.noise_len < 2 {
            return Err(StageError::Configuration(format!(
                "noise_gate.noise_len must be at least 2, got {}",
                gate.noise_len
            )));
        }
        nonzero("noise_gate.n_fft", gate.n_fft)?;
        nonzero("noise_gate.win_length", gate.win_length)?;
        nonzero("noise_gate.hop_length", gate.hop_length)?;
        if gate.n_fft % 2 != 0 {
            return Err(StageError::Configuration("noise_gate.n_fft must be even".into()));
        }
        if gate.win_length > gate.n_fft {
            return Err(StageError::Configuration(format!(
                "noise_gate.win_length {} exceeds n_fft {}",
                gate.win_length, gate.n_fft
            )));
        }
        if !(gate.n_std_thresh >= 0.0 && gate.n_std_thresh.is_finite()) {
            return Err(StageError::Configuration(
                "noise_gate.n_std_thresh must be non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&gate.prop_decrease) {
            return Err(StageError::Configuration(
                "noise_gate.prop_decrease must lie in [0, 1]".into(),
            ));
        }

        self.edge_correction.validate()
    }
}
