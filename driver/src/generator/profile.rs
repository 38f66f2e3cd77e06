use crate::generator::template::ToneBurst;
use crate::workflow::audio::write_stereo_wav;
use crate::workflow::runner::recording_path;
use anyhow::Context;
use aoacore::ChannelPair;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for generating synthetic two-microphone recordings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sample_rate: u32,
    pub duration_secs: f64,
    /// Noise-only lead-in before the source starts.
    pub onset_secs: f64,
    pub tones: usize,
    pub noise: f64,
    pub speed_of_sound: f64,
    pub mic_distance: f64,
    pub min_angle_deg: f64,
    pub max_angle_deg: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            duration_secs: 0.5,
            onset_secs: 0.15,
            tones: 4,
            noise: 1e-3,
            speed_of_sound: 343.0,
            mic_distance: 0.1,
            min_angle_deg: 15.0,
            max_angle_deg: 165.0,
            seed: 0,
        }
    }
}

impl GeneratorConfig {
    fn sample_count(&self) -> usize {
        (self.duration_secs * self.sample_rate as f64).round().max(1.0) as usize
    }

    /// Seconds by which the left microphone hears the source after the right.
    pub fn inter_mic_delay(&self, angle_deg: f64) -> f64 {
        self.mic_distance * angle_deg.to_radians().cos() / self.speed_of_sound
    }
}

/// Builds one recording of a burst arriving from `angle_deg`.
pub fn build_recording<R: Rng>(
    config: &GeneratorConfig,
    angle_deg: f64,
    rng: &mut R,
) -> anyhow::Result<ChannelPair> {
    let rate = config.sample_rate as f64;
    let stop = config.duration_secs - 0.05;
    let burst = ToneBurst::random(rng, config.sample_rate, config.tones, config.onset_secs, stop);

    let delay = config.inter_mic_delay(angle_deg);
    let half = delay / 2.0;
    let count = config.sample_count();
    let mut channel = |shift: f64| -> Vec<f64> {
        (0..count)
            .map(|n| {
                let jitter = if config.noise > 0.0 {
                    rng.gen_range(-config.noise..config.noise)
                } else {
                    0.0
                };
                burst.sample(n as f64 / rate - shift) + jitter
            })
            .collect()
    };
    let left = channel(half);
    let right = channel(-half);

    ChannelPair::new(left, right, config.sample_rate).context("assembling synthetic recording")
}

/// Writes `1.wav..=count.wav` plus `truth.txt` and returns the true angles.
pub fn write_synthetic_batch(
    directory: &Path,
    count: usize,
    config: &GeneratorConfig,
) -> anyhow::Result<Vec<f64>> {
    fs::create_dir_all(directory)
        .with_context(|| format!("creating {}", directory.display()))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut angles = Vec::with_capacity(count);
    for index in 1..=count {
        let angle = rng.gen_range(config.min_angle_deg..=config.max_angle_deg);
        let pair = build_recording(config, angle, &mut rng)?;
        write_stereo_wav(recording_path(directory, index), &pair)?;
        angles.push(angle);
    }

    let truth: String = angles.iter().map(|a| format!("{:?}\n", a)).collect();
    let truth_path = directory.join("truth.txt");
    fs::write(&truth_path, truth)
        .with_context(|| format!("writing {}", truth_path.display()))?;
    Ok(angles)
}
