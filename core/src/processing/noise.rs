use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;
use std::f64::consts::PI;

use crate::config::NoiseGateConfig;
use crate::math::fft::FftHelper;
use crate::math::matrix::MatrixHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{
    ProcessingStage, StageError, StageInput, StageMetadata, StageOutput, StageResult,
};

const AMIN: f64 = 1e-20;
const TOP_DB: f64 = 80.0;

/// Short-time Fourier transform with centred, mirror-padded frames.
struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f64>,
    fft: FftHelper,
}

/// Index into a signal of length `len` mirrored about its end samples.
fn reflect_index(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let folded = index.rem_euclid(period);
    if folded >= len as isize {
        (period - folded) as usize
    } else {
        folded as usize
    }
}

impl Stft {
    fn new(config: &NoiseGateConfig) -> Self {
        let n_fft = config.n_fft;
        let win = config.win_length;
        // Periodic Hann window centred inside the FFT frame.
        let lead = (n_fft - win) / 2;
        let mut window = vec![0.0; n_fft];
        for n in 0..win {
            window[lead + n] = 0.5 - 0.5 * (2.0 * PI * n as f64 / win as f64).cos();
        }
        Self {
            n_fft,
            hop: config.hop_length,
            window,
            fft: FftHelper::new(n_fft),
        }
    }

    fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Returns a `bins x frames` matrix.
    fn forward(&mut self, signal: &[f64]) -> Array2<Complex64> {
        let pad = (self.n_fft / 2) as isize;
        let frames = 1 + signal.len() / self.hop;
        let mut spectrum = Array2::zeros((self.bins(), frames));
        let mut frame = vec![0.0; self.n_fft];

        for t in 0..frames {
            let start = (t * self.hop) as isize - pad;
            for (n, value) in frame.iter_mut().enumerate() {
                let idx = reflect_index(start + n as isize, signal.len());
                *value = signal[idx] * self.window[n];
            }
            let transformed = self.fft.forward_real(&frame);
            for (bin, value) in transformed.iter().take(self.bins()).enumerate() {
                spectrum[[bin, t]] = *value;
            }
        }
        spectrum
    }

    /// Overlap-add inverse normalised by the summed squared window.
    fn inverse(&mut self, spectrum: &Array2<Complex64>, length: usize) -> Vec<f64> {
        let frames = spectrum.len_of(Axis(1));
        let total = self.n_fft + self.hop * frames.saturating_sub(1);
        let mut output = vec![0.0; total];
        let mut norm = vec![0.0; total];

        for (t, column) in spectrum.axis_iter(Axis(1)).enumerate() {
            let half: Vec<Complex64> = column.iter().copied().collect();
            let frame = self.fft.inverse_half_spectrum(&half);
            let offset = t * self.hop;
            for n in 0..self.n_fft {
                output[offset + n] += frame[n] * self.window[n];
                norm[offset + n] += self.window[n] * self.window[n];
            }
        }

        for (sample, weight) in output.iter_mut().zip(norm.iter()) {
            if *weight > f64::from(f32::MIN_POSITIVE) {
                *sample /= weight;
            }
        }

        let mut trimmed: Vec<f64> = output.into_iter().skip(self.n_fft / 2).take(length).collect();
        trimmed.resize(length, 0.0);
        trimmed
    }
}

fn amplitude_to_db(spectrum: &Array2<Complex64>) -> Array2<f64> {
    let db = spectrum.mapv(|c| 20.0 * c.norm().max(AMIN).log10());
    let ceiling = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    db.mapv(|v| v.max(ceiling - TOP_DB))
}

/// Triangular weights spanning `grad` steps either side, normalised to sum 1.
fn triangle(grad: usize) -> Vec<f64> {
    let span = grad as f64 + 1.0;
    let weights: Vec<f64> = (0..=2 * grad)
        .map(|i| 1.0 - (i as f64 - grad as f64).abs() / span)
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Noise floor in dB per frequency bin.
struct NoiseProfile {
    threshold: Array1<f64>,
}

impl NoiseProfile {
    fn from_db(noise_db: &Array2<f64>, n_std: f64) -> Self {
        let threshold = noise_db
            .axis_iter(Axis(0))
            .map(|row| {
                let values: Vec<f64> = row.iter().copied().collect();
                StatsHelper::mean(values.iter().copied()) + n_std * StatsHelper::std_dev(&values)
            })
            .collect();
        Self { threshold }
    }
}

/// Spectral gate driven by a noise-only reference segment.
pub struct NoiseSuppressor {
    config: NoiseGateConfig,
}

impl NoiseSuppressor {
    pub fn new(config: NoiseGateConfig) -> Self {
        Self { config }
    }

    /// Denoises `signal` using `reference` as the noise sample.
    ///
    /// References shorter than the analysis window are mirror-extended by the
    /// centred framing. A reference of fewer than two samples is rejected.
    pub fn suppress(&self, signal: &[f64], reference: &[f64]) -> StageResult<Vec<f64>> {
        if reference.len() < 2 {
            return Err(StageError::InputShape(format!(
                "noise reference needs at least 2 samples, got {}",
                reference.len()
            )));
        }
        if signal.is_empty() {
            return Err(StageError::InputShape("cannot denoise an empty channel".into()));
        }

        let mut stft = Stft::new(&self.config);

        let noise_db = amplitude_to_db(&stft.forward(reference));
        let profile = NoiseProfile::from_db(&noise_db, self.config.n_std_thresh);

        let mut padded = signal.to_vec();
        padded.resize(signal.len() + self.config.hop_length, 0.0);
        let spectrum = stft.forward(&padded);
        let signal_db = amplitude_to_db(&spectrum);
        let floor_db = signal_db.iter().copied().fold(f64::INFINITY, f64::min);

        let mut mask = Array2::zeros(signal_db.raw_dim());
        for ((bin, frame), value) in signal_db.indexed_iter() {
            if *value < profile.threshold[bin] {
                mask[[bin, frame]] = 1.0;
            }
        }
        let mask = MatrixHelper::convolve_separable(
            mask.view(),
            &triangle(self.config.n_grad_freq),
            &triangle(self.config.n_grad_time),
        ) * self.config.prop_decrease;

        let mut gated = spectrum;
        for ((bin, frame), value) in gated.indexed_iter_mut() {
            let magnitude = value.norm();
            if magnitude == 0.0 {
                continue;
            }
            let m = mask[[bin, frame]];
            let db = signal_db[[bin, frame]] * (1.0 - m) + floor_db * m;
            let amplitude = 10f64.powf(db / 20.0);
            *value *= amplitude / magnitude;
        }

        Ok(stft.inverse(&gated, signal.len()))
    }
}

/// Stage gating each channel against its own leading noise segment.
pub struct NoiseStage {
    suppressor: NoiseSuppressor,
    noise_len: usize,
}

impl NoiseStage {
    pub fn new(config: NoiseGateConfig) -> Self {
        let noise_len = config.noise_len;
        Self {
            suppressor: NoiseSuppressor::new(config),
            noise_len,
        }
    }
}

impl ProcessingStage for NoiseStage {
    fn name(&self) -> &'static str {
        "noise_gate"
    }

    fn execute(&self, input: &StageInput) -> StageResult<StageOutput> {
        if input.len() < self.noise_len {
            return Err(StageError::InputShape(format!(
                "channel has {} samples, noise reference needs {}",
                input.len(),
                self.noise_len
            )));
        }

        let pair = input.map_channels(input.sample_rate, |samples| {
            self.suppressor.suppress(samples, &samples[..self.noise_len])
        })?;
        let metadata = StageMetadata {
            notes: vec![
                format!("noise reference {} samples", self.noise_len),
                format!(
                    "rms left {:.3e} right {:.3e}",
                    StatsHelper::rms(&pair.left),
                    StatsHelper::rms(&pair.right)
                ),
            ],
        };
        Ok(StageOutput { pair, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::ChannelPair;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn small_config() -> NoiseGateConfig {
        NoiseGateConfig {
            noise_len: 512,
            n_fft: 256,
            win_length: 256,
            hop_length: 32,
            ..Default::default()
        }
    }

    #[test]
    fn reflect_index_mirrors_both_ends() {
        assert_eq!(reflect_index(-1, 5), 1);
        assert_eq!(reflect_index(-4, 5), 4);
        assert_eq!(reflect_index(5, 5), 3);
        assert_eq!(reflect_index(-6, 5), 2);
        assert_eq!(reflect_index(7, 1), 0);
    }

    #[test]
    fn triangle_matches_gradient_span() {
        let freq = triangle(2);
        assert_eq!(freq.len(), 5);
        assert_relative_eq!(freq.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(freq[2] / freq[0], 3.0, epsilon = 1e-12);
        assert_eq!(triangle(6).len(), 13);
    }

    #[test]
    fn unmasked_stft_round_trip_is_transparent() {
        let config = small_config();
        let mut stft = Stft::new(&config);
        let signal: Vec<f64> = (0..1000).map(|n| (n as f64 * 0.05).sin()).collect();
        let spectrum = stft.forward(&signal);
        let recovered = stft.inverse(&spectrum, signal.len());
        for (expected, actual) in signal.iter().zip(recovered.iter()) {
            assert_relative_eq!(expected, actual, epsilon = 1e-9);
        }
    }

    #[test]
    fn silence_stays_silent() {
        let suppressor = NoiseSuppressor::new(small_config());
        let output = suppressor.suppress(&[0.0; 2048], &[0.0; 512]).unwrap();
        assert_eq!(output.len(), 2048);
        assert!(output.iter().all(|v| v.is_finite() && *v == 0.0));
    }

    #[test]
    fn tone_survives_while_noise_is_attenuated() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<f64> = (0..4096).map(|_| rng.gen_range(-0.01..0.01)).collect();
        let mut signal = noise.clone();
        for (n, value) in signal.iter_mut().enumerate().skip(2048) {
            *value += (2.0 * PI * 0.1 * n as f64).sin();
        }

        let suppressor = NoiseSuppressor::new(small_config());
        let output = suppressor.suppress(&signal, &signal[..512]).unwrap();

        let head = StatsHelper::rms(&output[256..1536]);
        let tail = StatsHelper::rms(&output[2560..3584]);
        assert!(head < StatsHelper::rms(&noise[256..1536]));
        assert!(tail > 0.5);
    }

    #[test]
    fn short_reference_is_mirror_extended() {
        let mut rng = StdRng::seed_from_u64(21);
        let noise: Vec<f64> = (0..4096).map(|_| rng.gen_range(-0.01..0.01)).collect();
        let mut signal = noise.clone();
        for (n, value) in signal.iter_mut().enumerate().skip(2048) {
            *value += (2.0 * PI * 0.1 * n as f64).sin();
        }

        // 100 samples against a 256-point window.
        let suppressor = NoiseSuppressor::new(small_config());
        let output = suppressor.suppress(&signal, &signal[..100]).unwrap();

        assert_eq!(output.len(), signal.len());
        assert!(output.iter().all(|v| v.is_finite()));
        let head = StatsHelper::rms(&output[256..1536]);
        let tail = StatsHelper::rms(&output[2560..3584]);
        assert!(head < StatsHelper::rms(&noise[256..1536]));
        assert!(tail > 0.5);
    }

    #[test]
    fn stage_rejects_channels_shorter_than_reference() {
        let stage = NoiseStage::new(small_config());
        let pair = ChannelPair::new(vec![0.1; 100], vec![0.1; 100], 8000).unwrap();
        assert!(matches!(
            stage.execute(&pair),
            Err(StageError::InputShape(_))
        ));
    }

    #[test]
    fn short_reference_is_rejected() {
        let suppressor = NoiseSuppressor::new(small_config());
        assert!(suppressor.suppress(&[0.5; 64], &[0.5]).is_err());
    }
}
