use rand::Rng;
use std::f64::consts::PI;

/// Multi-tone burst with raised-cosine edges, defined in continuous time so
/// it can be sampled at any fractional delay.
#[derive(Debug, Clone)]
pub struct ToneBurst {
    /// `(frequency Hz, phase rad, amplitude)` triples.
    tones: Vec<(f64, f64, f64)>,
    start: f64,
    stop: f64,
    ramp: f64,
}

impl ToneBurst {
    pub fn new(tones: Vec<(f64, f64, f64)>, start: f64, stop: f64, ramp: f64) -> Self {
        Self {
            tones,
            start,
            stop,
            ramp,
        }
    }

    /// Random tones between 5% and 22% of the sample rate's Nyquist band.
    pub fn random<R: Rng>(rng: &mut R, sample_rate: u32, count: usize, start: f64, stop: f64) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let amplitude = 0.8 / count.max(1) as f64;
        let tones = (0..count.max(1))
            .map(|_| {
                (
                    rng.gen_range(0.05..0.22) * nyquist,
                    rng.gen_range(0.0..2.0 * PI),
                    amplitude,
                )
            })
            .collect();
        Self::new(tones, start, stop, 0.01)
    }

    fn envelope(&self, t: f64) -> f64 {
        if t <= self.start || t >= self.stop {
            0.0
        } else if t < self.start + self.ramp {
            0.5 - 0.5 * (PI * (t - self.start) / self.ramp).cos()
        } else if t > self.stop - self.ramp {
            0.5 - 0.5 * (PI * (self.stop - t) / self.ramp).cos()
        } else {
            1.0
        }
    }

    pub fn sample(&self, t: f64) -> f64 {
        let envelope = self.envelope(t);
        if envelope == 0.0 {
            return 0.0;
        }
        envelope
            * self
                .tones
                .iter()
                .map(|&(freq, phase, amp)| amp * (2.0 * PI * freq * t + phase).sin())
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_silent_outside_its_span() {
        let burst = ToneBurst::new(vec![(1_000.0, 0.5, 1.0)], 0.1, 0.2, 0.01);
        assert_eq!(burst.sample(0.05), 0.0);
        assert_eq!(burst.sample(0.25), 0.0);
        let mid = 0.15;
        assert!((burst.sample(mid) - (2.0 * PI * 1_000.0 * mid + 0.5).sin()).abs() < 1e-12);
    }
}
