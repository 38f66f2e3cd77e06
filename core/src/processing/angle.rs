use crate::config::EdgeCorrection;

/// Maps a lag between the two microphones to an arrival angle in degrees.
#[derive(Debug, Clone, Copy)]
pub struct AngleMapper {
    speed_of_sound: f64,
    mic_distance: f64,
    correction: EdgeCorrection,
}

impl AngleMapper {
    pub fn new(speed_of_sound: f64, mic_distance: f64, correction: EdgeCorrection) -> Self {
        Self {
            speed_of_sound,
            mic_distance,
            correction,
        }
    }

    pub fn cos_theta(&self, lag: isize, rate: f64) -> f64 {
        let delta_t = lag as f64 / rate;
        self.speed_of_sound * delta_t / self.mic_distance
    }

    /// Angle for a raw cosine, with the end-fire branches compressed.
    pub fn angle_from_cos(&self, cos_theta: f64) -> f64 {
        let EdgeCorrection {
            threshold,
            scale,
            offset,
            slope,
        } = self.correction;

        let argument = if cos_theta > threshold {
            1.0 - scale * (offset - slope * cos_theta).exp()
        } else if cos_theta < -threshold {
            -1.0 + scale * (offset + slope * cos_theta).exp()
        } else {
            cos_theta
        };
        argument.clamp(-1.0, 1.0).acos().to_degrees().clamp(0.0, 180.0)
    }

    pub fn angle_deg(&self, lag: isize, rate: f64) -> f64 {
        self.angle_from_cos(self.cos_theta(lag, rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RATE: f64 = 705_600.0;

    fn mapper() -> AngleMapper {
        AngleMapper::new(343.0, 0.1, EdgeCorrection::default())
    }

    #[test]
    fn zero_lag_is_broadside() {
        assert_relative_eq!(mapper().angle_deg(0, RATE), 90.0, epsilon = 1e-12);
    }

    #[test]
    fn opposite_lags_sum_to_half_turn() {
        let mapper = mapper();
        for lag in -500..=500 {
            let sum = mapper.angle_deg(lag, RATE) + mapper.angle_deg(-lag, RATE);
            assert_relative_eq!(sum, 180.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn angles_stay_within_half_turn() {
        let mapper = mapper();
        for lag in -2000..=2000 {
            let angle = mapper.angle_deg(lag, RATE);
            assert!((0.0..=180.0).contains(&angle), "lag {} gave {}", lag, angle);
        }
    }

    #[test]
    fn published_branches_nearly_meet_at_threshold() {
        let mapper = mapper();
        let eps = 1e-9;
        let inner = mapper.angle_from_cos(0.995);
        let outer = mapper.angle_from_cos(0.995 + eps);
        assert!((inner - outer).abs() < 0.5);
        let inner = mapper.angle_from_cos(-0.995);
        let outer = mapper.angle_from_cos(-0.995 - eps);
        assert!((inner - outer).abs() < 0.5);
    }

    #[test]
    fn continuous_correction_is_exact_at_threshold() {
        let mapper = AngleMapper::new(343.0, 0.1, EdgeCorrection::continuous(0.995, 10.92, 32.16));
        let eps = 1e-12;
        assert_relative_eq!(
            mapper.angle_from_cos(0.995),
            mapper.angle_from_cos(0.995 + eps),
            epsilon = 1e-6
        );
        assert_relative_eq!(
            mapper.angle_from_cos(-0.995),
            mapper.angle_from_cos(-0.995 - eps),
            epsilon = 1e-6
        );
    }

    #[test]
    fn end_fire_lag_is_compressed() {
        // 206 samples at 705.6 kHz is just past the physical maximum.
        let angle = mapper().angle_deg(206, RATE);
        assert!(angle > 4.0 && angle < 6.0, "got {}", angle);
        assert!(mapper().angle_deg(100_000, RATE) < 1e-3);
    }
}
