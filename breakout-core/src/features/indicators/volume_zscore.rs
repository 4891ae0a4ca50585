//! Volume z-score — current volume versus the prior n-bar distribution.
//!
//! `volume_z_n = (volume[t] - mean(volume[t-n..t])) / std(volume[t-n..t])`.
//! The current bar is excluded from the baseline so a breakout-volume spike
//! stands out instead of inflating its own reference. Needs n + 1 bars.
//! Zero baseline variance makes the score undefined.

use crate::domain::Bar;

use super::{sample_std, Indicator};

#[derive(Debug, Clone)]
pub struct VolumeZScore {
    period: usize,
    name: String,
}

impl VolumeZScore {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "volume z-score period must be >= 2");
        Self {
            period,
            name: format!("volume_z_{period}"),
        }
    }
}

impl Indicator for VolumeZScore {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_lookback(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, window: &[Bar]) -> Option<f64> {
        if window.len() < self.min_lookback() {
            return None;
        }
        let current = window[window.len() - 1].volume;
        let baseline: Vec<f64> = window[window.len() - 1 - self.period..window.len() - 1]
            .iter()
            .map(|b| b.volume)
            .collect();
        let mean = baseline.iter().sum::<f64>() / baseline.len() as f64;
        let std = sample_std(&baseline)?;
        if std == 0.0 {
            return None;
        }
        Some((current - mean) / std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::{Duration, TimeZone, Utc};

    fn bars_with_volumes(volumes: &[f64]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        volumes
            .iter()
            .enumerate()
            .map(|(i, &volume)| Bar {
                symbol: "TEST".to_string(),
                timestamp: base + Duration::hours(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume,
            })
            .collect()
    }

    #[test]
    fn spike_scores_high() {
        // Baseline mean 1500, sample std 500; spike of 5000 -> z = 7.
        let bars = bars_with_volumes(&[1000.0, 1500.0, 2000.0, 5000.0]);
        let ind = VolumeZScore::new(3);
        assert_approx(ind.compute(&bars).unwrap(), 7.0, DEFAULT_EPSILON);
    }

    #[test]
    fn baseline_volume_scores_near_zero() {
        let bars = bars_with_volumes(&[1000.0, 1500.0, 2000.0, 1500.0]);
        let ind = VolumeZScore::new(3);
        assert_approx(ind.compute(&bars).unwrap(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_variance_is_undefined() {
        let bars = bars_with_volumes(&[1000.0, 1000.0, 1000.0, 5000.0]);
        let ind = VolumeZScore::new(3);
        assert_eq!(ind.compute(&bars), None);
    }

    #[test]
    fn short_window_is_undefined() {
        let bars = bars_with_volumes(&[1000.0, 2000.0]);
        let ind = VolumeZScore::new(3);
        assert_eq!(ind.compute(&bars), None);
    }
}
