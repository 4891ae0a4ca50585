//! Moving-average crossover — fast SMA minus slow SMA, normalized.
//!
//! `ma_cross_f_s = (sma_fast - sma_slow) / sma_slow`. Positive when the fast
//! average is above the slow one. Needs `slow` bars.

use crate::domain::Bar;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: usize,
    slow: usize,
    name: String,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1, "fast period must be >= 1");
        assert!(fast < slow, "fast period must be shorter than slow");
        Self {
            fast,
            slow,
            name: format!("ma_cross_{fast}_{slow}"),
        }
    }
}

fn sma(window: &[Bar], period: usize) -> f64 {
    window[window.len() - period..]
        .iter()
        .map(|b| b.close)
        .sum::<f64>()
        / period as f64
}

impl Indicator for MaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_lookback(&self) -> usize {
        self.slow
    }

    fn compute(&self, window: &[Bar]) -> Option<f64> {
        if window.len() < self.min_lookback() {
            return None;
        }
        let slow = sma(window, self.slow);
        if slow <= 0.0 {
            return None;
        }
        let fast = sma(window, self.fast);
        Some((fast - slow) / slow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rising_prices_cross_positive() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 110.0, 112.0]);
        let ind = MaCrossover::new(2, 6);
        // fast = (110 + 112) / 2 = 111, slow = 628 / 6
        let slow = 628.0 / 6.0;
        assert_approx(
            ind.compute(&bars).unwrap(),
            (111.0 - slow) / slow,
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn flat_prices_cross_zero() {
        let bars = make_bars(&[100.0; 10]);
        let ind = MaCrossover::new(3, 10);
        assert_approx(ind.compute(&bars).unwrap(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn falling_prices_cross_negative() {
        let bars = make_bars(&[110.0, 108.0, 106.0, 104.0, 100.0]);
        let ind = MaCrossover::new(2, 5);
        assert!(ind.compute(&bars).unwrap() < 0.0);
    }

    #[test]
    fn short_window_is_undefined() {
        let bars = make_bars(&[100.0, 101.0]);
        let ind = MaCrossover::new(2, 5);
        assert_eq!(ind.compute(&bars), None);
    }

    #[test]
    #[should_panic(expected = "fast period must be shorter than slow")]
    fn rejects_inverted_periods() {
        MaCrossover::new(10, 5);
    }
}
