//! Rolling volatility — sample standard deviation of log returns.
//!
//! `volatility_n` = std of the n log returns ending at the current bar.
//! Needs n + 1 bars.

use crate::domain::Bar;

use super::{sample_std, Indicator};

#[derive(Debug, Clone)]
pub struct Volatility {
    period: usize,
    name: String,
}

impl Volatility {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "volatility period must be >= 2");
        Self {
            period,
            name: format!("volatility_{period}"),
        }
    }
}

impl Indicator for Volatility {
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
        let tail = &window[window.len() - self.period - 1..];
        let mut returns = Vec::with_capacity(self.period);
        for pair in tail.windows(2) {
            if pair[0].close <= 0.0 || pair[1].close <= 0.0 {
                return None;
            }
            returns.push((pair[1].close / pair[0].close).ln());
        }
        sample_std(&returns)
    }
}
