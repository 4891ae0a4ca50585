//! Rolling return — close-to-close return over a lookback.
//!
//! `return_n = close[t] / close[t-n] - 1`. Needs n + 1 bars.

use crate::domain::Bar;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct RollingReturn {
    period: usize,
    name: String,
}

impl RollingReturn {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "rolling return period must be >= 1");
        Self {
            period,
            name: format!("return_{period}"),
        }
    }
}

impl Indicator for RollingReturn {
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
        let last = window[window.len() - 1].close;
        let base = window[window.len() - 1 - self.period].close;
        if base <= 0.0 {
            return None;
        }
        Some(last / base - 1.0)
    }
}
