//! Range breakout — close relative to the prior n-bar high/low channel.
//!
//! The channel is built from the n bars *before* the current one, so the
//! current bar can break its own reference range. Two bands, exposed as
//! separate named instances:
//! - Upper margin: `(close - max(high[t-n..t])) / max(high[t-n..t])`
//! - Lower margin: `(min(low[t-n..t]) - close) / min(low[t-n..t])`
//!
//! A positive margin means the channel was broken in that direction.
//! Needs n + 1 bars.

use crate::domain::Bar;

use super::Indicator;

/// Which side of the channel the margin is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBand {
    UpperMargin,
    LowerMargin,
}

#[derive(Debug, Clone)]
pub struct RangeBreakout {
    period: usize,
    band: RangeBand,
    name: String,
}

impl RangeBreakout {
    pub fn upper_margin(period: usize) -> Self {
        assert!(period >= 1, "range breakout period must be >= 1");
        Self {
            period,
            band: RangeBand::UpperMargin,
            name: format!("range_break_up_{period}"),
        }
    }

    pub fn lower_margin(period: usize) -> Self {
        assert!(period >= 1, "range breakout period must be >= 1");
        Self {
            period,
            band: RangeBand::LowerMargin,
            name: format!("range_break_dn_{period}"),
        }
    }
}

impl Indicator for RangeBreakout {
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
        let close = window[window.len() - 1].close;
        let channel = &window[window.len() - 1 - self.period..window.len() - 1];

        match self.band {
            RangeBand::UpperMargin => {
                let channel_high = channel.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
                if channel_high <= 0.0 {
                    return None;
                }
                Some((close - channel_high) / channel_high)
            }
            RangeBand::LowerMargin => {
                let channel_low = channel.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
                if channel_low <= 0.0 {
                    return None;
                }
                Some((channel_low - close) / channel_low)
            }
        }
    }
}
