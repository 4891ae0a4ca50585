//! Concrete indicator implementations.
//!
//! Every indicator implements the `Indicator` trait: a pure function of the
//! trailing bar window ending at the current bar. The last element of the
//! window is the current bar; a window shorter than `min_lookback()` yields
//! `None`.

pub mod ma_crossover;
pub mod range_breakout;
pub mod rolling_return;
pub mod volatility;
pub mod volume_zscore;

pub use ma_crossover::MaCrossover;
pub use range_breakout::{RangeBand, RangeBreakout};
pub use rolling_return::RollingReturn;
pub use volatility::Volatility;
pub use volume_zscore::VolumeZScore;

use crate::domain::Bar;

/// Trait for windowed indicators.
///
/// # Determinism
/// `compute` must be a pure function of the window: no interior state, no
/// dependence on call order across symbols. Recomputation from the same
/// window is required to be bit-identical.
pub trait Indicator: Send + Sync {
    /// Stable feature key (e.g., "volume_z_10", "range_break_up_14").
    fn name(&self) -> &str;

    /// Bars required in the window, current bar included.
    fn min_lookback(&self) -> usize;

    /// Compute the indicator over `window` (trailing, last bar = current).
    ///
    /// Returns `None` when the window is shorter than `min_lookback()` or
    /// the value is mathematically undefined (e.g., zero variance).
    fn compute(&self, window: &[Bar]) -> Option<f64>;
}

/// Sample standard deviation (n - 1 denominator). `None` below 2 samples.
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0,
/// volume = 1000 + i.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "TEST".to_string(),
                timestamp: base + Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: (open.min(close) - 1.0).max(0.1),
                close,
                volume: 1000.0 + i as f64,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
