//! Feature engine — per-symbol trailing windows and feature vector assembly.
//!
//! The engine owns one bounded ring buffer per symbol, sized to the largest
//! configured indicator lookback. Incoming bars are validated and
//! deduplicated before entering the window; a rejected bar is dropped and
//! logged, never fatal to the pipeline.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use thiserror::Error;

use crate::domain::{Bar, BarError};

use super::{FeatureVector, Indicator};

/// Why an incoming bar was dropped.
#[derive(Debug, Clone, Error)]
pub enum DataQualityError {
    #[error("malformed bar: {0}")]
    Malformed(#[from] BarError),
    #[error("{symbol}@{timestamp}: duplicate bar (already have this timestamp)")]
    Duplicate {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
    #[error("{symbol}@{timestamp}: out-of-order bar (last seen {last})")]
    OutOfOrder {
        symbol: String,
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

/// Trailing window state for one symbol.
///
/// Symbol states live in an index-addressed arena rather than per-symbol heap
/// objects, keeping parallel per-symbol processing free of shared-pointer
/// hazards.
#[derive(Debug)]
struct SymbolWindow {
    bars: VecDeque<Bar>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl SymbolWindow {
    fn new(capacity: usize) -> Self {
        Self {
            bars: VecDeque::with_capacity(capacity),
            last_timestamp: None,
        }
    }
}

/// Computes feature vectors from validated trailing windows.
pub struct FeatureEngine {
    indicators: Vec<Box<dyn Indicator>>,
    /// Ring buffer capacity: the max `min_lookback` across indicators.
    capacity: usize,
    index: HashMap<String, usize>,
    windows: Vec<SymbolWindow>,
    dropped_bars: u64,
}

impl FeatureEngine {
    /// Build an engine over a fixed indicator set.
    ///
    /// Panics if `indicators` is empty; the configuration layer validates
    /// before construction.
    pub fn new(indicators: Vec<Box<dyn Indicator>>) -> Self {
        assert!(!indicators.is_empty(), "at least one indicator required");
        let capacity = indicators
            .iter()
            .map(|i| i.min_lookback())
            .max()
            .unwrap_or(1);
        Self {
            indicators,
            capacity,
            index: HashMap::new(),
            windows: Vec::new(),
            dropped_bars: 0,
        }
    }

    /// Largest window any indicator needs.
    pub fn max_lookback(&self) -> usize {
        self.capacity
    }

    /// Total bars dropped for data-quality reasons since construction.
    pub fn dropped_bars(&self) -> u64 {
        self.dropped_bars
    }

    /// Validate and absorb one bar, producing its feature vector.
    ///
    /// Malformed, duplicate and out-of-order bars are dropped with a
    /// `DataQualityError`; the window is left untouched and the pipeline is
    /// expected to log and continue. Every accepted bar yields exactly one
    /// feature vector (possibly with all values undefined during warmup).
    pub fn push(&mut self, bar: Bar) -> Result<FeatureVector, DataQualityError> {
        if let Err(err) = bar.validate() {
            self.dropped_bars += 1;
            return Err(err.into());
        }

        let slot = match self.index.get(&bar.symbol) {
            Some(&i) => i,
            None => {
                let i = self.windows.len();
                self.windows.push(SymbolWindow::new(self.capacity));
                self.index.insert(bar.symbol.clone(), i);
                i
            }
        };
        let window = &mut self.windows[slot];

        if let Some(last) = window.last_timestamp {
            if bar.timestamp == last {
                self.dropped_bars += 1;
                return Err(DataQualityError::Duplicate {
                    symbol: bar.symbol,
                    timestamp: bar.timestamp,
                });
            }
            if bar.timestamp < last {
                self.dropped_bars += 1;
                return Err(DataQualityError::OutOfOrder {
                    symbol: bar.symbol,
                    timestamp: bar.timestamp,
                    last,
                });
            }
        }

        window.last_timestamp = Some(bar.timestamp);
        if window.bars.len() == self.capacity {
            window.bars.pop_front();
        }
        let symbol = bar.symbol.clone();
        let timestamp = bar.timestamp;
        window.bars.push_back(bar);

        let bars = window.bars.make_contiguous();
        let mut values = BTreeMap::new();
        for indicator in &self.indicators {
            values.insert(indicator.name().to_string(), indicator.compute(bars));
        }

        Ok(FeatureVector {
            symbol,
            timestamp,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::indicators::{MaCrossover, RollingReturn, VolumeZScore};
    use chrono::{Duration, TimeZone, Utc};

    fn bar(symbol: &str, hour: i64, close: f64) -> Bar {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Bar {
            symbol: symbol.to_string(),
            timestamp: base + Duration::hours(hour),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0 + hour as f64,
        }
    }

    fn engine() -> FeatureEngine {
        FeatureEngine::new(vec![
            Box::new(RollingReturn::new(2)),
            Box::new(VolumeZScore::new(3)),
        ])
    }

    #[test]
    fn warmup_yields_undefined_features() {
        let mut engine = engine();
        let fv = engine.push(bar("BTC-USD", 0, 100.0)).unwrap();
        assert_eq!(fv.get("return_2"), None);
        assert_eq!(fv.get("volume_z_3"), None);
        assert_eq!(fv.values.len(), 2);
    }

    #[test]
    fn features_defined_after_warmup() {
        let mut engine = engine();
        for h in 0..4 {
            let fv = engine.push(bar("BTC-USD", h, 100.0 + h as f64)).unwrap();
            if h == 3 {
                assert!(fv.is_defined("return_2"));
                assert!(fv.is_defined("volume_z_3"));
            }
        }
    }

    #[test]
    fn duplicate_timestamp_dropped() {
        let mut engine = engine();
        engine.push(bar("BTC-USD", 0, 100.0)).unwrap();
        let err = engine.push(bar("BTC-USD", 0, 101.0)).unwrap_err();
        assert!(matches!(err, DataQualityError::Duplicate { .. }));
        assert_eq!(engine.dropped_bars(), 1);
    }

    #[test]
    fn out_of_order_bar_dropped_window_intact() {
        let mut engine = engine();
        engine.push(bar("BTC-USD", 0, 100.0)).unwrap();
        engine.push(bar("BTC-USD", 2, 101.0)).unwrap();
        let err = engine.push(bar("BTC-USD", 1, 99.0)).unwrap_err();
        assert!(matches!(err, DataQualityError::OutOfOrder { .. }));
        // Later bars still process normally.
        assert!(engine.push(bar("BTC-USD", 3, 102.0)).is_ok());
    }

    #[test]
    fn malformed_bar_dropped() {
        let mut engine = engine();
        let mut b = bar("BTC-USD", 0, 100.0);
        b.close = f64::NAN;
        assert!(matches!(
            engine.push(b),
            Err(DataQualityError::Malformed(_))
        ));
        // The bad bar never entered the window.
        let fv = engine.push(bar("BTC-USD", 1, 100.0)).unwrap();
        assert_eq!(fv.get("return_2"), None);
    }

    #[test]
    fn symbols_do_not_share_windows() {
        let mut engine = engine();
        for h in 0..4 {
            engine.push(bar("BTC-USD", h, 100.0 + h as f64)).unwrap();
        }
        // A fresh symbol starts its own warmup.
        let fv = engine.push(bar("ETH-USD", 10, 2000.0)).unwrap();
        assert_eq!(fv.get("return_2"), None);
    }

    #[test]
    fn window_is_bounded() {
        let mut engine = FeatureEngine::new(vec![Box::new(RollingReturn::new(2))]);
        assert_eq!(engine.max_lookback(), 3);
        for h in 0..100 {
            engine.push(bar("BTC-USD", h, 100.0)).unwrap();
        }
        assert!(engine.windows[0].bars.len() <= 3);
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let closes = [100.0, 103.0, 99.5, 101.25, 108.0, 110.0];
        let run = || {
            let mut engine = FeatureEngine::new(vec![
                Box::new(RollingReturn::new(2)) as Box<dyn Indicator>,
                Box::new(MaCrossover::new(2, 4)),
                Box::new(VolumeZScore::new(3)),
            ]);
            let mut out = Vec::new();
            for (h, &c) in closes.iter().enumerate() {
                out.push(engine.push(bar("BTC-USD", h as i64, c)).unwrap());
            }
            out
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn cross_symbol_call_order_is_irrelevant() {
        let mut ab = engine();
        let mut ba = engine();
        let mut a_first = Vec::new();
        let mut b_first = Vec::new();
        for h in 0..5 {
            a_first.push(ab.push(bar("AAA", h, 100.0 + h as f64)).unwrap());
            ab.push(bar("BBB", h, 50.0 + h as f64)).unwrap();

            ba.push(bar("BBB", h, 50.0 + h as f64)).unwrap();
            b_first.push(ba.push(bar("AAA", h, 100.0 + h as f64)).unwrap());
        }
        assert_eq!(a_first, b_first);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Feature computation is a pure function of the bar stream.
            #[test]
            fn determinism_over_random_streams(closes in proptest::collection::vec(2.0f64..1000.0, 1..40)) {
                let run = || {
                    let mut engine = FeatureEngine::new(vec![
                        Box::new(RollingReturn::new(3)) as Box<dyn Indicator>,
                        Box::new(VolumeZScore::new(4)),
                    ]);
                    closes
                        .iter()
                        .enumerate()
                        .map(|(h, &c)| engine.push(bar("BTC-USD", h as i64, c)).unwrap())
                        .collect::<Vec<_>>()
                };
                prop_assert_eq!(run(), run());
            }
        }
    }
}
