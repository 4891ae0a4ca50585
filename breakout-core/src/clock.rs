//! Clock — drives ticks in strictly increasing timestamp order across all
//! tracked symbols.
//!
//! Two modes: backtest (deterministic iteration over a stored range, no
//! wall-clock dependency) and live (arrival-driven queue that never skips or
//! reorders a tick). The clock is the pipeline's sole serializer; cross-symbol
//! risk checks rely on every symbol sharing one global tick sequence.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use crate::domain::Bar;

/// One global timestamp's worth of bars, ordered by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub bars: Vec<Bar>,
}

/// Deterministic backtest driver over a historical bar set.
///
/// Bars are grouped by timestamp and interleaved across symbols; within a
/// tick bars are sorted by symbol so replay order never depends on input
/// order.
pub struct BacktestClock {
    ticks: std::vec::IntoIter<Tick>,
}

impl BacktestClock {
    pub fn new(bars: Vec<Bar>) -> Self {
        let mut grouped: BTreeMap<DateTime<Utc>, Vec<Bar>> = BTreeMap::new();
        for bar in bars {
            grouped.entry(bar.timestamp).or_default().push(bar);
        }
        let ticks: Vec<Tick> = grouped
            .into_iter()
            .map(|(timestamp, mut bars)| {
                bars.sort_by(|a, b| a.symbol.cmp(&b.symbol));
                Tick { timestamp, bars }
            })
            .collect();
        Self {
            ticks: ticks.into_iter(),
        }
    }
}

impl Iterator for BacktestClock {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        self.ticks.next()
    }
}

/// Live-mode tick queue.
///
/// Bars accumulate per timestamp; a timestamp becomes ready once a newer bar
/// arrives (the market has moved on). Ready ticks drain in order — a tick
/// that was not processed before the next bar arrived is queued, never
/// dropped. Bars at or before the last released timestamp arrive too late to
/// keep ordering and are dropped with a warning.
#[derive(Debug, Default)]
pub struct TickQueue {
    pending: BTreeMap<DateTime<Utc>, Vec<Bar>>,
    last_released: Option<DateTime<Utc>>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an arriving bar.
    pub fn offer(&mut self, bar: Bar) {
        if let Some(last) = self.last_released {
            if bar.timestamp <= last {
                warn!(
                    symbol = %bar.symbol,
                    timestamp = %bar.timestamp,
                    released = %last,
                    "late bar dropped"
                );
                return;
            }
        }
        self.pending.entry(bar.timestamp).or_default().push(bar);
    }

    /// Pop the earliest tick whose timestamp is complete — i.e., a newer bar
    /// has already arrived. Returns ticks one at a time, in order.
    pub fn pop_ready(&mut self) -> Option<Tick> {
        let (&earliest, _) = self.pending.iter().next()?;
        let has_newer = self.pending.keys().any(|&t| t > earliest);
        if !has_newer {
            return None;
        }
        self.release(earliest)
    }

    /// Release every pending tick regardless of completeness (end of stream).
    pub fn flush(&mut self) -> Vec<Tick> {
        let timestamps: Vec<DateTime<Utc>> = self.pending.keys().copied().collect();
        timestamps
            .into_iter()
            .filter_map(|t| self.release(t))
            .collect()
    }

    pub fn pending_ticks(&self) -> usize {
        self.pending.len()
    }

    fn release(&mut self, timestamp: DateTime<Utc>) -> Option<Tick> {
        let mut bars = self.pending.remove(&timestamp)?;
        bars.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        self.last_released = Some(timestamp);
        Some(Tick { timestamp, bars })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(symbol: &str, hour: i64) -> Bar {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Bar {
            symbol: symbol.to_string(),
            timestamp: base + Duration::hours(hour),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 1000.0,
        }
    }

    #[test]
    fn backtest_clock_orders_and_interleaves() {
        // Input deliberately shuffled across symbols and time.
        let clock = BacktestClock::new(vec![
            bar("ETH-USD", 1),
            bar("BTC-USD", 0),
            bar("ETH-USD", 0),
            bar("BTC-USD", 1),
        ]);
        let ticks: Vec<Tick> = clock.collect();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].bars.len(), 2);
        assert_eq!(ticks[0].bars[0].symbol, "BTC-USD");
        assert_eq!(ticks[0].bars[1].symbol, "ETH-USD");
        assert!(ticks[0].timestamp < ticks[1].timestamp);
    }

    #[test]
    fn tick_queue_releases_on_newer_arrival() {
        let mut queue = TickQueue::new();
        queue.offer(bar("BTC-USD", 0));
        // Only one timestamp pending: nothing is known-complete yet.
        assert!(queue.pop_ready().is_none());

        queue.offer(bar("BTC-USD", 1));
        let tick = queue.pop_ready().unwrap();
        assert_eq!(tick.bars.len(), 1);
        assert_eq!(tick.bars[0].timestamp, bar("BTC-USD", 0).timestamp);
        // Hour 1 still waits for something newer.
        assert!(queue.pop_ready().is_none());
    }

    #[test]
    fn queued_ticks_drain_in_order_never_skipped() {
        let mut queue = TickQueue::new();
        // Three timestamps arrive before anything is processed.
        queue.offer(bar("BTC-USD", 0));
        queue.offer(bar("BTC-USD", 1));
        queue.offer(bar("BTC-USD", 2));

        let first = queue.pop_ready().unwrap();
        let second = queue.pop_ready().unwrap();
        assert!(first.timestamp < second.timestamp);
        assert_eq!(queue.pending_ticks(), 1);
    }

    #[test]
    fn late_bar_is_dropped() {
        let mut queue = TickQueue::new();
        queue.offer(bar("BTC-USD", 0));
        queue.offer(bar("BTC-USD", 2));
        queue.pop_ready().unwrap();

        // Hour 1 arrives after hour 0 was released alongside hour-2 pending.
        queue.offer(bar("ETH-USD", 0));
        assert_eq!(queue.pending_ticks(), 1); // only hour 2 remains
    }

    #[test]
    fn flush_releases_everything() {
        let mut queue = TickQueue::new();
        queue.offer(bar("BTC-USD", 0));
        queue.offer(bar("ETH-USD", 0));
        queue.offer(bar("BTC-USD", 1));
        let ticks = queue.flush();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].bars.len(), 2);
        assert_eq!(queue.pending_ticks(), 0);
    }
}
