//! CSV bar loading for the runner.
//!
//! Expects a header row of `timestamp,symbol,open,high,low,close,volume`
//! with RFC 3339 timestamps. Rows are sorted by (symbol, timestamp) and
//! exact-duplicate timestamps are dropped with a warning — the feature
//! engine re-validates, but handing it clean input keeps the drop ledger
//! meaningful.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use breakout_core::domain::Bar;

/// Errors from the bar loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: bad timestamp {value:?}")]
    BadTimestamp { row: usize, value: String },
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: String,
    symbol: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load and canonicalize bars from a CSV file.
pub fn load_bars_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, LoadError> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut bars = Vec::new();

    for (i, row) in reader.deserialize::<CsvBar>().enumerate() {
        let row = row?;
        let timestamp = row
            .timestamp
            .parse::<DateTime<Utc>>()
            .map_err(|_| LoadError::BadTimestamp {
                row: i + 2, // 1-based, after the header
                value: row.timestamp.clone(),
            })?;
        bars.push(Bar {
            symbol: row.symbol,
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    Ok(canonicalize(bars))
}

/// Sort by (symbol, timestamp) and drop exact duplicate timestamps.
pub fn canonicalize(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then(a.timestamp.cmp(&b.timestamp))
    });
    let before = bars.len();
    bars.dedup_by(|next, prev| next.symbol == prev.symbol && next.timestamp == prev.timestamp);
    let dropped = before - bars.len();
    if dropped > 0 {
        warn!(dropped, "duplicate bars removed during load");
    }
    bars
}
