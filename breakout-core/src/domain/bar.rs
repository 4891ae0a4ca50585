//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol at a single timestamp.
///
/// Timestamps are UTC and minute-or-hour aligned by the ingestion layer.
/// Bars are immutable once ingested; within a symbol's series timestamps are
/// strictly increasing with no duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Why a bar failed validation.
#[derive(Debug, Clone, Error)]
pub enum BarError {
    #[error("{symbol}@{timestamp}: non-finite OHLCV field")]
    NonFinite {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
    #[error("{symbol}@{timestamp}: negative price or volume")]
    Negative {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
    #[error("{symbol}@{timestamp}: high/low do not bracket open/close")]
    Inconsistent {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
}

impl Bar {
    /// OHLCV sanity check: finite fields, non-negative prices and volume,
    /// high/low bracketing open and close.
    pub fn validate(&self) -> Result<(), BarError> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(BarError::NonFinite {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
            });
        }
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0
            || self.volume < 0.0
        {
            return Err(BarError::Negative {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
            });
        }
        if self.high < self.low
            || self.high < self.open
            || self.high < self.close
            || self.low > self.open
            || self.low > self.close
        {
            return Err(BarError::Inconsistent {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
