//! Fill — an executed simulated trade, append-only ledger entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Immutable record of one executed simulated trade.
///
/// `cash_delta` is the signed change to account cash, fees and slippage
/// included, so the fill ledger alone reconstructs the cash series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub cash_delta: f64,
}
