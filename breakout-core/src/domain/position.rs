//! Position — open simulated exposure in one symbol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open position. Quantity is signed: positive long, negative short.
///
/// Owned exclusively by the simulator. At most one open position per symbol
/// unless scale-in is enabled, in which case entries average into one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub opened_at: DateTime<Utc>,
    /// Most favorable intrabar extreme since entry (max high for longs,
    /// min low for shorts). Feeds the trailing-drawdown exit.
    pub peak_price: f64,
    /// Fees paid on entry, folded into realized pnl at close.
    pub entry_fee: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    /// Absolute exposure at the given price.
    pub fn exposure(&self, current_price: f64) -> f64 {
        self.quantity.abs() * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.entry_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn long_position() -> Position {
        Position {
            symbol: "BTC-USD".into(),
            quantity: 2.0,
            entry_price: 100.0,
            opened_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            peak_price: 100.0,
            entry_fee: 0.0,
        }
    }

    #[test]
    fn long_unrealized_pnl() {
        let pos = long_position();
        assert_eq!(pos.unrealized_pnl(110.0), 20.0);
        assert!(pos.is_long());
        assert!(!pos.is_short());
    }

    #[test]
    fn short_unrealized_pnl_inverts() {
        let mut pos = long_position();
        pos.quantity = -2.0;
        assert_eq!(pos.unrealized_pnl(110.0), -20.0);
        assert_eq!(pos.unrealized_pnl(90.0), 20.0);
        assert!(pos.is_short());
    }

    #[test]
    fn exposure_is_absolute() {
        let mut pos = long_position();
        pos.quantity = -2.0;
        assert_eq!(pos.exposure(110.0), 220.0);
        assert_eq!(pos.market_value(110.0), -220.0);
    }
}
