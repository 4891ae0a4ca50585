//! PnLRecord — realized profit and loss for one closed position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal record created when a position is fully closed.
///
/// `position_size` keeps the signed quantity of the closed position, so
/// `pnl == (exit_price - entry_price) * position_size - fees` holds for
/// longs and shorts alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnLRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub position_size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
}

impl PnLRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Return as a fraction of entry cost basis.
    pub fn return_pct(&self) -> f64 {
        let basis = self.entry_price * self.position_size.abs();
        if basis == 0.0 {
            return 0.0;
        }
        self.pnl / basis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> PnLRecord {
        PnLRecord {
            symbol: "BTC-USD".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
            position_size: 2.0,
            entry_price: 100.0,
            exit_price: 110.0,
            pnl: 20.0,
        }
    }

    #[test]
    fn winner_and_return() {
        let rec = sample();
        assert!(rec.is_winner());
        assert!((rec.return_pct() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn short_return_uses_absolute_basis() {
        let mut rec = sample();
        rec.position_size = -2.0;
        rec.pnl = -20.0;
        assert!(!rec.is_winner());
        assert!((rec.return_pct() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn pnl_serialization_roundtrip() {
        let rec = sample();
        let json = serde_json::to_string(&rec).unwrap();
        let deser: PnLRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, deser);
    }
}
