//! Cost model — slippage and fee calculation.
//!
//! Slippage is directional: buyers pay more, sellers receive less. Fees are
//! symmetric per-side in basis points of notional.

use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// Execution friction in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub slippage_bps: f64,
    pub fee_bps: f64,
}

impl CostModel {
    pub fn new(slippage_bps: f64, fee_bps: f64) -> Self {
        Self {
            slippage_bps,
            fee_bps,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Apply directional slippage to a raw fill price.
    pub fn apply_slippage(&self, raw_price: f64, side: Side) -> f64 {
        if self.slippage_bps == 0.0 {
            return raw_price;
        }
        let slip = self.slippage_bps / 10_000.0;
        match side {
            Side::Buy => raw_price * (1.0 + slip),
            Side::Sell => raw_price * (1.0 - slip),
        }
    }

    /// Fee for a fill: `price * quantity * fee_bps / 10_000`.
    pub fn fee(&self, fill_price: f64, quantity: f64) -> f64 {
        fill_price * quantity * (self.fee_bps / 10_000.0)
    }
}
