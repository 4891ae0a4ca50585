//! SimulatorAccount — cash, open positions and the equity curve for one run.

use super::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One equity observation, appended every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Aggregate simulated account state for a single run.
///
/// Owned exclusively by the simulator; created at run start, mutated per
/// tick, finalized at run end. BTreeMap keeps symbol iteration deterministic,
/// which the replay-determinism guarantee depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorAccount {
    pub cash: f64,
    pub initial_cash: f64,
    pub positions: BTreeMap<String, Position>,
    pub equity_curve: Vec<EquityPoint>,
    /// Tick index of each symbol's most recent close, for the cooldown check.
    pub last_exit_tick: BTreeMap<String, u64>,
    /// Running equity peak, for the account-level drawdown kill switch.
    pub peak_equity: f64,
}

impl SimulatorAccount {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            positions: BTreeMap::new(),
            equity_curve: Vec::new(),
            last_exit_tick: BTreeMap::new(),
            peak_equity: initial_cash,
        }
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Total equity = cash + sum of position market values at the given
    /// closes. Symbols without a quote are marked at entry price.
    pub fn equity(&self, closes: &BTreeMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .iter()
            .map(|(sym, pos)| {
                let price = closes.get(sym).copied().unwrap_or(pos.entry_price);
                pos.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    /// Sum of |quantity * price| across open positions.
    pub fn aggregate_exposure(&self, closes: &BTreeMap<String, f64>) -> f64 {
        self.positions
            .iter()
            .map(|(sym, pos)| {
                let price = closes.get(sym).copied().unwrap_or(pos.entry_price);
                pos.exposure(price)
            })
            .sum()
    }
}
