//! The paper-trading simulator — a FLAT → OPEN → FLAT state machine per
//! symbol, fills atomic at the bar close (slippage-adjusted), protective
//! exits evaluated against intrabar high/low before any close-priced fill.
//!
//! The simulator exclusively owns account state. Every tick either fully
//! resolves or the run aborts on an invariant violation; there is no pending
//! state to reconcile later.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{
    Bar, EquityPoint, Fill, PnLRecord, Position, Side, SimulatorAccount, Symbol,
};

use super::CostModel;

/// Protective exit thresholds; `None` disables a rule.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExitRules {
    /// Fixed stop distance from entry, as a fraction.
    pub stop_loss_pct: Option<f64>,
    /// Fixed profit target distance from entry, as a fraction.
    pub take_profit_pct: Option<f64>,
    /// Trailing drawdown from the most favorable intrabar extreme since
    /// entry; also the account-level kill-switch threshold from peak equity.
    pub max_drawdown_pct: Option<f64>,
}

/// A state-machine bug, fatal to the run.
#[derive(Debug, Clone, Error)]
pub enum SimulationError {
    #[error("{symbol}@{timestamp}: entry while position already open and scale-in disabled")]
    DoubleOpen {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
    #[error("{symbol}@{timestamp}: close requested with no open position")]
    NoPosition {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
    #[error("{symbol}@{timestamp}: non-positive fill quantity {quantity}")]
    BadQuantity {
        symbol: String,
        timestamp: DateTime<Utc>,
        quantity: f64,
    },
}

/// Fills and realized pnl produced within one tick.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub fills: Vec<Fill>,
    pub pnls: Vec<PnLRecord>,
}

impl TickOutcome {
    fn absorb(&mut self, fill: Fill, pnl: PnLRecord) {
        self.fills.push(fill);
        self.pnls.push(pnl);
    }
}

/// Deterministic paper broker for one simulation run.
pub struct Simulator {
    cost: CostModel,
    exits: ExitRules,
    allow_scale_in: bool,
    account: SimulatorAccount,
    /// Last seen close per symbol, for mark-to-market when a symbol has no
    /// bar in the current tick.
    last_close: BTreeMap<Symbol, f64>,
    halted: bool,
}

impl Simulator {
    pub fn new(
        initial_cash: f64,
        cost: CostModel,
        exits: ExitRules,
        allow_scale_in: bool,
    ) -> Self {
        Self {
            cost,
            exits,
            allow_scale_in,
            account: SimulatorAccount::new(initial_cash),
            last_close: BTreeMap::new(),
            halted: false,
        }
    }

    pub fn account(&self) -> &SimulatorAccount {
        &self.account
    }

    /// Whether the account-level drawdown kill switch has fired.
    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn allow_scale_in(&self) -> bool {
        self.allow_scale_in
    }

    /// Open or scale into a position at the bar close.
    ///
    /// `direction` is +1 long / -1 short. An entry against an already-open
    /// same-direction position without scale-in enabled is a state-machine
    /// bug: the pipeline filters those to no-ops before they reach here.
    pub fn open(
        &mut self,
        symbol: &str,
        direction: i8,
        quantity: f64,
        close_price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Fill, SimulationError> {
        if quantity <= 0.0 || !quantity.is_finite() {
            return Err(SimulationError::BadQuantity {
                symbol: symbol.to_string(),
                timestamp,
                quantity,
            });
        }

        let side = if direction > 0 { Side::Buy } else { Side::Sell };
        let price = self.cost.apply_slippage(close_price, side);
        let fee = self.cost.fee(price, quantity);
        let signed_quantity = quantity * f64::from(direction.signum());

        match self.account.positions.get_mut(symbol) {
            None => {
                self.account.positions.insert(
                    symbol.to_string(),
                    Position {
                        symbol: symbol.to_string(),
                        quantity: signed_quantity,
                        entry_price: price,
                        opened_at: timestamp,
                        peak_price: price,
                        entry_fee: fee,
                    },
                );
            }
            Some(pos) => {
                let same_direction = (pos.is_long() && direction > 0)
                    || (pos.is_short() && direction < 0);
                if !same_direction || !self.allow_scale_in {
                    return Err(SimulationError::DoubleOpen {
                        symbol: symbol.to_string(),
                        timestamp,
                    });
                }
                // Scale-in: average the entry, accumulate fees.
                let old_abs = pos.quantity.abs();
                let new_abs = old_abs + quantity;
                pos.entry_price = (pos.entry_price * old_abs + price * quantity) / new_abs;
                pos.quantity += signed_quantity;
                pos.entry_fee += fee;
            }
        }

        let cash_delta = match side {
            Side::Buy => -(price * quantity) - fee,
            Side::Sell => price * quantity - fee,
        };
        self.account.cash += cash_delta;

        debug!(symbol, %side, quantity, price, "position opened");
        Ok(Fill {
            symbol: symbol.to_string(),
            timestamp,
            side,
            quantity,
            price,
            cash_delta,
        })
    }

    /// Fully close an open position at the given raw price.
    pub fn close(
        &mut self,
        symbol: &str,
        raw_price: f64,
        timestamp: DateTime<Utc>,
        tick: u64,
    ) -> Result<(Fill, PnLRecord), SimulationError> {
        let pos = self.account.positions.remove(symbol).ok_or_else(|| {
            SimulationError::NoPosition {
                symbol: symbol.to_string(),
                timestamp,
            }
        })?;

        let side = if pos.is_long() { Side::Sell } else { Side::Buy };
        let price = self.cost.apply_slippage(raw_price, side);
        let abs_quantity = pos.quantity.abs();
        let fee = self.cost.fee(price, abs_quantity);

        let cash_delta = match side {
            Side::Sell => price * abs_quantity - fee,
            Side::Buy => -(price * abs_quantity) - fee,
        };
        self.account.cash += cash_delta;
        self.account
            .last_exit_tick
            .insert(symbol.to_string(), tick);

        let pnl = (price - pos.entry_price) * pos.quantity - pos.entry_fee - fee;
        debug!(symbol, %side, quantity = abs_quantity, price, pnl, "position closed");

        Ok((
            Fill {
                symbol: symbol.to_string(),
                timestamp,
                side,
                quantity: abs_quantity,
                price,
                cash_delta,
            },
            PnLRecord {
                symbol: symbol.to_string(),
                timestamp,
                position_size: pos.quantity,
                entry_price: pos.entry_price,
                exit_price: price,
                pnl,
            },
        ))
    }

    /// Evaluate stop-loss, take-profit and trailing drawdown against the
    /// tick's intrabar range, before any close-priced fill.
    ///
    /// A bar whose low breaches a long stop fills at the stop price, not the
    /// close. When stop and take-profit are both breached in one bar the
    /// stop wins (worst-case intrabar ordering). Peaks update only after a
    /// position survives the tick, so a trailing trigger never references
    /// the same bar's favorable extreme.
    pub fn check_protective_exits(
        &mut self,
        bars: &BTreeMap<Symbol, Bar>,
        tick: u64,
    ) -> Result<TickOutcome, SimulationError> {
        let mut outcome = TickOutcome::default();

        let symbols: Vec<Symbol> = self.account.positions.keys().cloned().collect();
        for symbol in symbols {
            let Some(bar) = bars.get(&symbol) else {
                continue;
            };
            let pos = &self.account.positions[&symbol];

            if let Some(trigger) = exit_trigger(pos, bar, &self.exits) {
                warn!(
                    symbol = %symbol,
                    price = trigger.price,
                    reason = trigger.reason,
                    "protective exit"
                );
                let (fill, pnl) = self.close(&symbol, trigger.price, bar.timestamp, tick)?;
                outcome.absorb(fill, pnl);
            } else {
                let pos = self
                    .account
                    .positions
                    .get_mut(&symbol)
                    .expect("surviving position");
                if pos.is_long() {
                    pos.peak_price = pos.peak_price.max(bar.high);
                } else {
                    pos.peak_price = pos.peak_price.min(bar.low);
                }
            }
        }

        Ok(outcome)
    }

    /// Mark the account to market and append one equity point.
    ///
    /// Also runs the account-level kill switch: when equity falls more than
    /// `max_drawdown_pct` below its running peak, every open position is
    /// force-closed at its current mark and the run halts.
    pub fn mark_equity(
        &mut self,
        timestamp: DateTime<Utc>,
        closes: &BTreeMap<Symbol, f64>,
        tick: u64,
    ) -> Result<TickOutcome, SimulationError> {
        for (symbol, &price) in closes {
            self.last_close.insert(symbol.clone(), price);
        }

        let mut outcome = TickOutcome::default();
        let mut equity = self.account.equity(&self.last_close);

        if let Some(dd) = self.exits.max_drawdown_pct {
            if equity < self.account.peak_equity * (1.0 - dd) && !self.account.positions.is_empty()
            {
                warn!(
                    equity,
                    peak = self.account.peak_equity,
                    "account drawdown breach, force-closing all positions"
                );
                let symbols: Vec<Symbol> = self.account.positions.keys().cloned().collect();
                for symbol in symbols {
                    let price = self
                        .last_close
                        .get(&symbol)
                        .copied()
                        .unwrap_or(self.account.positions[&symbol].entry_price);
                    let (fill, pnl) = self.close(&symbol, price, timestamp, tick)?;
                    outcome.absorb(fill, pnl);
                }
                self.halted = true;
                equity = self.account.equity(&self.last_close);
            }
        }

        self.account.peak_equity = self.account.peak_equity.max(equity);
        self.account.equity_curve.push(EquityPoint { timestamp, equity });
        Ok(outcome)
    }
}

struct ExitTrigger {
    price: f64,
    reason: &'static str,
}

/// Protective exit decision for one position against one bar.
///
/// The effective protective floor (ceiling for shorts) is the tighter of the
/// fixed stop and the trailing level; it is checked before the profit target.
fn exit_trigger(pos: &Position, bar: &Bar, exits: &ExitRules) -> Option<ExitTrigger> {
    if pos.is_long() {
        let stop = exits.stop_loss_pct.map(|p| pos.entry_price * (1.0 - p));
        let trail = exits.max_drawdown_pct.map(|p| pos.peak_price * (1.0 - p));
        let floor = match (stop, trail) {
            (Some(s), Some(t)) => Some(s.max(t)),
            (s, t) => s.or(t),
        };
        if let Some(floor) = floor {
            if bar.low <= floor {
                let reason = if stop == Some(floor) { "stop_loss" } else { "trailing_drawdown" };
                return Some(ExitTrigger { price: floor, reason });
            }
        }
        if let Some(tp) = exits.take_profit_pct.map(|p| pos.entry_price * (1.0 + p)) {
            if bar.high >= tp {
                return Some(ExitTrigger { price: tp, reason: "take_profit" });
            }
        }
    } else {
        let stop = exits.stop_loss_pct.map(|p| pos.entry_price * (1.0 + p));
        let trail = exits.max_drawdown_pct.map(|p| pos.peak_price * (1.0 + p));
        let ceiling = match (stop, trail) {
            (Some(s), Some(t)) => Some(s.min(t)),
            (s, t) => s.or(t),
        };
        if let Some(ceiling) = ceiling {
            if bar.high >= ceiling {
                let reason = if stop == Some(ceiling) { "stop_loss" } else { "trailing_drawdown" };
                return Some(ExitTrigger { price: ceiling, reason });
            }
        }
        if let Some(tp) = exits.take_profit_pct.map(|p| pos.entry_price * (1.0 - p)) {
            if bar.low <= tp {
                return Some(ExitTrigger { price: tp, reason: "take_profit" });
            }
        }
    }
    None
}
