//! Risk controls — admission checks between signal and simulated order.
//!
//! Checks run in a fixed order (capacity, size, exposure, conflict,
//! cooldown); the order is part of the contract because each check
//! short-circuits the ones after it. Every rejection carries a
//! machine-readable reason and is logged — rejected signals are audit
//! records, never silently dropped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use crate::domain::{Signal, SimulatorAccount};

/// Why a signal was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    Capacity,
    Size,
    Exposure,
    Conflict,
    Cooldown,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity => write!(f, "capacity"),
            Self::Size => write!(f, "size"),
            Self::Exposure => write!(f, "exposure"),
            Self::Conflict => write!(f, "conflict"),
            Self::Cooldown => write!(f, "cooldown"),
        }
    }
}

/// Outcome of admission for one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Accept { quantity: f64 },
    Reject { reason: RejectReason },
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept { .. })
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Reject { reason } => Some(*reason),
            Self::Accept { .. } => None,
        }
    }
}

/// A signal paired with its admission decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub signal: Signal,
    pub decision: Decision,
}

/// What to do when multiple strategies fire on the same side for one symbol
/// at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SameSidePolicy {
    /// Keep only the strongest same-side signal; the rest reject as conflict.
    #[default]
    Strongest,
    /// Admit every same-side signal independently (subject to the scale-in
    /// rules downstream).
    Stack,
}

/// Risk limits, externally supplied and validated at run start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub max_open_positions: usize,
    pub max_position_value: f64,
    /// Fraction of equity in (0, 1].
    pub max_aggregate_exposure_fraction: f64,
    pub cooldown_bars: u64,
    #[serde(default)]
    pub same_side_policy: SameSidePolicy,
}

/// Applies the admission policy to each tick's directional signals.
pub struct RiskController {
    limits: RiskLimits,
}

impl RiskController {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Admit or reject every directional signal for one tick.
    ///
    /// `closes` maps each signal's symbol to the tick's close price; `tick`
    /// is the global tick index used for the cooldown window. Output order
    /// matches input order.
    pub fn admit_all(
        &self,
        signals: Vec<Signal>,
        account: &SimulatorAccount,
        closes: &BTreeMap<String, f64>,
        tick: u64,
    ) -> Vec<Admission> {
        // Checks 1-3 run per signal; conflict arbitration (4) and cooldown
        // (5) then run over the survivors.
        let mut decisions: Vec<Option<Decision>> = signals
            .iter()
            .map(|s| self.pre_check(s, account, closes))
            .collect();

        self.arbitrate(&signals, &mut decisions, account);

        // Final pass runs in input order against *tentative* state, so a
        // batch of same-tick entries cannot collectively overshoot the
        // capacity, cash or exposure limits that each passed individually.
        let mut tentative = TentativeState::from_account(account, closes);
        for (signal, decision) in signals.iter().zip(decisions.iter_mut()) {
            if decision.is_some() {
                continue;
            }
            *decision = Some(self.final_check(signal, account, closes, tick, &mut tentative));
        }

        signals
            .into_iter()
            .zip(decisions)
            .map(|(signal, decision)| {
                let decision = decision.expect("every signal decided");
                if let Some(reason) = decision.reject_reason() {
                    debug!(
                        symbol = %signal.symbol,
                        strategy = %signal.strategy,
                        %reason,
                        "signal rejected"
                    );
                }
                Admission { signal, decision }
            })
            .collect()
    }

    /// Checks 1-3. `Some` is an early rejection; `None` means the signal is
    /// still in play for arbitration.
    fn pre_check(
        &self,
        signal: &Signal,
        account: &SimulatorAccount,
        closes: &BTreeMap<String, f64>,
    ) -> Option<Decision> {
        // Opposite-direction signals against an open position are exits;
        // they free capacity and reduce exposure, so checks 1-3 pass them
        // through untouched.
        if self.is_exit(signal, account) {
            return None;
        }

        // 1. capacity
        if !account.has_position(&signal.symbol)
            && account.open_position_count() >= self.limits.max_open_positions
        {
            return Some(Decision::Reject {
                reason: RejectReason::Capacity,
            });
        }

        // 2. size
        let Some(&price) = closes.get(&signal.symbol) else {
            return Some(Decision::Reject {
                reason: RejectReason::Size,
            });
        };
        let cap_value = self.limits.max_position_value.min(account.cash);
        let quantity = cap_value / price;
        if !quantity.is_finite() || quantity <= 0.0 {
            return Some(Decision::Reject {
                reason: RejectReason::Size,
            });
        }

        // 3. aggregate exposure
        let equity = account.equity(closes);
        let exposure = account.aggregate_exposure(closes) + quantity * price;
        if exposure > self.limits.max_aggregate_exposure_fraction * equity {
            return Some(Decision::Reject {
                reason: RejectReason::Exposure,
            });
        }

        None
    }

    /// Check 4: per-symbol direction arbitration over surviving signals.
    ///
    /// Opposite directions always resolve to one winner; same-side behavior
    /// follows the configured policy. Winner selection is highest strength,
    /// then rule before model, then registration (input) order.
    fn arbitrate(
        &self,
        signals: &[Signal],
        decisions: &mut [Option<Decision>],
        account: &SimulatorAccount,
    ) {
        let mut by_symbol: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, signal) in signals.iter().enumerate() {
            if decisions[i].is_none() {
                by_symbol.entry(&signal.symbol).or_default().push(i);
            }
        }

        for (_, indices) in by_symbol {
            if indices.len() < 2 {
                continue;
            }
            let winner = *indices
                .iter()
                .min_by(|&&a, &&b| {
                    signals[b]
                        .strength
                        .partial_cmp(&signals[a].strength)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(signals[a].source.cmp(&signals[b].source))
                        .then(a.cmp(&b))
                })
                .expect("non-empty group");

            let winner_direction = signals[winner].signal_type.direction();
            for &i in &indices {
                if i == winner {
                    continue;
                }
                let same_side = signals[i].signal_type.direction() == winner_direction;
                let keep = same_side
                    && self.limits.same_side_policy == SameSidePolicy::Stack
                    // Stacked same-side entries still collapse to one order
                    // when the symbol cannot scale (handled downstream), but
                    // exits never stack against the winning exit.
                    && !self.is_exit(&signals[i], account);
                if !keep {
                    decisions[i] = Some(Decision::Reject {
                        reason: RejectReason::Conflict,
                    });
                }
            }
        }
    }

    /// Check 5 (cooldown), final sizing, and batch-aware re-validation of
    /// checks 1-3 for the surviving signals.
    fn final_check(
        &self,
        signal: &Signal,
        account: &SimulatorAccount,
        closes: &BTreeMap<String, f64>,
        tick: u64,
        tentative: &mut TentativeState,
    ) -> Decision {
        if self.is_exit(signal, account) {
            // Exit quantity is the open position, not a cash-based size.
            let pos = &account.positions[&signal.symbol];
            let price = closes
                .get(&signal.symbol)
                .copied()
                .unwrap_or(pos.entry_price);
            // Freed exposure is always |q|·price; the cash effect keeps the
            // position's sign (closing a short consumes cash).
            tentative.release(pos.quantity.abs() * price, pos.quantity * price);
            return Decision::Accept {
                quantity: pos.quantity.abs(),
            };
        }

        if let Some(&exit_tick) = account.last_exit_tick.get(&signal.symbol) {
            if tick <= exit_tick + self.limits.cooldown_bars {
                return Decision::Reject {
                    reason: RejectReason::Cooldown,
                };
            }
        }

        let opens_new_symbol = !account.has_position(&signal.symbol)
            && !tentative.opened_symbols.contains(&signal.symbol);
        if opens_new_symbol && tentative.open_count >= self.limits.max_open_positions {
            return Decision::Reject {
                reason: RejectReason::Capacity,
            };
        }

        let price = closes[&signal.symbol];
        let cap_value = self.limits.max_position_value.min(tentative.cash);
        let quantity = cap_value / price;
        if !quantity.is_finite() || quantity <= 0.0 {
            return Decision::Reject {
                reason: RejectReason::Size,
            };
        }

        let notional = quantity * price;
        if tentative.exposure + notional
            > self.limits.max_aggregate_exposure_fraction * tentative.equity
        {
            return Decision::Reject {
                reason: RejectReason::Exposure,
            };
        }

        if opens_new_symbol {
            tentative.open_count += 1;
            tentative.opened_symbols.insert(signal.symbol.clone());
        }
        tentative.cash -= notional;
        tentative.exposure += notional;
        Decision::Accept { quantity }
    }

    fn is_exit(&self, signal: &Signal, account: &SimulatorAccount) -> bool {
        account
            .positions
            .get(&signal.symbol)
            .map(|p| {
                let dir = signal.signal_type.direction();
                (p.is_long() && dir < 0) || (p.is_short() && dir > 0)
            })
            .unwrap_or(false)
    }
}

/// Running totals for the in-flight admission batch.
struct TentativeState {
    open_count: usize,
    cash: f64,
    exposure: f64,
    equity: f64,
    opened_symbols: BTreeSet<String>,
}

impl TentativeState {
    fn from_account(account: &SimulatorAccount, closes: &BTreeMap<String, f64>) -> Self {
        Self {
            open_count: account.open_position_count(),
            cash: account.cash,
            exposure: account.aggregate_exposure(closes),
            equity: account.equity(closes),
            opened_symbols: BTreeSet::new(),
        }
    }

    /// An accepted exit frees capacity, exposure and cash for later signals
    /// in the same batch.
    fn release(&mut self, exposure: f64, proceeds: f64) {
        self.open_count = self.open_count.saturating_sub(1);
        self.exposure -= exposure;
        self.cash += proceeds;
    }
}
