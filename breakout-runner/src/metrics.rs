//! Performance metrics — pure functions over equity curves and pnl records.
//!
//! Every metric is equity curve and/or trade list in, scalar out. No
//! dependencies on the runner or the pipeline.

use serde::{Deserialize, Serialize};

use breakout_core::domain::PnLRecord;

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub realized_pnl: f64,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[f64], pnls: &[PnLRecord]) -> Self {
        Self {
            total_return: total_return(equity_curve),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(pnls),
            profit_factor: profit_factor(pnls),
            trade_count: pnls.len(),
            realized_pnl: pnls.iter().map(|p| p.pnl).sum(),
        }
    }
}

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = *equity_curve.last().unwrap();
    if initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial
}

/// Maximum peak-to-trough drawdown as a positive fraction.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for &equity in equity_curve {
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}

/// Fraction of closed trades with positive pnl.
pub fn win_rate(pnls: &[PnLRecord]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|p| p.is_winner()).count() as f64 / pnls.len() as f64
}

/// Gross profit / gross loss. Returns 0.0 with no trades, infinity with
/// profit and no losses.
pub fn profit_factor(pnls: &[PnLRecord]) -> f64 {
    let gross_profit: f64 = pnls.iter().filter(|p| p.pnl > 0.0).map(|p| p.pnl).sum();
    let gross_loss: f64 = pnls.iter().filter(|p| p.pnl < 0.0).map(|p| -p.pnl).sum();
    if gross_loss == 0.0 {
        if gross_profit == 0.0 {
            return 0.0;
        }
        return f64::INFINITY;
    }
    gross_profit / gross_loss
}
