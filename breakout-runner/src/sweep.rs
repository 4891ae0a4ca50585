//! Parallel A/B sweeps over strategy/config combinations.
//!
//! Each run owns its own pipeline, account and ledger; runs share nothing
//! mutable, so they parallelize trivially with rayon.

use rayon::prelude::*;

use breakout_core::domain::Bar;

use crate::runner::{run_backtest, RunConfig, RunError, RunReport};

/// Run every config against the same bar set, in parallel.
///
/// Results keep the input order regardless of completion order, so sweep
/// output is deterministic for a fixed config list.
pub fn run_sweep(configs: &[RunConfig], bars: &[Bar]) -> Vec<Result<RunReport, RunError>> {
    configs
        .par_iter()
        .map(|config| run_backtest(config, bars))
        .collect()
}

/// Pick the successful report with the highest total return.
pub fn best_by_return(reports: &[Result<RunReport, RunError>]) -> Option<&RunReport> {
    reports
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .max_by(|a, b| {
            a.metrics
                .total_return
                .partial_cmp(&b.metrics.total_return)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
