//! Breakout Runner — thin orchestration around `breakout-core`.
//!
//! Loads bars (CSV or seeded synthetic), drives deterministic backtest runs,
//! computes performance metrics and executes parallel A/B sweeps across
//! strategy/config combinations. Each run owns its own account and ledger;
//! nothing here shares mutable state between runs.

pub mod data_loader;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use data_loader::{load_bars_csv, LoadError};
pub use metrics::PerformanceMetrics;
pub use runner::{run_backtest, run_from_files, RunConfig, RunError, RunReport};
pub use sweep::{best_by_return, run_sweep};
