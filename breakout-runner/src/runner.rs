//! Backtest runner — one config + one bar set → one deterministic report.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use breakout_core::clock::BacktestClock;
use breakout_core::config::{ConfigError, PipelineConfig};
use breakout_core::domain::{Bar, EquityPoint, Fill, PnLRecord, Signal};
use breakout_core::pipeline::Pipeline;
use breakout_core::risk::Admission;
use breakout_core::sim::SimulationError;
use breakout_core::sink::MemorySink;

use crate::metrics::PerformanceMetrics;

/// A labeled, hashable run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub label: String,
    pub pipeline: PipelineConfig,
}

impl RunConfig {
    /// Deterministic content hash of this configuration.
    ///
    /// Two identical configs share a run id, so cached or re-delivered
    /// results can be deduplicated upstream. BTreeMap-backed fields keep the
    /// canonical JSON stable.
    pub fn run_id(&self) -> String {
        let canonical = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("simulation: {0}")]
    Simulation(#[from] SimulationError),
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub label: String,
    pub run_id: String,
    pub final_equity: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub signals: Vec<Signal>,
    pub fills: Vec<Fill>,
    pub pnls: Vec<PnLRecord>,
    pub rejections: Vec<Admission>,
    pub halted: bool,
    pub metrics: PerformanceMetrics,
}

/// Convenience entry point: TOML config file + CSV bar file → report.
pub fn run_from_files(
    config_path: impl AsRef<std::path::Path>,
    bars_path: impl AsRef<std::path::Path>,
) -> anyhow::Result<RunReport> {
    use anyhow::Context;

    let text = std::fs::read_to_string(config_path.as_ref())
        .with_context(|| format!("reading config {}", config_path.as_ref().display()))?;
    let config = RunConfig::from_toml_str(&text).context("parsing run config")?;
    let bars = crate::data_loader::load_bars_csv(bars_path.as_ref())
        .with_context(|| format!("loading bars {}", bars_path.as_ref().display()))?;
    run_backtest(&config, &bars).context("running backtest")
}

/// Run one backtest over an ordered bar set.
pub fn run_backtest(config: &RunConfig, bars: &[Bar]) -> Result<RunReport, RunError> {
    let mut pipeline = Pipeline::from_config(&config.pipeline, MemorySink::new())?;
    pipeline.run_backtest(BacktestClock::new(bars.to_vec()))?;

    let account = pipeline.account();
    let equity_curve = account.equity_curve.clone();
    let final_equity = equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(config.pipeline.initial_cash);
    let halted = pipeline.halted();
    let rejections = pipeline.rejections().to_vec();
    let sink = pipeline.into_sink();

    let curve_values: Vec<f64> = std::iter::once(config.pipeline.initial_cash)
        .chain(equity_curve.iter().map(|p| p.equity))
        .collect();
    let metrics = PerformanceMetrics::compute(&curve_values, &sink.pnls);

    info!(
        label = %config.label,
        final_equity,
        trades = sink.pnls.len(),
        rejected = rejections.len(),
        "backtest complete"
    );

    Ok(RunReport {
        label: config.label.clone(),
        run_id: config.run_id(),
        final_equity,
        equity_curve,
        signals: sink.signals,
        fills: sink.fills,
        pnls: sink.pnls,
        rejections,
        halted,
        metrics,
    })
}
