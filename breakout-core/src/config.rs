//! Pipeline configuration — externally supplied, validated before any tick.
//!
//! Invalid or missing configuration is fatal at run start; nothing here is
//! recoverable mid-run. Deserializes from TOML or JSON via serde.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use thiserror::Error;

use crate::features::{
    Indicator, MaCrossover, RangeBreakout, RollingReturn, Volatility, VolumeZScore,
};
use crate::risk::{RiskLimits, SameSidePolicy};
use crate::signals::{LogisticModel, ModelParams, RuleBreakout, Strategy};
use crate::sim::ExitRules;

/// Fatal configuration problem, raised before the first tick.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("config: {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
    #[error("config: duplicate strategy name {0:?}")]
    DuplicateStrategy(String),
    #[error("config: strategy_set must not be empty")]
    NoStrategies,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Indicator lookback windows, in bars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookbacks {
    pub return_bars: usize,
    pub volatility_bars: usize,
    pub volume_bars: usize,
    pub range_bars: usize,
    pub ma_fast: usize,
    pub ma_slow: usize,
}

impl Default for Lookbacks {
    fn default() -> Self {
        Self {
            return_bars: 5,
            volatility_bars: 20,
            volume_bars: 10,
            range_bars: 14,
            ma_fast: 5,
            ma_slow: 20,
        }
    }
}

/// One entry in the ordered strategy set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// Channel breakout on above-threshold volume.
    RuleBreakout {
        name: String,
        volume_z_threshold: f64,
        /// Price margin (fraction of the channel level) at which signal
        /// strength saturates at 1.0.
        margin_scale: f64,
    },

    /// Pretrained logistic scorer over named features.
    Logistic {
        name: String,
        weights: BTreeMap<String, f64>,
        bias: f64,
        long_threshold: f64,
    },
}

impl StrategyConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::RuleBreakout { name, .. } => name,
            Self::Logistic { name, .. } => name,
        }
    }
}

/// Everything a pipeline run needs, in one validated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub initial_cash: f64,
    #[serde(default)]
    pub lookbacks: Lookbacks,
    pub strategies: Vec<StrategyConfig>,

    pub max_open_positions: usize,
    pub max_position_value: f64,
    pub max_aggregate_exposure_fraction: f64,
    pub cooldown_bars: u64,
    #[serde(default)]
    pub same_side_policy: SameSidePolicy,

    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
    #[serde(default)]
    pub allow_scale_in: bool,

    #[serde(default)]
    pub fee_bps: f64,
    #[serde(default)]
    pub slippage_bps: f64,
}

impl PipelineConfig {
    /// Check every invariant the pipeline assumes. Called once at
    /// construction; a failure aborts the run before any tick executes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_cash > 0.0) {
            return Err(invalid("initial_cash", "must be positive"));
        }
        if self.max_open_positions == 0 {
            return Err(invalid("max_open_positions", "must be at least 1"));
        }
        if !(self.max_position_value > 0.0) {
            return Err(invalid("max_position_value", "must be positive"));
        }
        if !(self.max_aggregate_exposure_fraction > 0.0
            && self.max_aggregate_exposure_fraction <= 1.0)
        {
            return Err(invalid(
                "max_aggregate_exposure_fraction",
                "must be in (0, 1]",
            ));
        }
        for (field, value) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
            ("max_drawdown_pct", self.max_drawdown_pct),
        ] {
            if let Some(v) = value {
                if !(v > 0.0 && v < 1.0) {
                    return Err(invalid(field, "must be in (0, 1)"));
                }
            }
        }
        if self.fee_bps < 0.0 {
            return Err(invalid("fee_bps", "must be non-negative"));
        }
        if self.slippage_bps < 0.0 {
            return Err(invalid("slippage_bps", "must be non-negative"));
        }

        let lb = &self.lookbacks;
        if lb.return_bars == 0 || lb.range_bars == 0 {
            return Err(invalid("lookbacks", "windows must be at least 1 bar"));
        }
        if lb.volatility_bars < 2 || lb.volume_bars < 2 {
            return Err(invalid(
                "lookbacks",
                "volatility and volume windows need at least 2 bars",
            ));
        }
        if lb.ma_fast == 0 || lb.ma_fast >= lb.ma_slow {
            return Err(invalid("lookbacks", "ma_fast must be in [1, ma_slow)"));
        }

        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }
        let mut names = HashSet::new();
        for strategy in &self.strategies {
            if !names.insert(strategy.name().to_string()) {
                return Err(ConfigError::DuplicateStrategy(strategy.name().to_string()));
            }
            match strategy {
                StrategyConfig::RuleBreakout { margin_scale, .. } => {
                    if !(*margin_scale > 0.0) {
                        return Err(invalid("margin_scale", "must be positive"));
                    }
                }
                StrategyConfig::Logistic {
                    weights,
                    long_threshold,
                    ..
                } => {
                    if weights.is_empty() {
                        return Err(invalid("weights", "must name at least one feature"));
                    }
                    if !(0.5..1.0).contains(long_threshold) {
                        return Err(invalid("long_threshold", "must be in [0.5, 1)"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Instantiate the configured indicator set.
    pub fn build_indicators(&self) -> Vec<Box<dyn Indicator>> {
        let lb = &self.lookbacks;
        vec![
            Box::new(RollingReturn::new(lb.return_bars)),
            Box::new(Volatility::new(lb.volatility_bars)),
            Box::new(VolumeZScore::new(lb.volume_bars)),
            Box::new(RangeBreakout::upper_margin(lb.range_bars)),
            Box::new(RangeBreakout::lower_margin(lb.range_bars)),
            Box::new(MaCrossover::new(lb.ma_fast, lb.ma_slow)),
        ]
    }

    /// Instantiate the configured strategy set, preserving order.
    pub fn build_strategies(&self) -> Vec<Box<dyn Strategy>> {
        self.strategies
            .iter()
            .map(|s| -> Box<dyn Strategy> {
                match s {
                    StrategyConfig::RuleBreakout {
                        name,
                        volume_z_threshold,
                        margin_scale,
                    } => Box::new(RuleBreakout::new(
                        name.clone(),
                        self.lookbacks.range_bars,
                        self.lookbacks.volume_bars,
                        *volume_z_threshold,
                        *margin_scale,
                    )),
                    StrategyConfig::Logistic {
                        name,
                        weights,
                        bias,
                        long_threshold,
                    } => Box::new(LogisticModel::new(
                        name.clone(),
                        ModelParams {
                            weights: weights.clone(),
                            bias: *bias,
                        },
                        *long_threshold,
                    )),
                }
            })
            .collect()
    }

    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            max_open_positions: self.max_open_positions,
            max_position_value: self.max_position_value,
            max_aggregate_exposure_fraction: self.max_aggregate_exposure_fraction,
            cooldown_bars: self.cooldown_bars,
            same_side_policy: self.same_side_policy,
        }
    }

    pub fn exit_rules(&self) -> ExitRules {
        ExitRules {
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
            max_drawdown_pct: self.max_drawdown_pct,
        }
    }
}
