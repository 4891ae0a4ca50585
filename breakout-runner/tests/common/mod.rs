//! Shared fixtures for integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use breakout_core::config::{Lookbacks, PipelineConfig, StrategyConfig};
use breakout_core::domain::Bar;
use breakout_runner::RunConfig;

pub fn ts(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::hours(hour)
}

pub fn bar(symbol: &str, hour: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp: ts(hour),
        open,
        high,
        low,
        close,
        volume,
    }
}

pub fn quiet_bar(symbol: &str, hour: i64) -> Bar {
    // Volume cycles so the z-score baseline keeps variance.
    let volume = 1_000.0 + (hour % 3) as f64 * 50.0;
    bar(symbol, hour, 100.0, 100.5, 99.5, 100.0, volume)
}

/// 15-bar series: 14 quiet bars, then a sharp volume-spiked breakout.
pub fn breakout_series(symbol: &str) -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..14).map(|h| quiet_bar(symbol, h)).collect();
    bars.push(bar(symbol, 14, 101.0, 112.5, 100.5, 112.0, 5_000.0));
    bars
}

/// Rule-only config tuned to the `breakout_series` fixture: the breakout bar
/// is exactly the first bar with a defined 14-bar channel.
pub fn rule_config(label: &str) -> RunConfig {
    RunConfig {
        label: label.to_string(),
        pipeline: PipelineConfig {
            initial_cash: 10_000.0,
            lookbacks: Lookbacks {
                return_bars: 2,
                volatility_bars: 3,
                volume_bars: 10,
                range_bars: 14,
                ma_fast: 2,
                ma_slow: 4,
            },
            strategies: vec![StrategyConfig::RuleBreakout {
                name: "rule_breakout".into(),
                volume_z_threshold: 2.0,
                margin_scale: 0.02,
            }],
            max_open_positions: 3,
            max_position_value: 1_000.0,
            max_aggregate_exposure_fraction: 1.0,
            cooldown_bars: 2,
            same_side_policy: Default::default(),
            stop_loss_pct: Some(0.05),
            take_profit_pct: None,
            max_drawdown_pct: None,
            allow_scale_in: false,
            fee_bps: 0.0,
            slippage_bps: 0.0,
        },
    }
}
