//! The per-tick pipeline: Feature → Signal → Risk → Simulator → sink.
//!
//! The clock is the only driver; everything here is a synchronous function
//! of state plus one tick of input. A tick either completes atomically or
//! the run aborts on a simulation invariant violation — partial ticks are
//! never persisted.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::clock::{BacktestClock, Tick};
use crate::config::{ConfigError, PipelineConfig};
use crate::domain::{Signal, SimulatorAccount, Symbol};
use crate::features::FeatureEngine;
use crate::risk::{Admission, Decision, RiskController};
use crate::signals::SignalEngine;
use crate::sim::{SimulationError, Simulator, TickOutcome};
use crate::sink::RecordSink;

/// Per-tick summary counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub bars_accepted: usize,
    pub bars_dropped: usize,
    pub signals_emitted: usize,
    pub orders_accepted: usize,
    pub orders_rejected: usize,
    pub fills: usize,
    /// Set once the account-level kill switch has fired; later ticks no-op.
    pub halted: bool,
}

/// One simulation run's worth of pipeline state.
pub struct Pipeline<S: RecordSink> {
    features: FeatureEngine,
    signals: SignalEngine,
    risk: RiskController,
    sim: Simulator,
    sink: S,
    tick_index: u64,
    /// Audit ledger of every rejected admission.
    rejections: Vec<Admission>,
}

impl<S: RecordSink> Pipeline<S> {
    /// Validate the configuration and assemble a run. Configuration problems
    /// are fatal here, before any tick executes.
    pub fn from_config(config: &PipelineConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            features: FeatureEngine::new(config.build_indicators()),
            signals: SignalEngine::new(config.build_strategies()),
            risk: RiskController::new(config.risk_limits()),
            sim: Simulator::new(
                config.initial_cash,
                crate::sim::CostModel::new(config.slippage_bps, config.fee_bps),
                config.exit_rules(),
                config.allow_scale_in,
            ),
            sink,
            tick_index: 0,
            rejections: Vec::new(),
        })
    }

    pub fn account(&self) -> &SimulatorAccount {
        self.sim.account()
    }

    pub fn halted(&self) -> bool {
        self.sim.halted()
    }

    pub fn rejections(&self) -> &[Admission] {
        &self.rejections
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Drain a backtest clock to completion (or kill-switch halt).
    pub fn run_backtest(&mut self, clock: BacktestClock) -> Result<(), SimulationError> {
        for tick in clock {
            let report = self.run_tick(tick)?;
            if report.halted {
                break;
            }
        }
        Ok(())
    }

    /// Execute one tick: validate bars, evaluate protective exits against
    /// the intrabar range, compute features, score signals, admit through
    /// risk, fill at the close, mark equity.
    pub fn run_tick(&mut self, tick: Tick) -> Result<TickReport, SimulationError> {
        let mut report = TickReport::default();
        if self.sim.halted() {
            report.halted = true;
            return Ok(report);
        }

        let timestamp = tick.timestamp;

        // Bar validation and feature computation. Rejected bars are dropped
        // and logged; the tick continues without them.
        let mut accepted = Vec::with_capacity(tick.bars.len());
        let mut bars_by_symbol: BTreeMap<Symbol, crate::domain::Bar> = BTreeMap::new();
        let mut closes: BTreeMap<Symbol, f64> = BTreeMap::new();
        for bar in tick.bars {
            match self.features.push(bar.clone()) {
                Ok(fv) => {
                    closes.insert(bar.symbol.clone(), bar.close);
                    bars_by_symbol.insert(bar.symbol.clone(), bar);
                    accepted.push(fv);
                }
                Err(err) => {
                    warn!(error = %err, "dropping bar");
                    report.bars_dropped += 1;
                }
            }
        }
        report.bars_accepted = accepted.len();

        // Protective exits run against intrabar high/low before any
        // close-priced signal fill can see this tick.
        let exits = self
            .sim
            .check_protective_exits(&bars_by_symbol, self.tick_index)?;
        report.fills += exits.fills.len();
        self.emit(&exits);

        // Score every feature vector; holds are recorded but never traded.
        let mut candidates: Vec<Signal> = Vec::new();
        for fv in &accepted {
            self.sink.append_feature(fv);
            for signal in self.signals.score(fv) {
                self.sink.append_signal(&signal);
                report.signals_emitted += 1;
                if signal.signal_type.is_directional() {
                    candidates.push(signal);
                }
            }
        }

        // Admission and execution.
        let admissions =
            self.risk
                .admit_all(candidates, self.sim.account(), &closes, self.tick_index);
        for admission in admissions {
            match admission.decision {
                Decision::Reject { .. } => {
                    report.orders_rejected += 1;
                    self.rejections.push(admission);
                }
                Decision::Accept { quantity } => {
                    report.orders_accepted += 1;
                    report.fills +=
                        self.execute(&admission.signal, quantity, &closes, timestamp)?;
                }
            }
        }

        // Mark to market; the kill switch may force-close everything here.
        let marks = self.sim.mark_equity(timestamp, &closes, self.tick_index)?;
        report.fills += marks.fills.len();
        self.emit(&marks);
        report.halted = self.sim.halted();

        self.tick_index += 1;
        Ok(report)
    }

    /// Apply one accepted signal to the simulator state machine.
    fn execute(
        &mut self,
        signal: &Signal,
        quantity: f64,
        closes: &BTreeMap<Symbol, f64>,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Result<usize, SimulationError> {
        let direction = signal.signal_type.direction();
        let close = closes[&signal.symbol];

        let position_direction = self
            .sim
            .account()
            .positions
            .get(&signal.symbol)
            .map(|p| if p.is_long() { 1i8 } else { -1i8 });

        match position_direction {
            None => {
                let fill = self
                    .sim
                    .open(&signal.symbol, direction, quantity, close, timestamp)?;
                self.sink.append_fill(&fill);
                Ok(1)
            }
            Some(open_dir) if open_dir == direction => {
                if self.sim.allow_scale_in() {
                    let fill = self
                        .sim
                        .open(&signal.symbol, direction, quantity, close, timestamp)?;
                    self.sink.append_fill(&fill);
                    Ok(1)
                } else {
                    // Same-direction signal while OPEN is a no-op by
                    // contract; only a signal that bypassed this dispatch
                    // would make the simulator's double-open check fire.
                    debug!(symbol = %signal.symbol, "entry while open ignored (scale-in disabled)");
                    Ok(0)
                }
            }
            Some(_) => {
                let (fill, pnl) =
                    self.sim
                        .close(&signal.symbol, close, timestamp, self.tick_index)?;
                self.sink.append_fill(&fill);
                self.sink.append_pnl(&pnl);
                Ok(1)
            }
        }
    }

    fn emit(&mut self, outcome: &TickOutcome) {
        for fill in &outcome.fills {
            self.sink.append_fill(fill);
        }
        for pnl in &outcome.pnls {
            self.sink.append_pnl(pnl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Lookbacks, StrategyConfig};
    use crate::domain::Bar;
    use crate::risk::SameSidePolicy;
    use crate::sink::MemorySink;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn bar(symbol: &str, hour: i64, close: f64, volume: f64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp: ts(hour),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume,
        }
    }

    fn tick(bars: Vec<Bar>) -> Tick {
        Tick {
            timestamp: bars[0].timestamp,
            bars,
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            initial_cash: 10_000.0,
            lookbacks: Lookbacks {
                return_bars: 2,
                volatility_bars: 2,
                volume_bars: 3,
                range_bars: 3,
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
            cooldown_bars: 1,
            same_side_policy: SameSidePolicy::Strongest,
            stop_loss_pct: Some(0.10),
            take_profit_pct: None,
            max_drawdown_pct: None,
            allow_scale_in: false,
            fee_bps: 0.0,
            slippage_bps: 0.0,
        }
    }

    /// Quiet series with a volume-spiked breakout on the last bar.
    fn breakout_bars(symbol: &str) -> Vec<Vec<Bar>> {
        let mut ticks = Vec::new();
        for h in 0..6 {
            // Mildly varying volume so the z-score baseline has variance.
            ticks.push(vec![bar(symbol, h, 100.0, 1_000.0 + (h % 3) as f64 * 50.0)]);
        }
        ticks.push(vec![bar(symbol, 6, 110.0, 5_000.0)]);
        ticks
    }

    #[test]
    fn breakout_opens_position_and_emits_records() {
        let mut pipeline = Pipeline::from_config(&config(), MemorySink::new()).unwrap();
        for bars in breakout_bars("BTC-USD") {
            pipeline.run_tick(tick(bars)).unwrap();
        }
        assert!(pipeline.account().has_position("BTC-USD"));
        let sink = pipeline.into_sink();
        assert_eq!(sink.fills.len(), 1);
        assert_eq!(sink.fills[0].price, 110.0);
        // One feature vector and one signal per accepted bar.
        assert_eq!(sink.features.len(), 7);
        assert_eq!(sink.signals.len(), 7);
    }

    #[test]
    fn invalid_bar_is_dropped_not_fatal() {
        let mut pipeline = Pipeline::from_config(&config(), MemorySink::new()).unwrap();
        let mut bad = bar("BTC-USD", 0, 100.0, 1_000.0);
        bad.close = f64::NAN;
        let report = pipeline.run_tick(tick(vec![bad])).unwrap();
        assert_eq!(report.bars_dropped, 1);
        assert_eq!(report.bars_accepted, 0);
        // Next tick proceeds normally.
        let report = pipeline
            .run_tick(tick(vec![bar("BTC-USD", 1, 100.0, 1_000.0)]))
            .unwrap();
        assert_eq!(report.bars_accepted, 1);
    }

    #[test]
    fn duplicate_tick_produces_no_second_feature_vector() {
        let mut pipeline = Pipeline::from_config(&config(), MemorySink::new()).unwrap();
        let b = bar("BTC-USD", 0, 100.0, 1_000.0);
        pipeline.run_tick(tick(vec![b.clone()])).unwrap();
        let report = pipeline.run_tick(tick(vec![b])).unwrap();
        assert_eq!(report.bars_dropped, 1);
        assert_eq!(pipeline.sink().features.len(), 1);
    }

    #[test]
    fn rejections_are_ledgered() {
        let mut cfg = config();
        cfg.max_position_value = 1_000.0;
        cfg.cooldown_bars = 100; // block all re-entry
        let mut pipeline = Pipeline::from_config(&cfg, MemorySink::new()).unwrap();

        for bars in breakout_bars("BTC-USD") {
            pipeline.run_tick(tick(bars)).unwrap();
        }
        // Stop out, then attempt to re-enter inside the cooldown window.
        pipeline
            .run_tick(tick(vec![bar("BTC-USD", 7, 95.0, 1_000.0)]))
            .unwrap();
        assert!(!pipeline.account().has_position("BTC-USD"));

        for h in 8..14 {
            pipeline
                .run_tick(tick(vec![bar("BTC-USD", h, 95.0, 1_000.0 + (h % 3) as f64 * 50.0)]))
                .unwrap();
        }
        let report = pipeline
            .run_tick(tick(vec![bar("BTC-USD", 14, 105.0, 5_000.0)]))
            .unwrap();
        assert_eq!(report.orders_rejected, 1);
        assert_eq!(pipeline.rejections().len(), 1);
        assert_eq!(
            pipeline.rejections()[0].decision.reject_reason(),
            Some(crate::risk::RejectReason::Cooldown)
        );
    }

    #[test]
    fn equity_curve_appends_every_tick() {
        let mut pipeline = Pipeline::from_config(&config(), MemorySink::new()).unwrap();
        for bars in breakout_bars("BTC-USD") {
            pipeline.run_tick(tick(bars)).unwrap();
        }
        assert_eq!(pipeline.account().equity_curve.len(), 7);
    }

    #[test]
    fn full_replay_determinism() {
        let run = || {
            let mut pipeline = Pipeline::from_config(&config(), MemorySink::new()).unwrap();
            for bars in breakout_bars("BTC-USD") {
                pipeline.run_tick(tick(bars)).unwrap();
            }
            pipeline
                .run_tick(tick(vec![bar("BTC-USD", 7, 95.0, 1_200.0)]))
                .unwrap();
            let curve = pipeline.account().equity_curve.clone();
            let sink = pipeline.into_sink();
            (
                serde_json::to_string(&sink.features).unwrap(),
                serde_json::to_string(&sink.signals).unwrap(),
                serde_json::to_string(&sink.fills).unwrap(),
                serde_json::to_string(&sink.pnls).unwrap(),
                curve,
            )
        };
        assert_eq!(run(), run());
    }
}
