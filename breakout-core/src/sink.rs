//! Record sink — append-only boundary to the external warehouse.
//!
//! Every write is a pure append keyed by (symbol, timestamp, record kind);
//! the core always emits the same key for the same logical event, so an
//! at-least-once upstream can dedupe safely. Retries and batching live with
//! the caller, never here.

use crate::domain::{Fill, PnLRecord, Signal};
use crate::features::FeatureVector;

/// Append-only output boundary for pipeline records.
pub trait RecordSink {
    fn append_feature(&mut self, features: &FeatureVector);
    fn append_signal(&mut self, signal: &Signal);
    fn append_fill(&mut self, fill: &Fill);
    fn append_pnl(&mut self, pnl: &PnLRecord);
}

/// In-memory sink for tests and backtest reporting.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub features: Vec<FeatureVector>,
    pub signals: Vec<Signal>,
    pub fills: Vec<Fill>,
    pub pnls: Vec<PnLRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn append_feature(&mut self, features: &FeatureVector) {
        self.features.push(features.clone());
    }

    fn append_signal(&mut self, signal: &Signal) {
        self.signals.push(signal.clone());
    }

    fn append_fill(&mut self, fill: &Fill) {
        self.fills.push(fill.clone());
    }

    fn append_pnl(&mut self, pnl: &PnLRecord) {
        self.pnls.push(pnl.clone());
    }
}
