//! Breakout Core — feature computation, signal scoring, risk controls and
//! deterministic paper-trading simulation over OHLCV bars.
//!
//! This crate is the heart of the pipeline:
//! - Domain types (bars, signals, positions, fills, pnl records, accounts)
//! - Windowed feature engine with per-symbol ring buffers
//! - Pluggable signal strategies (rule-based and model-based) behind one trait
//! - Risk controller with ordered admission checks and conflict arbitration
//! - FLAT → OPEN → FLAT paper simulator with intrabar protective exits
//! - Tick clock for deterministic backtests and ordered live replay
//!
//! No blocking I/O happens here; bars come in through ordered iterators and
//! records leave through the append-only [`sink::RecordSink`] boundary.

pub mod clock;
pub mod config;
pub mod domain;
pub mod features;
pub mod pipeline;
pub mod risk;
pub mod signals;
pub mod sim;
pub mod sink;
