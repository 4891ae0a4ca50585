//! Feature computation — derived indicators over trailing bar windows.
//!
//! Indicators are pure functions: trailing window in, one value out. A window
//! shorter than an indicator's minimum lookback yields `None` (undefined),
//! never zero — downstream strategies treat undefined features as non-votes.

pub mod engine;
pub mod indicators;

pub use engine::{DataQualityError, FeatureEngine};
pub use indicators::{Indicator, MaCrossover, RangeBreakout, RollingReturn, Volatility, VolumeZScore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Derived indicator values for one (symbol, timestamp).
///
/// Immutable after creation and deterministically derived from the trailing
/// window ending at `timestamp`: recomputing from the same window is
/// bit-identical. `None` marks an indicator whose window was too short.
/// BTreeMap keeps key order canonical for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl FeatureVector {
    /// Defined value of a named feature, `None` if undefined or absent.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    /// Whether the named feature was computed and defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}
