//! Signal — a scored directional recommendation produced by one strategy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional classification of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    BreakoutLong,
    BreakoutShort,
    Hold,
}

impl SignalType {
    pub fn is_directional(&self) -> bool {
        !matches!(self, Self::Hold)
    }

    /// Sign of the direction: +1 long, -1 short, 0 hold.
    pub fn direction(&self) -> i8 {
        match self {
            Self::BreakoutLong => 1,
            Self::BreakoutShort => -1,
            Self::Hold => 0,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BreakoutLong => write!(f, "breakout_long"),
            Self::BreakoutShort => write!(f, "breakout_short"),
            Self::Hold => write!(f, "hold"),
        }
    }
}

/// Which kind of strategy produced the signal.
///
/// Rule signals win strength ties against model signals during risk
/// arbitration (explainability priority).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalSource {
    Rule,
    Ml,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => write!(f, "rule"),
            Self::Ml => write!(f, "ml"),
        }
    }
}

/// An immutable scored recommendation for one (symbol, timestamp, strategy).
///
/// Produced from exactly one feature vector. Strength is in [0, 1]; the
/// rationale is free text for audit, never parsed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub signal_type: SignalType,
    pub strength: f64,
    pub source: SignalSource,
    pub strategy: String,
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn signal_type_direction() {
        assert_eq!(SignalType::BreakoutLong.direction(), 1);
        assert_eq!(SignalType::BreakoutShort.direction(), -1);
        assert_eq!(SignalType::Hold.direction(), 0);
        assert!(!SignalType::Hold.is_directional());
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(SignalType::BreakoutLong.to_string(), "breakout_long");
        assert_eq!(SignalSource::Ml.to_string(), "ml");
    }

    #[test]
    fn signal_serialization_roundtrip() {
        let signal = Signal {
            symbol: "BTC-USD".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            signal_type: SignalType::BreakoutLong,
            strength: 0.85,
            source: SignalSource::Rule,
            strategy: "rule_breakout".into(),
            rationale: "close cleared 14-bar high".into(),
        };
        let json = serde_json::to_string(&signal).unwrap();
        let deser: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(signal, deser);
    }
}
