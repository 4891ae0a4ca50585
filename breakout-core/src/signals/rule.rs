//! Rule-based breakout strategy — threshold logic over named features.
//!
//! Fires long when the close cleared the prior n-bar high channel on
//! above-threshold volume; short is symmetric against the low channel.
//! Strength is the price margin beyond the channel, scaled and clamped to
//! [0, 1] — monotonic in the margin.

use crate::domain::{Signal, SignalSource, SignalType};
use crate::features::FeatureVector;

use super::Strategy;

/// Deterministic channel-breakout rule.
#[derive(Debug, Clone)]
pub struct RuleBreakout {
    name: String,
    /// Margin (as a fraction of the channel level) at which strength
    /// saturates at 1.0.
    margin_scale: f64,
    volume_z_threshold: f64,
    up_key: String,
    dn_key: String,
    volume_key: String,
}

impl RuleBreakout {
    pub fn new(
        name: String,
        range_period: usize,
        volume_period: usize,
        volume_z_threshold: f64,
        margin_scale: f64,
    ) -> Self {
        assert!(margin_scale > 0.0, "margin_scale must be positive");
        Self {
            name,
            margin_scale,
            volume_z_threshold,
            up_key: format!("range_break_up_{range_period}"),
            dn_key: format!("range_break_dn_{range_period}"),
            volume_key: format!("volume_z_{volume_period}"),
        }
    }

    fn strength_from_margin(&self, margin: f64) -> f64 {
        (margin / self.margin_scale).clamp(0.0, 1.0)
    }

    fn hold(&self, features: &FeatureVector, rationale: String) -> Signal {
        Signal {
            symbol: features.symbol.clone(),
            timestamp: features.timestamp,
            signal_type: SignalType::Hold,
            strength: 0.0,
            source: SignalSource::Rule,
            strategy: self.name.clone(),
            rationale,
        }
    }
}

impl Strategy for RuleBreakout {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> SignalSource {
        SignalSource::Rule
    }

    fn evaluate(&self, features: &FeatureVector) -> Signal {
        // Undefined required features are non-votes, never neutral zeros.
        let (Some(up_margin), Some(dn_margin), Some(volume_z)) = (
            features.get(&self.up_key),
            features.get(&self.dn_key),
            features.get(&self.volume_key),
        ) else {
            return self.hold(features, "insufficient history".into());
        };

        if volume_z < self.volume_z_threshold {
            return self.hold(
                features,
                format!(
                    "volume z {volume_z:.2} below threshold {:.2}",
                    self.volume_z_threshold
                ),
            );
        }

        if up_margin > 0.0 {
            return Signal {
                symbol: features.symbol.clone(),
                timestamp: features.timestamp,
                signal_type: SignalType::BreakoutLong,
                strength: self.strength_from_margin(up_margin),
                source: SignalSource::Rule,
                strategy: self.name.clone(),
                rationale: format!(
                    "close cleared channel high by {:.2}% on volume z {volume_z:.2}",
                    up_margin * 100.0
                ),
            };
        }
        if dn_margin > 0.0 {
            return Signal {
                symbol: features.symbol.clone(),
                timestamp: features.timestamp,
                signal_type: SignalType::BreakoutShort,
                strength: self.strength_from_margin(dn_margin),
                source: SignalSource::Rule,
                strategy: self.name.clone(),
                rationale: format!(
                    "close broke channel low by {:.2}% on volume z {volume_z:.2}",
                    dn_margin * 100.0
                ),
            };
        }

        self.hold(features, "close inside channel".into())
    }
}
