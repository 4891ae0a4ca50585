//! Model-based strategy — pretrained logistic scorer over named features.
//!
//! Maps the feature vector to a probability in [0, 1] via
//! `sigmoid(bias + Σ w_i · x_i)`, then classifies against a decision
//! threshold (default 0.5 long, symmetric short). Parameters load once and
//! are immutable at inference time; `reload` swaps the whole set atomically
//! behind an Arc so in-flight inferences keep their snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::domain::{Signal, SignalSource, SignalType};
use crate::features::FeatureVector;

use super::Strategy;

/// Pretrained logistic parameters: feature name → weight, plus intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub weights: BTreeMap<String, f64>,
    pub bias: f64,
}

/// Logistic scoring strategy.
pub struct LogisticModel {
    name: String,
    params: RwLock<Arc<ModelParams>>,
    /// Probability at or above which the score classifies long; short is
    /// symmetric at `1 - long_threshold`. Must be in [0.5, 1).
    long_threshold: f64,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LogisticModel {
    pub fn new(name: String, params: ModelParams, long_threshold: f64) -> Self {
        assert!(
            (0.5..1.0).contains(&long_threshold),
            "long_threshold must be in [0.5, 1)"
        );
        Self {
            name,
            params: RwLock::new(Arc::new(params)),
            long_threshold,
        }
    }

    /// Replace the parameter set atomically.
    ///
    /// Readers that already took a snapshot keep scoring against the old
    /// parameters; the swap never blocks on them.
    pub fn reload(&self, params: ModelParams) {
        let mut guard = self.params.write().expect("model parameter lock poisoned");
        *guard = Arc::new(params);
        info!(model = %self.name, "model parameters reloaded");
    }

    fn snapshot(&self) -> Arc<ModelParams> {
        Arc::clone(&self.params.read().expect("model parameter lock poisoned"))
    }

    fn hold(&self, features: &FeatureVector, rationale: String) -> Signal {
        Signal {
            symbol: features.symbol.clone(),
            timestamp: features.timestamp,
            signal_type: SignalType::Hold,
            strength: 0.0,
            source: SignalSource::Ml,
            strategy: self.name.clone(),
            rationale,
        }
    }
}

impl Strategy for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> SignalSource {
        SignalSource::Ml
    }

    fn evaluate(&self, features: &FeatureVector) -> Signal {
        let params = self.snapshot();

        let mut score = params.bias;
        for (feature, weight) in &params.weights {
            // Any undefined input forces a non-vote: a missing feature must
            // never be scored as zero.
            let Some(value) = features.get(feature) else {
                return self.hold(features, format!("feature {feature} undefined"));
            };
            score += weight * value;
        }
        let probability = sigmoid(score);

        if probability >= self.long_threshold {
            Signal {
                symbol: features.symbol.clone(),
                timestamp: features.timestamp,
                signal_type: SignalType::BreakoutLong,
                strength: probability,
                source: SignalSource::Ml,
                strategy: self.name.clone(),
                rationale: format!("p={probability:.4} >= {:.2}", self.long_threshold),
            }
        } else if probability <= 1.0 - self.long_threshold {
            Signal {
                symbol: features.symbol.clone(),
                timestamp: features.timestamp,
                signal_type: SignalType::BreakoutShort,
                strength: 1.0 - probability,
                source: SignalSource::Ml,
                strategy: self.name.clone(),
                rationale: format!("p={probability:.4} <= {:.2}", 1.0 - self.long_threshold),
            }
        } else {
            self.hold(features, format!("p={probability:.4} inside dead zone"))
        }
    }
}
