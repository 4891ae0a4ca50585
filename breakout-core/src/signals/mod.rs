//! Signal scoring — strategies turn feature vectors into directional signals.
//!
//! Strategies are feature-vector-pure: they receive derived indicator values,
//! never bar history or account state. The engine fans out to all registered
//! strategies in a fixed order and emits exactly one signal per
//! (symbol, timestamp, strategy). Conflicting directions are not resolved
//! here; arbitration belongs to the risk controller.

pub mod model;
pub mod rule;

pub use model::{LogisticModel, ModelParams};
pub use rule::RuleBreakout;

use crate::domain::{Signal, SignalSource};
use crate::features::FeatureVector;

/// Trait for signal strategies.
///
/// # Architecture invariant
/// `evaluate` receives only the feature vector. A strategy that needs account
/// or position state violates the producer/arbiter separation — sizing and
/// conflict resolution live in the risk controller.
pub trait Strategy: Send + Sync {
    /// Unique strategy name; appears on every emitted signal.
    fn name(&self) -> &str;

    /// Which kind of scorer this is (rule vs. ml), for tie-breaking.
    fn source(&self) -> SignalSource;

    /// Score one feature vector into a signal.
    ///
    /// Must always return a signal: undefined required features degrade to
    /// `hold` with strength 0, never an error.
    fn evaluate(&self, features: &FeatureVector) -> Signal;
}

/// Fans a feature vector out to all registered strategies.
pub struct SignalEngine {
    strategies: Vec<Box<dyn Strategy>>,
}

impl SignalEngine {
    /// Build from an ordered strategy set. Registration order is significant:
    /// it is the final tie-breaker during risk arbitration.
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// One signal per registered strategy, in registration order.
    pub fn score(&self, features: &FeatureVector) -> Vec<Signal> {
        self.strategies
            .iter()
            .map(|s| s.evaluate(features))
            .collect()
    }
}
