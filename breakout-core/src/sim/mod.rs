//! Paper-trading simulation — positions, fills, realized pnl, equity.

pub mod cost;
pub mod simulator;

pub use cost::CostModel;
pub use simulator::{ExitRules, SimulationError, Simulator, TickOutcome};
