//! Domain types for the breakout pipeline.

pub mod account;
pub mod bar;
pub mod fill;
pub mod pnl;
pub mod position;
pub mod signal;

pub use account::{EquityPoint, SimulatorAccount};
pub use bar::{Bar, BarError};
pub use fill::{Fill, Side};
pub use pnl::PnLRecord;
pub use position::Position;
pub use signal::{Signal, SignalSource, SignalType};

/// Symbol type alias
pub type Symbol = String;
