//! Switch agents: protocol vocabulary and per-switch state.

pub mod switch;
pub mod types;

pub use switch::{best_remaining, NeighborGroup, SwitchAgent, DEAD_VOLTAGE_PU};
pub use types::{Command, Direction, LastMessage, Measurements, MessageValue, Mode, SwitchKind};
