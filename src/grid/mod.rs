//! Grid model provider.
//!
//! Holds the static network description and its mutable switch and load
//! state, and exposes the graph views used by the topology analyzer and
//! the electrical solver.

pub mod graph;
pub mod types;

pub use graph::{EdgeKind, TopologyGraph};
pub use types::{
    Bus, BusId, GridModel, Line, LineId, Load, SwitchId, SwitchKind, SwitchSpec, Transformer,
};
