//! Network topology analysis.
//!
//! Derives each switch's upstream and downstream neighbor groups once, at
//! session initialization. The groups route every protocol message.

pub mod analyzer;
pub mod types;

pub use analyzer::analyze;
pub use types::{NeighborGroups, NeighborMap};
