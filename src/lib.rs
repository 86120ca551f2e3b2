//! # GridHeal - Decentralized FLISR for distribution feeders
//!
//! This library implements a Fault-Location, Isolation and Service-Restoration
//! protocol run by autonomous switch agents. Each agent only knows its own
//! measurements and its neighbor switches; agents cooperate through a
//! round-stamped blackboard to trip on over-current, locate the faulted
//! section, isolate it and backfeed healthy sections through tie switches.
//!
//! ## Architecture
//!
//! - `grid`: Grid model provider and its graph views
//! - `topology`: One-time derivation of upstream/downstream neighbor groups
//! - `agent`: Switch agent state and protocol vocabulary
//! - `blackboard`: Append-only, round-stamped message log
//! - `engine`: Protocol session, message rules and fault injection
//! - `solver`: Electrical solver boundary and a radial reference estimator
//! - `config` / `config_loader`: YAML scenario files
//! - `orchestrator`: Driver loop with round cap and per-round trace
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use gridheal::{config_loader, orchestrator};
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("scenarios/two_feeders.yaml"))?;
//! let outcome = orchestrator::run_scenario(&config)?;
//! for state in &outcome.switches {
//!     println!("{} closed={} mode={}", state.name, state.closed, state.mode);
//! }
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Scenario Format
//!
//! ```yaml
//! general:
//!   max_rounds: 200
//!   lock_policy: disabled      # energized_open | disabled
//! fault:
//!   bus: 2
//! grid:
//!   buses: [{ id: 0 }, { id: 1 }, { id: 2 }]
//!   sources: [0]
//!   lines:
//!     - { id: 0, from_bus: 0, to_bus: 1 }
//!     - { id: 1, from_bus: 1, to_bus: 2 }
//!   switches:
//!     - { id: 0, name: CB0, kind: circuit_breaker, bus: 0, line: 0, closed: true }
//!     - { id: 1, name: S1, kind: sectionalizer, bus: 1, line: 1, closed: true }
//!   loads:
//!     - { bus: 1, p_mw: 0.04, q_mvar: 0.004 }
//!     - { bus: 2, p_mw: 0.04, q_mvar: 0.004 }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return typed errors (`FlisrError`, `TopologyError`,
//! `SolverError`, `ValidationError`). Scenario loading and the binary use
//! `color_eyre` for reporting with context.

pub mod agent;
pub mod blackboard;
pub mod config;
pub mod config_loader;
pub mod engine;
pub mod error;
pub mod grid;
pub mod orchestrator;
pub mod solver;
pub mod topology;

pub use engine::FlisrSession;
pub use error::{FlisrError, TopologyError};
