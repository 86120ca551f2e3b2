//! Error taxonomy for the FLISR core.
//!
//! Topology and fault-bus errors abort setup. Solver divergence is local to
//! one solve and is surfaced unless the legacy zero-fill policy is selected.
//! Non-termination is reported by the driver loop when the round cap is hit.

use crate::grid::{BusId, LineId, SwitchId};
use crate::solver::SolverError;

/// Errors raised while building, priming or running a protocol session
#[derive(Debug, thiserror::Error)]
pub enum FlisrError {
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("Electrical solver diverged during {stage}: {source}")]
    SolverDivergence {
        stage: &'static str,
        #[source]
        source: SolverError,
    },
    #[error("Fault bus {0} has no load attached")]
    InvalidFaultBus(BusId),
    #[error("Protocol did not reach quiescence within {max_rounds} rounds")]
    NonTermination { max_rounds: u32 },
    #[error("Unknown switch {0}")]
    UnknownSwitch(SwitchId),
}

/// Inconsistencies between switches, lines and buses in the grid model
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("switch {switch} is anchored at bus {bus}, which is not in the graph")]
    MissingAnchorBus { switch: SwitchId, bus: BusId },
    #[error("switch {switch} guards line {line}, which does not exist")]
    UnknownLine { switch: SwitchId, line: LineId },
    #[error("switch {switch} is anchored at bus {bus}, which is not a terminal of line {line}")]
    AnchorNotOnLine { switch: SwitchId, bus: BusId, line: LineId },
    #[error("line {line} is guarded by more than one switch ({first} and {second})")]
    SharedLine { line: LineId, first: SwitchId, second: SwitchId },
    #[error("line {line} references unknown bus {bus}")]
    DanglingLine { line: LineId, bus: BusId },
    #[error("transformer {transformer} references unknown bus {bus}")]
    DanglingTransformer { transformer: u32, bus: BusId },
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },
    #[error("load references unknown bus {0}")]
    DanglingLoad(BusId),
    #[error("source bus {0} does not exist")]
    UnknownSource(BusId),
}
