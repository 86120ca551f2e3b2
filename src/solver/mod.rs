//! Electrical solver boundary.
//!
//! The protocol never computes physics itself. It hands the grid model to an
//! [`ElectricalSolver`] and reads back per-bus voltage magnitudes and
//! per-line current magnitudes.

pub mod radial;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::grid::{BusId, GridModel, LineId};

pub use radial::RadialSolver;

/// Result of one solve. Buses and lines that are absent are de-energized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Solution {
    pub bus_vm_pu: BTreeMap<BusId, f64>,
    pub line_i_ka: BTreeMap<LineId, f64>,
}

impl Solution {
    /// Voltage magnitude in p.u., 0.0 when the bus is not in the result
    pub fn bus_voltage(&self, bus: BusId) -> f64 {
        self.bus_vm_pu.get(&bus).copied().unwrap_or(0.0)
    }

    /// Current magnitude in kA, 0.0 when the line is not in the result
    pub fn line_current(&self, line: LineId) -> f64 {
        self.line_i_ka.get(&line).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    #[error("power flow did not converge: {reason}")]
    NonConvergence { reason: String },
}

/// Computes bus voltages and line currents for the current grid state
pub trait ElectricalSolver {
    fn solve(&self, grid: &GridModel) -> Result<Solution, SolverError>;
}

impl<S: ElectricalSolver + ?Sized> ElectricalSolver for Box<S> {
    fn solve(&self, grid: &GridModel) -> Result<Solution, SolverError> {
        (**self).solve(grid)
    }
}
