//! Topological estimator for radial feeders.
//!
//! Energized buses are those reachable from a source through conducting
//! branches and are reported at 1.0 p.u. Every conducting line carries the
//! apparent power of the subtree behind it, converted with
//! `I = S / (sqrt(3) * Vn)` at the nominal voltage of its downstream bus.
//! Loops and islands fed by more than one source are rejected.

use std::collections::{BTreeMap, VecDeque};

use log::trace;

use super::{ElectricalSolver, SolverError, Solution};
use crate::grid::{BusId, EdgeKind, GridModel};

#[derive(Debug, Clone, Copy, Default)]
pub struct RadialSolver;

impl RadialSolver {
    pub fn new() -> Self {
        Self
    }
}

impl ElectricalSolver for RadialSolver {
    fn solve(&self, grid: &GridModel) -> Result<Solution, SolverError> {
        let graph = grid.service_graph();

        let mut sources = grid.sources.clone();
        sources.sort_unstable();
        sources.dedup();

        let mut parent: BTreeMap<BusId, Option<(BusId, EdgeKind)>> = BTreeMap::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        // Every source seeds the same traversal, so a second source reached
        // from the first shows up as a closed loop below.
        for source in sources {
            parent.insert(source, None);
            queue.push_back(source);
        }

        while let Some(bus) = queue.pop_front() {
            order.push(bus);
            let via = parent.get(&bus).copied().flatten();
            for &(next, edge) in graph.neighbors(bus) {
                if via == Some((next, edge)) || next == bus {
                    continue;
                }
                if parent.contains_key(&next) {
                    return Err(SolverError::NonConvergence {
                        reason: format!("meshed path closes at bus {}", next),
                    });
                }
                parent.insert(next, Some((bus, edge)));
                queue.push_back(next);
            }
        }

        let mut subtree_mva: BTreeMap<BusId, f64> = BTreeMap::new();
        for load in &grid.loads {
            *subtree_mva.entry(load.bus).or_insert(0.0) += load.apparent_mva();
        }

        let mut solution = Solution::default();
        for &bus in order.iter().rev() {
            solution.bus_vm_pu.insert(bus, 1.0);
            let Some((upper, edge)) = parent.get(&bus).copied().flatten() else {
                continue;
            };
            let mva = subtree_mva.get(&bus).copied().unwrap_or(0.0);
            *subtree_mva.entry(upper).or_insert(0.0) += mva;

            if let EdgeKind::Line(line) = edge {
                let vn_kv = grid.bus(bus).map_or(0.0, |b| b.vn_kv);
                if vn_kv <= 0.0 {
                    return Err(SolverError::NonConvergence {
                        reason: format!("bus {} has no positive nominal voltage", bus),
                    });
                }
                solution.line_i_ka.insert(line, mva / (3f64.sqrt() * vn_kv));
            }
        }

        trace!(
            "Radial solve: {} energized buses, {} loaded lines",
            solution.bus_vm_pu.len(),
            solution.line_i_ka.len()
        );
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Bus, Line, Load, SwitchKind, SwitchSpec, Transformer};

    fn chain(closed: bool) -> GridModel {
        GridModel {
            buses: (0..4).map(|id| Bus { id, name: None, vn_kv: 20.0 }).collect(),
            sources: vec![0],
            lines: vec![
                Line { id: 0, from_bus: 0, to_bus: 1 },
                Line { id: 1, from_bus: 1, to_bus: 2 },
            ],
            transformers: vec![Transformer { id: 0, hv_bus: 2, lv_bus: 3 }],
            switches: vec![SwitchSpec {
                id: 0,
                name: "S0".to_string(),
                kind: SwitchKind::Sectionalizer,
                bus: 1,
                line: 1,
                closed,
            }],
            loads: vec![
                Load { bus: 1, p_mw: 0.04, q_mvar: 0.004 },
                Load { bus: 3, p_mw: 0.04, q_mvar: 0.004 },
            ],
        }
    }

    #[test]
    fn test_currents_accumulate_subtree_load() {
        let solution = RadialSolver.solve(&chain(true)).unwrap();
        let per_load = 0.04f64.hypot(0.004) / (3f64.sqrt() * 20.0);
        assert!((solution.line_current(0) - 2.0 * per_load).abs() < 1e-12);
        assert!((solution.line_current(1) - per_load).abs() < 1e-12);
        assert_eq!(solution.bus_voltage(3), 1.0);
    }

    #[test]
    fn test_open_switch_deenergizes_downstream() {
        let solution = RadialSolver.solve(&chain(false)).unwrap();
        assert_eq!(solution.bus_voltage(1), 1.0);
        assert_eq!(solution.bus_voltage(2), 0.0);
        assert_eq!(solution.bus_voltage(3), 0.0);
        assert_eq!(solution.line_current(1), 0.0);
    }

    #[test]
    fn test_only_the_edge_back_to_the_parent_is_skipped() {
        let mut grid = chain(true);
        grid.transformers.push(Transformer { id: 0, hv_bus: 3, lv_bus: 4 });
        grid.buses.push(Bus { id: 4, name: None, vn_kv: 0.4 });
        let solution = RadialSolver.solve(&grid).unwrap();
        assert_eq!(solution.bus_voltage(3), 1.0);
        assert_eq!(solution.bus_voltage(4), 1.0);
    }

    #[test]
    fn test_loop_is_non_convergence() {
        let mut grid = chain(true);
        grid.lines.push(Line { id: 2, from_bus: 0, to_bus: 2 });
        assert!(matches!(
            RadialSolver.solve(&grid),
            Err(SolverError::NonConvergence { .. })
        ));
    }

    #[test]
    fn test_two_sources_in_one_island_is_non_convergence() {
        let mut grid = chain(true);
        grid.sources.push(3);
        assert!(RadialSolver.solve(&grid).is_err());
    }
}
