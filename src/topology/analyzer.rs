//! Neighbor-group derivation.
//!
//! For each switch, breadth-first shortest paths are taken from its anchor
//! bus over the graph with every switch closed. Walking a path edge by edge,
//! the first other switched line met classifies its switch as upstream or
//! downstream depending on whether the switch's own line was crossed first.

use std::collections::BTreeMap;

use log::debug;

use super::types::{NeighborGroups, NeighborMap};
use crate::error::TopologyError;
use crate::grid::{LineId, SwitchId, SwitchSpec, TopologyGraph};

pub fn analyze(graph: &TopologyGraph, switches: &[SwitchSpec]) -> Result<NeighborMap, TopologyError> {
    let mut line_switch: BTreeMap<LineId, SwitchId> = BTreeMap::new();
    for switch in switches {
        if let Some(first) = line_switch.insert(switch.line, switch.id) {
            return Err(TopologyError::SharedLine {
                line: switch.line,
                first: first.min(switch.id),
                second: first.max(switch.id),
            });
        }
    }

    let mut result = NeighborMap::new();
    for switch in switches {
        if !graph.contains_bus(switch.bus) {
            return Err(TopologyError::MissingAnchorBus { switch: switch.id, bus: switch.bus });
        }
        let groups = analyze_switch(graph, switch, &line_switch);
        debug!(
            "Switch {} neighbors: upstream {:?}, downstream {:?}",
            switch.name, groups.upstream, groups.downstream
        );
        result.insert(switch.id, groups);
    }
    Ok(result)
}

fn analyze_switch(
    graph: &TopologyGraph,
    switch: &SwitchSpec,
    line_switch: &BTreeMap<LineId, SwitchId>,
) -> NeighborGroups {
    let mut groups = NeighborGroups::default();

    for path in graph.shortest_paths(switch.bus) {
        let mut passed_own_line = false;
        for hop in path.windows(2) {
            let Some(line) = graph.edge_between(hop[0], hop[1]).and_then(|edge| edge.line()) else {
                continue;
            };
            if line == switch.line {
                passed_own_line = true;
                continue;
            }
            let Some(&other) = line_switch.get(&line) else {
                continue;
            };
            if !groups.contains(other) {
                if passed_own_line {
                    groups.downstream.insert(other);
                } else {
                    groups.upstream.insert(other);
                }
            }
            break;
        }
    }

    groups
}
