//! Grid model type definitions.
//!
//! The grid model is the provider boundary of the FLISR core: buses, lines,
//! transformers, line switches and loads, plus the handful of mutations the
//! protocol and the fault injector need (switch state and load changes).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::TopologyError;
use super::graph::{EdgeKind, TopologyGraph};

pub type BusId = u32;
pub type LineId = u32;
pub type SwitchId = u32;

/// A bus (node) of the distribution network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Nominal line-to-line voltage in kV
    #[serde(default = "default_vn_kv")]
    pub vn_kv: f64,
}

fn default_vn_kv() -> f64 {
    20.0
}

/// A line branch between two buses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub from_bus: BusId,
    pub to_bus: BusId,
}

impl Line {
    /// Returns the terminal opposite to `bus`, if `bus` is a terminal of this line
    pub fn other_end(&self, bus: BusId) -> Option<BusId> {
        if bus == self.from_bus {
            Some(self.to_bus)
        } else if bus == self.to_bus {
            Some(self.from_bus)
        } else {
            None
        }
    }
}

/// A transformer branch; never switched and never hosts a switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub id: u32,
    pub hv_bus: BusId,
    pub lv_bus: BusId,
}

/// Switch device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    /// Substation breaker, the only kind allowed to trip on sensed over-current
    #[serde(alias = "CB")]
    CircuitBreaker,
    /// Sectionalizer or tie switch
    #[serde(alias = "tie", alias = "LS")]
    Sectionalizer,
}

/// A line switch as described by the grid model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchSpec {
    pub id: SwitchId,
    pub name: String,
    pub kind: SwitchKind,
    /// Anchor bus; one of the terminals of `line`
    pub bus: BusId,
    pub line: LineId,
    pub closed: bool,
}

/// A constant-power load attached to a bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub bus: BusId,
    #[serde(default)]
    pub p_mw: f64,
    #[serde(default)]
    pub q_mvar: f64,
}

impl Load {
    /// Apparent power in MVA
    pub fn apparent_mva(&self) -> f64 {
        self.p_mw.hypot(self.q_mvar)
    }
}

/// Complete grid model with its mutable switch and load state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridModel {
    pub buses: Vec<Bus>,
    /// Buses fed by an external grid (substation sources)
    pub sources: Vec<BusId>,
    pub lines: Vec<Line>,
    #[serde(default)]
    pub transformers: Vec<Transformer>,
    pub switches: Vec<SwitchSpec>,
    #[serde(default)]
    pub loads: Vec<Load>,
}

impl GridModel {
    /// Check that every reference in the model resolves and that each line
    /// hosts at most one switch anchored at one of its terminals.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut bus_ids = HashSet::new();
        for bus in &self.buses {
            if !bus_ids.insert(bus.id) {
                return Err(TopologyError::DuplicateId { kind: "bus", id: bus.id });
            }
        }

        for source in &self.sources {
            if !bus_ids.contains(source) {
                return Err(TopologyError::UnknownSource(*source));
            }
        }

        let mut line_ids = HashSet::new();
        for line in &self.lines {
            if !line_ids.insert(line.id) {
                return Err(TopologyError::DuplicateId { kind: "line", id: line.id });
            }
            for bus in [line.from_bus, line.to_bus] {
                if !bus_ids.contains(&bus) {
                    return Err(TopologyError::DanglingLine { line: line.id, bus });
                }
            }
        }

        let mut trafo_ids = HashSet::new();
        for trafo in &self.transformers {
            if !trafo_ids.insert(trafo.id) {
                return Err(TopologyError::DuplicateId { kind: "transformer", id: trafo.id });
            }
            for bus in [trafo.hv_bus, trafo.lv_bus] {
                if !bus_ids.contains(&bus) {
                    return Err(TopologyError::DanglingTransformer { transformer: trafo.id, bus });
                }
            }
        }

        for load in &self.loads {
            if !bus_ids.contains(&load.bus) {
                return Err(TopologyError::DanglingLoad(load.bus));
            }
        }

        let mut switch_ids = HashSet::new();
        for switch in &self.switches {
            if !switch_ids.insert(switch.id) {
                return Err(TopologyError::DuplicateId { kind: "switch", id: switch.id });
            }
            if !bus_ids.contains(&switch.bus) {
                return Err(TopologyError::MissingAnchorBus { switch: switch.id, bus: switch.bus });
            }
            let line = self.line(switch.line).ok_or(TopologyError::UnknownLine {
                switch: switch.id,
                line: switch.line,
            })?;
            if line.other_end(switch.bus).is_none() {
                return Err(TopologyError::AnchorNotOnLine {
                    switch: switch.id,
                    bus: switch.bus,
                    line: switch.line,
                });
            }
            if let Some(first) = self
                .switches
                .iter()
                .find(|other| other.line == switch.line && other.id != switch.id)
            {
                let (first, second) = if first.id < switch.id {
                    (first.id, switch.id)
                } else {
                    (switch.id, first.id)
                };
                return Err(TopologyError::SharedLine { line: switch.line, first, second });
            }
        }

        Ok(())
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.iter().find(|bus| bus.id == id)
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.iter().find(|line| line.id == id)
    }

    pub fn switch(&self, id: SwitchId) -> Option<&SwitchSpec> {
        self.switches.iter().find(|switch| switch.id == id)
    }

    /// The switch guarding `line`, if any
    pub fn switch_on_line(&self, line: LineId) -> Option<&SwitchSpec> {
        self.switches.iter().find(|switch| switch.line == line)
    }

    /// A line conducts unless it hosts an open switch
    pub fn line_in_service(&self, line: LineId) -> bool {
        self.switch_on_line(line).map_or(true, |switch| switch.closed)
    }

    /// Set the physical state of a switch; returns false for an unknown id
    pub fn set_switch_closed(&mut self, id: SwitchId, closed: bool) -> bool {
        match self.switches.iter_mut().find(|switch| switch.id == id) {
            Some(switch) => {
                switch.closed = closed;
                true
            }
            None => false,
        }
    }

    /// Set every load to the same active and reactive power
    pub fn set_all_loads(&mut self, p_mw: f64, q_mvar: f64) {
        for load in &mut self.loads {
            load.p_mw = p_mw;
            load.q_mvar = q_mvar;
        }
    }

    /// Set the active power of every load at `bus`; returns false if none exists
    pub fn set_bus_active_load(&mut self, bus: BusId, p_mw: f64) -> bool {
        let mut found = false;
        for load in self.loads.iter_mut().filter(|load| load.bus == bus) {
            load.p_mw = p_mw;
            found = true;
        }
        found
    }

    pub fn has_load(&self, bus: BusId) -> bool {
        self.loads.iter().any(|load| load.bus == bus)
    }

    /// Graph view with every switch treated as closed
    pub fn topology_graph(&self) -> TopologyGraph {
        self.build_graph(false)
    }

    /// Graph view of the branches currently conducting
    pub fn service_graph(&self) -> TopologyGraph {
        self.build_graph(true)
    }

    fn build_graph(&self, respect_switches: bool) -> TopologyGraph {
        let mut graph = TopologyGraph::new(self.buses.iter().map(|bus| bus.id));
        for line in &self.lines {
            if respect_switches && !self.line_in_service(line.id) {
                continue;
            }
            graph.add_edge(line.from_bus, line.to_bus, EdgeKind::Line(line.id));
        }
        for trafo in &self.transformers {
            graph.add_edge(trafo.hv_bus, trafo.lv_bus, EdgeKind::Transformer(trafo.id));
        }
        graph
    }
}
