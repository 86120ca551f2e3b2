//! Per-switch protocol record.
//!
//! A [`SwitchAgent`] holds the commanded switch state, the lock flag, the
//! mode and the two neighbor groups with one last-message slot per
//! neighbor. The group key sets are fixed when the agent is built.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::types::{Command, Direction, LastMessage, Measurements, Mode, SwitchKind};
use crate::grid::{BusId, LineId, SwitchId};
use crate::solver::Solution;

/// Voltage below which a switch terminal is considered de-energized (p.u.)
pub const DEAD_VOLTAGE_PU: f64 = 0.001;

/// Neighbor id to the last message received from it
pub type NeighborGroup = BTreeMap<SwitchId, Option<LastMessage>>;

#[derive(Debug, Clone, Serialize)]
pub struct SwitchAgent {
    pub id: SwitchId,
    pub name: String,
    pub kind: SwitchKind,
    pub line: LineId,
    pub bus: BusId,
    pub bus_from: BusId,
    pub bus_to: BusId,
    closed: bool,
    locked: bool,
    pub mode: Mode,
    pub nb_up: NeighborGroup,
    pub nb_down: NeighborGroup,
    pub measurements: Measurements,
    #[serde(skip)]
    seen: BTreeSet<Command>,
}

impl SwitchAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SwitchId,
        name: impl Into<String>,
        kind: SwitchKind,
        line: LineId,
        bus: BusId,
        (bus_from, bus_to): (BusId, BusId),
        closed: bool,
        upstream: &BTreeSet<SwitchId>,
        downstream: &BTreeSet<SwitchId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            line,
            bus,
            bus_from,
            bus_to,
            closed,
            locked: false,
            mode: Mode::Idle,
            nb_up: upstream.iter().map(|id| (*id, None)).collect(),
            nb_down: downstream.iter().map(|id| (*id, None)).collect(),
            measurements: Measurements::default(),
            seen: BTreeSet::new(),
        }
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Change the commanded state. A locked switch is left untouched and
    /// `false` is returned.
    pub fn set_closed(&mut self, closed: bool) -> bool {
        if self.locked {
            return false;
        }
        self.closed = closed;
        true
    }

    pub fn is_breaker(&self) -> bool {
        self.kind == SwitchKind::CircuitBreaker
    }

    /// All neighbors in ascending id
    pub fn neighbors(&self) -> Vec<SwitchId> {
        let all: BTreeSet<SwitchId> = self.nb_up.keys().chain(self.nb_down.keys()).copied().collect();
        all.into_iter().collect()
    }

    /// All neighbors except `sender`, in ascending id
    pub fn neighbors_except(&self, sender: SwitchId) -> Vec<SwitchId> {
        self.neighbors().into_iter().filter(|id| *id != sender).collect()
    }

    pub fn direction_of(&self, neighbor: SwitchId) -> Option<Direction> {
        if self.nb_up.contains_key(&neighbor) {
            Some(Direction::Upstream)
        } else if self.nb_down.contains_key(&neighbor) {
            Some(Direction::Downstream)
        } else {
            None
        }
    }

    pub fn group(&self, direction: Direction) -> &NeighborGroup {
        match direction {
            Direction::Upstream => &self.nb_up,
            Direction::Downstream => &self.nb_down,
        }
    }

    /// Store `message` in the slot of `sender`. Returns the group it went
    /// into, or `None` when the sender is not a neighbor.
    pub fn record(&mut self, sender: SwitchId, message: LastMessage) -> Option<Direction> {
        let direction = self.direction_of(sender)?;
        self.seen.insert(message.command);
        let slot = match direction {
            Direction::Upstream => self.nb_up.get_mut(&sender),
            Direction::Downstream => self.nb_down.get_mut(&sender),
        };
        if let Some(slot) = slot {
            *slot = Some(message);
        }
        Some(direction)
    }

    /// Whether a message with `command` has been received during this run
    pub fn has_seen(&self, command: Command) -> bool {
        self.seen.contains(&command)
    }

    /// Exactly one terminal is below the dead-voltage threshold
    pub fn one_side_dead(&self) -> bool {
        (self.measurements.v_from < DEAD_VOLTAGE_PU) != (self.measurements.v_to < DEAD_VOLTAGE_PU)
    }

    /// Pull voltages and current for this switch out of a solve result
    pub fn refresh(&mut self, solution: &Solution) {
        let m = &mut self.measurements;
        m.v_from = solution.bus_voltage(self.bus_from);
        m.v_to = solution.bus_voltage(self.bus_to);
        m.current = solution.line_current(self.line);
        m.over_current = m.current_max < m.current_post;
    }
}

/// Neighbor with the largest reported `IkARemai` value in `group`.
///
/// Neighbors are scanned in ascending id and only a strictly larger value
/// replaces the current best, so the lowest id wins among equals.
pub fn best_remaining(group: &NeighborGroup) -> Option<SwitchId> {
    let mut best: Option<(SwitchId, f64)> = None;
    for (id, slot) in group {
        let Some(LastMessage { command: Command::IkARemai, value }) = slot else {
            continue;
        };
        let Some(current) = value.as_current() else {
            continue;
        };
        match best {
            Some((_, top)) if current <= top => {}
            _ => best = Some((*id, current)),
        }
    }
    best.map(|(id, _)| id)
}
