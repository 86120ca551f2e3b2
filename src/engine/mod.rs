//! Round-synchronous protocol engine.
//!
//! A [`FlisrSession`] owns the grid model, the switch agent table and the
//! blackboard for one run. Rounds are processed one [`FlisrSession::step`]
//! at a time: every switch, in ascending id, senses locally and consumes the
//! messages addressed to it for the current round. Changed switch states are
//! then pushed to the grid, the solver refreshes all measurements, and the
//! quiescence check decides whether another round is needed.

pub mod fault;
pub(crate) mod rules;

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};

use crate::agent::SwitchAgent;
use crate::blackboard::{Blackboard, Message};
use crate::config::{LockPolicy, SolverPolicy, DEFAULT_FAULT_LOAD_MW};
use crate::error::{FlisrError, TopologyError};
use crate::grid::{BusId, GridModel, SwitchId};
use crate::solver::{ElectricalSolver, Solution};
use crate::topology;

use rules::Outbox;

pub struct FlisrSession<S> {
    grid: GridModel,
    solver: S,
    initial_states: BTreeMap<SwitchId, bool>,
    solver_policy: SolverPolicy,
    lock_policy: LockPolicy,
    fault_load_mw: f64,
    switches: BTreeMap<SwitchId, SwitchAgent>,
    blackboard: Blackboard,
    round: u32,
    fault_bus: Option<BusId>,
}

impl<S: ElectricalSolver> FlisrSession<S> {
    /// Build a session over `grid` and run topology analysis
    pub fn new(grid: GridModel, solver: S) -> Result<Self, FlisrError> {
        let initial_states = grid.switches.iter().map(|sw| (sw.id, sw.closed)).collect();
        let mut session = Self {
            grid,
            solver,
            initial_states,
            solver_policy: SolverPolicy::default(),
            lock_policy: LockPolicy::default(),
            fault_load_mw: DEFAULT_FAULT_LOAD_MW,
            switches: BTreeMap::new(),
            blackboard: Blackboard::new(),
            round: 0,
            fault_bus: None,
        };
        session.initialize()?;
        Ok(session)
    }

    pub fn with_solver_policy(mut self, policy: SolverPolicy) -> Self {
        self.solver_policy = policy;
        self
    }

    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    /// Active power applied at the fault bus by [`FlisrSession::set_fault`]
    pub fn with_fault_load_mw(mut self, fault_load_mw: f64) -> Self {
        self.fault_load_mw = fault_load_mw;
        self
    }

    /// Rebuild the switch table and blackboard from the current grid model
    pub fn initialize(&mut self) -> Result<(), FlisrError> {
        self.grid.validate()?;
        let neighbors = topology::analyze(&self.grid.topology_graph(), &self.grid.switches)?;

        let mut switches = BTreeMap::new();
        for spec in &self.grid.switches {
            let line = self.grid.line(spec.line).ok_or(TopologyError::UnknownLine {
                switch: spec.id,
                line: spec.line,
            })?;
            let groups = neighbors.get(&spec.id).cloned().unwrap_or_default();
            let agent = SwitchAgent::new(
                spec.id,
                spec.name.clone(),
                spec.kind,
                spec.line,
                spec.bus,
                (line.from_bus, line.to_bus),
                spec.closed,
                &groups.upstream,
                &groups.downstream,
            );
            switches.insert(spec.id, agent);
        }

        self.switches = switches;
        self.blackboard = Blackboard::new();
        self.round = 0;
        self.fault_bus = None;
        info!("Initialized {}", self);
        Ok(())
    }

    /// Restore every switch to its initial state and start over
    pub fn reset(&mut self) -> Result<(), FlisrError> {
        for (id, closed) in &self.initial_states {
            self.grid.set_switch_closed(*id, *closed);
        }
        self.initialize()
    }

    /// Process one round. Returns `false` once the protocol is quiescent.
    pub fn step(&mut self) -> Result<bool, FlisrError> {
        let round = self.round;
        let ids: Vec<SwitchId> = self.switches.keys().copied().collect();

        for id in ids {
            let agent = self.switches.get_mut(&id).ok_or(FlisrError::UnknownSwitch(id))?;
            let inbox = self.blackboard.messages_for(id, round);
            let mut out = Outbox::new(&mut self.blackboard, id, round);

            rules::sense(agent, &mut out);
            for message in &inbox {
                debug!(
                    "Round {}: {} <- {} from switch {}",
                    round, agent.name, message.command, message.sender
                );
                rules::consume(agent, message, &mut out);
            }
        }

        self.push_switch_states();
        self.round += 1;
        let solution = self.solve("round refresh")?;
        self.refresh_measurements(&solution);

        let processed = self.blackboard.count_at(round);
        let pending = self.blackboard.count_at(self.round);
        debug!(
            "Round {} done: {} processed, {} pending",
            round, processed, pending
        );
        Ok(self.round <= 1 || processed > 0 || pending > 0)
    }

    /// Copy commanded states of unlocked switches to the grid model
    fn push_switch_states(&mut self) {
        for agent in self.switches.values() {
            if agent.locked() {
                continue;
            }
            let physical = self.grid.switch(agent.id).map(|sw| sw.closed);
            if physical != Some(agent.closed()) && self.grid.set_switch_closed(agent.id, agent.closed()) {
                info!(
                    "Switch {} is now {}",
                    agent.name,
                    if agent.closed() { "closed" } else { "open" }
                );
            }
        }
    }

    /// Run the solver under the configured policy
    fn solve(&self, stage: &'static str) -> Result<Solution, FlisrError> {
        match self.solver.solve(&self.grid) {
            Ok(solution) => Ok(solution),
            Err(source) => match self.solver_policy {
                SolverPolicy::Strict => Err(FlisrError::SolverDivergence { stage, source }),
                SolverPolicy::Legacy => {
                    warn!("Solver failed during {}, zero-filling measurements: {}", stage, source);
                    Ok(Solution::default())
                }
            },
        }
    }

    fn refresh_measurements(&mut self, solution: &Solution) {
        for agent in self.switches.values_mut() {
            agent.refresh(solution);
        }
    }
}

impl<S> FlisrSession<S> {
    /// Copy of every switch record in ascending id
    pub fn switches_snapshot(&self) -> Vec<SwitchAgent> {
        self.switches.values().cloned().collect()
    }

    pub fn switch(&self, id: SwitchId) -> Option<&SwitchAgent> {
        self.switches.get(&id)
    }

    pub fn messages_at(&self, round: u32) -> Vec<Message> {
        self.blackboard.messages_at(round)
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    /// Index of the next round to process
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn fault_bus(&self) -> Option<BusId> {
        self.fault_bus
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    /// Name of a switch, falling back to its id
    pub fn switch_name(&self, id: SwitchId) -> String {
        self.switches
            .get(&id)
            .map_or_else(|| id.to_string(), |agent| agent.name.clone())
    }
}

impl<S> fmt::Display for FlisrSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FLISR[switches({}), sources({}), buses({})]",
            self.switches.len(),
            self.grid.sources.len(),
            self.grid.buses.len()
        )
    }
}
