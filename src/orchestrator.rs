//! Scenario orchestrator.
//!
//! Drives a session from fault injection to quiescence under a round cap and
//! collects a per-round trace for reporting.

use log::{info, warn};
use serde::Serialize;

use crate::agent::{Command, MessageValue, Mode};
use crate::config::{Config, TraceDetail};
use crate::engine::FlisrSession;
use crate::error::FlisrError;
use crate::grid::{BusId, SwitchId};
use crate::solver::{ElectricalSolver, RadialSolver};

/// Reportable state of one switch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchState {
    pub id: SwitchId,
    pub name: String,
    pub closed: bool,
    pub locked: bool,
    pub mode: Mode,
    pub over_current: bool,
}

/// Blackboard message with switch names resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceMessage {
    pub round: u32,
    pub sender: String,
    pub recipient: String,
    pub command: Command,
    pub value: MessageValue,
}

/// What happened in one processed round
#[derive(Debug, Clone, Serialize)]
pub struct RoundTrace {
    pub round: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<TraceMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switches: Option<Vec<SwitchState>>,
}

/// Result of a run that reached quiescence
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Number of `step` calls, including the final quiescent one
    pub steps: u32,
    pub final_round: u32,
    pub fault_bus: Option<BusId>,
    pub switches: Vec<SwitchState>,
    pub trace: Vec<RoundTrace>,
}

pub fn switch_states<S>(session: &FlisrSession<S>) -> Vec<SwitchState> {
    session
        .switches_snapshot()
        .into_iter()
        .map(|agent| SwitchState {
            id: agent.id,
            name: agent.name.clone(),
            closed: agent.closed(),
            locked: agent.locked(),
            mode: agent.mode,
            over_current: agent.measurements.over_current,
        })
        .collect()
}

fn trace_messages<S>(session: &FlisrSession<S>, round: u32) -> Vec<TraceMessage> {
    session
        .messages_at(round)
        .into_iter()
        .map(|m| TraceMessage {
            round: m.round,
            sender: session.switch_name(m.sender),
            recipient: session.switch_name(m.recipient),
            command: m.command,
            value: m.value,
        })
        .collect()
}

/// Step `session` until it reports quiescence, at most `max_rounds` times
pub fn run_to_quiescence<S: ElectricalSolver>(
    session: &mut FlisrSession<S>,
    max_rounds: u32,
    detail: TraceDetail,
) -> Result<RunOutcome, FlisrError> {
    let mut trace = Vec::new();

    for steps in 1..=max_rounds {
        let round = session.round();
        let active = session.step()?;

        trace.push(RoundTrace {
            round,
            messages: detail.includes_messages().then(|| trace_messages(session, round)),
            switches: detail.includes_switches().then(|| switch_states(session)),
        });

        if !active {
            info!("Protocol quiescent after {} step(s), round {}", steps, session.round());
            return Ok(RunOutcome {
                steps,
                final_round: session.round(),
                fault_bus: session.fault_bus(),
                switches: switch_states(session),
                trace,
            });
        }
    }

    warn!("Round cap of {} reached before quiescence", max_rounds);
    Err(FlisrError::NonTermination { max_rounds })
}

/// Build a session from a scenario, inject its fault and run it
pub fn run_scenario(config: &Config) -> Result<RunOutcome, FlisrError> {
    let mut session = FlisrSession::new(config.grid.clone(), RadialSolver::new())?
        .with_solver_policy(config.general.solver_policy())
        .with_lock_policy(config.general.lock_policy())
        .with_fault_load_mw(config.fault.fault_load_mw());

    session.set_fault(
        config.fault.bus,
        config.fault.max_load_factor(),
        config.fault.pre_fault_load_factor(),
    )?;

    run_to_quiescence(&mut session, config.general.max_rounds(), config.general.trace())
}
