use serde::{Deserialize, Serialize};

use crate::grid::{BusId, GridModel};

pub const DEFAULT_MAX_ROUNDS: u32 = 200;
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.08;
pub const DEFAULT_PRE_FAULT_LOAD_FACTOR: f64 = 0.04;
pub const DEFAULT_FAULT_LOAD_MW: f64 = 2.0;

/// What happens when the electrical solver fails to converge
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolverPolicy {
    /// Surface the failure to the caller
    #[default]
    Strict,
    /// Log a warning and continue with all measurements zeroed
    Legacy,
}

/// Which switches are locked when the fault is injected
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Lock every open switch with both terminals energized
    #[default]
    EnergizedOpen,
    /// Never lock
    Disabled,
}

/// Amount of detail recorded per round by the driver loop
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TraceDetail {
    /// Switch states and messages
    #[default]
    Full,
    Messages,
    Switches,
}

impl TraceDetail {
    pub fn includes_messages(&self) -> bool {
        matches!(self, TraceDetail::Full | TraceDetail::Messages)
    }

    pub fn includes_switches(&self) -> bool {
        matches!(self, TraceDetail::Full | TraceDetail::Switches)
    }
}

/// Scenario file: run settings, fault description and grid model
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub fault: FaultConfig,
    pub grid: GridModel,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.general.max_rounds() == 0 {
            return Err(ValidationError::InvalidGeneral(
                "max_rounds must be at least 1".to_string(),
            ));
        }

        let max = self.fault.max_load_factor();
        let pre = self.fault.pre_fault_load_factor();
        if !(max > 0.0) || !(pre > 0.0) {
            return Err(ValidationError::InvalidFault(format!(
                "load factors must be positive (max_load_factor {}, pre_fault_load_factor {})",
                max, pre
            )));
        }
        if pre > max {
            return Err(ValidationError::InvalidFault(format!(
                "pre_fault_load_factor {} exceeds max_load_factor {}",
                pre, max
            )));
        }
        if !(self.fault.fault_load_mw() > 0.0) {
            return Err(ValidationError::InvalidFault(format!(
                "fault_load_mw must be positive, got {}",
                self.fault.fault_load_mw()
            )));
        }

        if self.grid.switches.is_empty() {
            return Err(ValidationError::InvalidGrid(
                "grid must define at least one switch".to_string(),
            ));
        }
        if self.grid.sources.is_empty() {
            return Err(ValidationError::InvalidGrid(
                "grid must define at least one source bus".to_string(),
            ));
        }

        Ok(())
    }
}

/// Run settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GeneralConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver_policy: Option<SolverPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_policy: Option<LockPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl GeneralConfig {
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS)
    }

    pub fn solver_policy(&self) -> SolverPolicy {
        self.solver_policy.unwrap_or_default()
    }

    pub fn lock_policy(&self) -> LockPolicy {
        self.lock_policy.unwrap_or_default()
    }

    pub fn trace(&self) -> TraceDetail {
        self.trace.unwrap_or_default()
    }
}

/// Fault to inject before the protocol runs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FaultConfig {
    pub bus: BusId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_load_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_fault_load_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault_load_mw: Option<f64>,
}

impl FaultConfig {
    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor.unwrap_or(DEFAULT_MAX_LOAD_FACTOR)
    }

    pub fn pre_fault_load_factor(&self) -> f64 {
        self.pre_fault_load_factor.unwrap_or(DEFAULT_PRE_FAULT_LOAD_FACTOR)
    }

    pub fn fault_load_mw(&self) -> f64 {
        self.fault_load_mw.unwrap_or(DEFAULT_FAULT_LOAD_MW)
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid fault configuration: {0}")]
    InvalidFault(String),
    #[error("Invalid grid configuration: {0}")]
    InvalidGrid(String),
}
