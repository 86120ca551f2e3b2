//! Protocol vocabulary shared by switch agents and the blackboard.

use serde::Serialize;
use std::fmt;

pub use crate::grid::SwitchKind;

/// Local state of a switch agent. Starts `Idle` and never returns to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Mode {
    Idle,
    SelfHealing,
    IsolateSwitch,
    HelpSwitch,
    FaultIsolate,
    CheckRemai,
}

impl Mode {
    /// Modes in which a switch no longer takes part in restoration
    pub fn is_isolating(&self) -> bool {
        matches!(self, Mode::IsolateSwitch | Mode::FaultIsolate)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Command {
    SearchFault,
    IsFault,
    AreaIsolate,
    AreaHelp,
    IsolateInfo,
    SearchRemai,
    IkARemai,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Payload of a protocol message
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum MessageValue {
    Empty,
    Bool(bool),
    /// Current in kA
    Current(f64),
}

impl MessageValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MessageValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_current(&self) -> Option<f64> {
        match self {
            MessageValue::Current(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageValue::Empty => Ok(()),
            MessageValue::Bool(value) => write!(f, "{}", value),
            MessageValue::Current(value) => write!(f, "{:.5}", value),
        }
    }
}

/// Last message received from one neighbor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LastMessage {
    pub command: Command,
    pub value: MessageValue,
}

impl LastMessage {
    pub fn new(command: Command, value: MessageValue) -> Self {
        Self { command, value }
    }
}

/// Which neighbor group a switch belongs to, seen from another switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Upstream,
    Downstream,
}

/// Local electrical view of one switch, refreshed after every solve
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Measurements {
    pub v_from: f64,
    pub v_to: f64,
    pub current: f64,
    pub current_max: f64,
    pub current_pre: f64,
    pub current_post: f64,
    pub current_remaining: f64,
    pub over_current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_value_accessors() {
        assert_eq!(MessageValue::Bool(true).as_bool(), Some(true));
        assert_eq!(MessageValue::Current(0.5).as_bool(), None);
        assert_eq!(MessageValue::Current(0.5).as_current(), Some(0.5));
        assert_eq!(MessageValue::Empty.as_current(), None);
    }

    #[test]
    fn test_value_serializes_as_tagged_union() {
        let json = serde_json::to_string(&MessageValue::Current(0.25)).unwrap();
        assert_eq!(json, r#"{"type":"Current","value":0.25}"#);
        let json = serde_json::to_string(&MessageValue::Empty).unwrap();
        assert_eq!(json, r#"{"type":"Empty"}"#);
    }

    #[test]
    fn test_isolating_modes() {
        assert!(Mode::IsolateSwitch.is_isolating());
        assert!(Mode::FaultIsolate.is_isolating());
        assert!(!Mode::HelpSwitch.is_isolating());
        assert!(!Mode::Idle.is_isolating());
    }
}
