//! Round-stamped, append-only message log shared by all switch agents.

use serde::Serialize;

use crate::agent::{Command, LastMessage, MessageValue};
use crate::grid::SwitchId;

/// One protocol message. Immutable once posted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Message {
    pub round: u32,
    pub sender: SwitchId,
    pub recipient: SwitchId,
    pub command: Command,
    pub value: MessageValue,
}

impl Message {
    /// The `{command, value}` pair stored in the recipient's neighbor slot
    pub fn payload(&self) -> LastMessage {
        LastMessage::new(self.command, self.value)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Blackboard {
    messages: Vec<Message>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages of `round` addressed to `recipient`, in posting order
    pub fn messages_for(&self, recipient: SwitchId, round: u32) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.recipient == recipient && m.round == round)
            .copied()
            .collect()
    }

    /// Messages of `round` posted by `sender`, in posting order
    pub fn messages_from(&self, sender: SwitchId, round: u32) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.sender == sender && m.round == round)
            .copied()
            .collect()
    }

    pub fn messages_at(&self, round: u32) -> Vec<Message> {
        self.messages.iter().filter(|m| m.round == round).copied().collect()
    }

    pub fn count_at(&self, round: u32) -> usize {
        self.messages.iter().filter(|m| m.round == round).count()
    }
}
