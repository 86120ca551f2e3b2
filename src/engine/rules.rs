//! Local sensing, message rules and the quorum check of one switch.
//!
//! Every function here sees only the switch being processed and an
//! [`Outbox`] that stamps outgoing messages for delivery next round.

use log::{debug, info, warn};

use crate::agent::{best_remaining, Command, Direction, MessageValue, Mode, SwitchAgent};
use crate::blackboard::{Blackboard, Message};
use crate::grid::SwitchId;

/// Posting handle for one sender during one round
pub(crate) struct Outbox<'a> {
    board: &'a mut Blackboard,
    sender: SwitchId,
    delivery_round: u32,
}

impl<'a> Outbox<'a> {
    pub(crate) fn new(board: &'a mut Blackboard, sender: SwitchId, current_round: u32) -> Self {
        Self { board, sender, delivery_round: current_round + 1 }
    }

    pub(crate) fn send(&mut self, recipient: SwitchId, command: Command, value: MessageValue) {
        self.board.post(Message {
            round: self.delivery_round,
            sender: self.sender,
            recipient,
            command,
            value,
        });
    }

    pub(crate) fn broadcast(&mut self, recipients: &[SwitchId], command: Command, value: MessageValue) {
        for &recipient in recipients {
            self.send(recipient, command, value);
        }
    }
}

/// Breaker trip on locally sensed over-current
pub(crate) fn sense(agent: &mut SwitchAgent, out: &mut Outbox<'_>) {
    if agent.measurements.over_current && agent.mode == Mode::Idle && agent.is_breaker() && agent.closed() {
        agent.set_closed(false);
        agent.mode = Mode::SelfHealing;
        info!("{} tripped on over-current", agent.name);
        out.broadcast(&agent.neighbors(), Command::SearchFault, MessageValue::Empty);
    }
}

/// Apply the rule for `message`, record it in the sender's slot, then run
/// the quorum check. Messages from a switch outside both neighbor groups
/// are dropped before any rule runs.
pub(crate) fn consume(agent: &mut SwitchAgent, message: &Message, out: &mut Outbox<'_>) {
    let sender = message.sender;
    if agent.direction_of(sender).is_none() {
        warn!(
            "{} ignored {} from switch {}, which is not a neighbor",
            agent.name, message.command, sender
        );
        return;
    }

    match message.command {
        Command::SearchFault => on_search_fault(agent, sender, out),
        Command::AreaIsolate => on_area_isolate(agent, out),
        Command::AreaHelp => on_area_help(agent, sender, out),
        Command::IsolateInfo => on_isolate_info(agent, sender, out),
        Command::SearchRemai => on_search_remai(agent, sender, out),
        Command::IkARemai => on_ika_remai(agent, sender, message.value, out),
        Command::IsFault => {}
    }

    if agent.record(sender, message.payload()).is_some() {
        evaluate_quorum(agent, out);
    }
}

fn on_search_fault(agent: &mut SwitchAgent, sender: SwitchId, out: &mut Outbox<'_>) {
    if agent.mode == Mode::SelfHealing {
        return;
    }
    let over_current = agent.measurements.over_current;
    debug!("{} answers IsFault({}) to {}", agent.name, over_current, sender);
    out.send(sender, Command::IsFault, MessageValue::Bool(over_current));
    if over_current {
        out.broadcast(&agent.neighbors_except(sender), Command::SearchFault, MessageValue::Empty);
    }
}

fn on_area_isolate(agent: &mut SwitchAgent, out: &mut Outbox<'_>) {
    if agent.closed() && agent.set_closed(false) {
        agent.mode = Mode::IsolateSwitch;
        info!("{} opened to isolate the faulted area", agent.name);
    }
    out.broadcast(&agent.neighbors(), Command::IsolateInfo, MessageValue::Empty);
}

fn on_area_help(agent: &mut SwitchAgent, sender: SwitchId, out: &mut Outbox<'_>) {
    if agent.mode.is_isolating() {
        return;
    }
    if agent.one_side_dead() && !agent.closed() && !agent.locked() {
        agent.set_closed(true);
        agent.mode = Mode::HelpSwitch;
        info!("{} closed to restore service", agent.name);
        return;
    }
    for direction in [Direction::Upstream, Direction::Downstream] {
        let group = agent.group(direction);
        if group.contains_key(&sender) {
            continue;
        }
        if let Some(target) = best_remaining(group) {
            debug!("{} forwards AreaHelp to {}", agent.name, target);
            out.send(target, Command::AreaHelp, MessageValue::Empty);
        }
    }
}

fn on_isolate_info(agent: &mut SwitchAgent, sender: SwitchId, out: &mut Outbox<'_>) {
    let one_side_dead = agent.one_side_dead();
    if one_side_dead && agent.mode == Mode::SelfHealing {
        if agent.set_closed(true) {
            info!("{} reclosed after isolation", agent.name);
        }
    } else if one_side_dead && !agent.mode.is_isolating() {
        debug!("{} starts searching for remaining capacity", agent.name);
        out.broadcast(&agent.neighbors_except(sender), Command::SearchRemai, MessageValue::Empty);
    } else if !agent.has_seen(Command::IsolateInfo) {
        out.broadcast(&agent.neighbors_except(sender), Command::IsolateInfo, MessageValue::Empty);
    }
}

fn on_search_remai(agent: &mut SwitchAgent, sender: SwitchId, out: &mut Outbox<'_>) {
    if agent.mode.is_isolating() {
        return;
    }
    if agent.is_breaker() && agent.closed() {
        agent.mode = Mode::CheckRemai;
        let remaining = agent.measurements.current_remaining;
        debug!("{} reports remaining capacity {:.5} kA", agent.name, remaining);
        out.send(sender, Command::IkARemai, MessageValue::Current(remaining));
    } else if !agent.has_seen(Command::SearchRemai) {
        out.broadcast(&agent.neighbors_except(sender), Command::SearchRemai, MessageValue::Empty);
    }
}

fn on_ika_remai(agent: &mut SwitchAgent, sender: SwitchId, value: MessageValue, out: &mut Outbox<'_>) {
    if agent.mode == Mode::FaultIsolate || agent.has_seen(Command::IkARemai) {
        return;
    }
    let reported = value.as_current().unwrap_or(0.0);
    let remaining = agent.measurements.current_remaining.min(reported);
    out.broadcast(&agent.neighbors_except(sender), Command::IkARemai, MessageValue::Current(remaining));
}

/// Act on any group whose slots are all filled
fn evaluate_quorum(agent: &mut SwitchAgent, out: &mut Outbox<'_>) {
    for direction in [Direction::Upstream, Direction::Downstream] {
        let group = agent.group(direction);
        if group.is_empty() || group.values().any(Option::is_none) {
            continue;
        }
        let members: Vec<SwitchId> = group.keys().copied().collect();
        let all_healthy = group.values().flatten().all(|entry| {
            entry.command == Command::IsFault && entry.value.as_bool() == Some(false)
        });
        let all_remaining = group.values().flatten().all(|entry| entry.command == Command::IkARemai);
        let best = best_remaining(group);

        if all_healthy && !agent.locked() {
            agent.set_closed(false);
            agent.mode = Mode::FaultIsolate;
            info!("{} located the fault behind it and opened", agent.name);
            out.broadcast(&members, Command::AreaIsolate, MessageValue::Empty);
        }
        if agent.mode == Mode::IsolateSwitch && all_remaining {
            if let Some(target) = best {
                debug!("{} requests help from {}", agent.name, target);
                out.send(target, Command::AreaHelp, MessageValue::Empty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{LastMessage, SwitchKind};

    fn agent(kind: SwitchKind, closed: bool, up: &[SwitchId], down: &[SwitchId]) -> SwitchAgent {
        SwitchAgent::new(
            5,
            "S5",
            kind,
            5,
            1,
            (1, 2),
            closed,
            &up.iter().copied().collect(),
            &down.iter().copied().collect(),
        )
    }

    fn incoming(sender: SwitchId, command: Command, value: MessageValue) -> Message {
        Message { round: 3, sender, recipient: 5, command, value }
    }

    #[test]
    fn test_outbox_stamps_next_round() {
        let mut board = Blackboard::new();
        let mut out = Outbox::new(&mut board, 5, 3);
        out.send(1, Command::SearchFault, MessageValue::Empty);
        assert_eq!(board.messages()[0].round, 4);
        assert_eq!(board.messages()[0].sender, 5);
    }

    #[test]
    fn test_breaker_trips_and_searches() {
        let mut sw = agent(SwitchKind::CircuitBreaker, true, &[], &[6, 7]);
        sw.measurements.over_current = true;
        let mut board = Blackboard::new();
        sense(&mut sw, &mut Outbox::new(&mut board, 5, 0));
        assert!(!sw.closed());
        assert_eq!(sw.mode, Mode::SelfHealing);
        assert_eq!(board.count_at(1), 2);
    }

    #[test]
    fn test_sectionalizer_never_trips() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[4], &[6]);
        sw.measurements.over_current = true;
        let mut board = Blackboard::new();
        sense(&mut sw, &mut Outbox::new(&mut board, 5, 0));
        assert!(sw.closed());
        assert_eq!(sw.mode, Mode::Idle);
        assert!(board.is_empty());
    }

    #[test]
    fn test_search_fault_reply_and_forward() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[4], &[6, 7]);
        sw.measurements.over_current = true;
        let mut board = Blackboard::new();
        let msg = incoming(4, Command::SearchFault, MessageValue::Empty);
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        let sent = board.messages();
        assert_eq!(sent[0].recipient, 4);
        assert_eq!(sent[0].value, MessageValue::Bool(true));
        let forwarded: Vec<SwitchId> = sent[1..].iter().map(|m| m.recipient).collect();
        assert_eq!(forwarded, vec![6, 7]);
    }

    #[test]
    fn test_healthy_downstream_quorum_isolates() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[4], &[6, 7]);
        let mut board = Blackboard::new();
        for sender in [6, 7] {
            let msg = incoming(sender, Command::IsFault, MessageValue::Bool(false));
            consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        }
        assert!(!sw.closed());
        assert_eq!(sw.mode, Mode::FaultIsolate);
        let targets: Vec<SwitchId> = board.messages_at(4).iter().map(|m| m.recipient).collect();
        assert_eq!(targets, vec![6, 7]);
        assert!(board.messages().iter().all(|m| m.command == Command::AreaIsolate));
    }

    #[test]
    fn test_locked_switch_skips_isolation_quorum() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[], &[6]);
        sw.lock();
        let mut board = Blackboard::new();
        let msg = incoming(6, Command::IsFault, MessageValue::Bool(false));
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert!(sw.closed());
        assert_eq!(sw.mode, Mode::Idle);
        assert!(board.is_empty());
    }

    #[test]
    fn test_isolate_info_rebroadcast_once() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[4], &[6]);
        sw.measurements.v_from = 1.0;
        sw.measurements.v_to = 1.0;
        let mut board = Blackboard::new();
        for _ in 0..3 {
            let msg = incoming(4, Command::IsolateInfo, MessageValue::Empty);
            consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        }
        assert_eq!(board.len(), 1);
        assert_eq!(board.messages()[0].recipient, 6);
    }

    #[test]
    fn test_dead_side_triggers_remaining_search() {
        let mut sw = agent(SwitchKind::Sectionalizer, false, &[4], &[6]);
        sw.measurements.v_to = 1.0;
        let mut board = Blackboard::new();
        let msg = incoming(4, Command::IsolateInfo, MessageValue::Empty);
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert_eq!(board.messages()[0].command, Command::SearchRemai);
        assert_eq!(board.messages()[0].recipient, 6);
    }

    #[test]
    fn test_breaker_answers_remaining_search() {
        let mut sw = agent(SwitchKind::CircuitBreaker, true, &[], &[6]);
        sw.measurements.current_remaining = 0.0125;
        let mut board = Blackboard::new();
        let msg = incoming(6, Command::SearchRemai, MessageValue::Empty);
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert_eq!(sw.mode, Mode::CheckRemai);
        assert_eq!(board.messages()[0].command, Command::IkARemai);
        assert_eq!(board.messages()[0].value, MessageValue::Current(0.0125));
    }

    #[test]
    fn test_ika_remai_forwards_minimum_once() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[4], &[6]);
        sw.measurements.current_remaining = 0.01;
        let mut board = Blackboard::new();
        let msg = incoming(6, Command::IkARemai, MessageValue::Current(0.03));
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        let msg = incoming(4, Command::IkARemai, MessageValue::Current(0.005));
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert_eq!(board.len(), 1);
        assert_eq!(board.messages()[0].recipient, 4);
        assert_eq!(board.messages()[0].value, MessageValue::Current(0.01));
    }

    #[test]
    fn test_open_tie_closes_on_area_help() {
        let mut sw = agent(SwitchKind::Sectionalizer, false, &[4], &[6]);
        sw.measurements.v_from = 0.0;
        sw.measurements.v_to = 1.0;
        let mut board = Blackboard::new();
        let msg = incoming(4, Command::AreaHelp, MessageValue::Empty);
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert!(sw.closed());
        assert_eq!(sw.mode, Mode::HelpSwitch);
        assert!(board.is_empty());
    }

    #[test]
    fn test_locked_tie_forwards_area_help() {
        let mut sw = agent(SwitchKind::Sectionalizer, false, &[4], &[6, 7]);
        sw.lock();
        sw.measurements.v_to = 1.0;
        sw.nb_down.insert(6, Some(LastMessage::new(Command::IkARemai, MessageValue::Current(0.02))));
        sw.nb_down.insert(7, Some(LastMessage::new(Command::IkARemai, MessageValue::Current(0.02))));
        let mut board = Blackboard::new();
        let msg = incoming(4, Command::AreaHelp, MessageValue::Empty);
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert!(!sw.closed());
        assert_eq!(sw.mode, Mode::Idle);
        assert_eq!(board.len(), 1);
        assert_eq!(board.messages()[0].recipient, 6);
    }

    #[test]
    fn test_isolating_switch_asks_best_neighbor_for_help() {
        let mut sw = agent(SwitchKind::Sectionalizer, false, &[4], &[6, 7]);
        sw.mode = Mode::IsolateSwitch;
        let mut board = Blackboard::new();
        let help_requests = |board: &Blackboard| -> Vec<SwitchId> {
            board
                .messages()
                .iter()
                .filter(|m| m.command == Command::AreaHelp)
                .map(|m| m.recipient)
                .collect()
        };
        let msg = incoming(6, Command::IkARemai, MessageValue::Current(0.008));
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert!(help_requests(&board).is_empty());
        let msg = incoming(7, Command::IkARemai, MessageValue::Current(0.01));
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert_eq!(help_requests(&board), vec![7]);
    }

    #[test]
    fn test_stranger_message_is_not_recorded() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[4], &[6]);
        let mut board = Blackboard::new();
        let msg = incoming(99, Command::IsFault, MessageValue::Bool(false));
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert!(sw.nb_up.values().chain(sw.nb_down.values()).all(Option::is_none));
        assert_eq!(sw.mode, Mode::Idle);
    }

    #[test]
    fn test_stranger_area_isolate_leaves_switch_alone() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[4], &[6]);
        sw.measurements.v_from = 1.0;
        sw.measurements.v_to = 1.0;
        let mut board = Blackboard::new();
        let msg = incoming(99, Command::AreaIsolate, MessageValue::Empty);
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert!(sw.closed());
        assert_eq!(sw.mode, Mode::Idle);
        assert!(board.is_empty());
        assert!(!sw.has_seen(Command::AreaIsolate));

        // The dedup guard is still open for a real neighbor
        let msg = incoming(99, Command::IsolateInfo, MessageValue::Empty);
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        let msg = incoming(4, Command::IsolateInfo, MessageValue::Empty);
        consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        assert_eq!(board.len(), 1);
        assert_eq!(board.messages()[0].recipient, 6);
    }

    #[test]
    fn test_search_remai_rebroadcast_once() {
        let mut sw = agent(SwitchKind::Sectionalizer, true, &[4], &[6, 7]);
        let mut board = Blackboard::new();
        for sender in [4, 6, 4] {
            let msg = incoming(sender, Command::SearchRemai, MessageValue::Empty);
            consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        }
        let relayed: Vec<SwitchId> = board.messages().iter().map(|m| m.recipient).collect();
        assert_eq!(relayed, vec![6, 7]);
        assert!(board.messages().iter().all(|m| m.command == Command::SearchRemai));
    }

    #[test]
    fn test_open_breaker_relays_remaining_search() {
        let mut sw = agent(SwitchKind::CircuitBreaker, false, &[], &[6, 7]);
        let mut board = Blackboard::new();
        for _ in 0..2 {
            let msg = incoming(6, Command::SearchRemai, MessageValue::Empty);
            consume(&mut sw, &msg, &mut Outbox::new(&mut board, 5, 3));
        }
        assert_eq!(sw.mode, Mode::Idle);
        assert_eq!(board.len(), 1);
        assert_eq!(board.messages()[0].recipient, 7);
    }
}
