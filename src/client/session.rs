//! One connected client: command-list framing, idle state machine,
//! subscriptions/messages, and the permission/tag/binary-limit state a
//! command handler consults.

use std::collections::VecDeque;

use crate::error::{AckCode, AckError};
use crate::idle::IdleMask;
use crate::permission::Permission;

pub const MAX_SUBSCRIPTIONS: usize = 16;
pub const MAX_QUEUED_MESSAGES: usize = 64;
pub const MIN_BINARY_LIMIT: u32 = 64;

#[derive(Debug, Default, PartialEq, Eq)]
pub enum CommandListState {
    #[default]
    None,
    Collecting { ok_mode: bool, lines: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Waiting { subscriptions: IdleMask },
    Background,
}

/// What the session driver should do after a line was dispatched.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionAction {
    Continue,
    Close,
    Kill,
}

pub struct ClientSession {
    pub id: u64,
    pub partition_name: String,
    pub permission_mask: Permission,
    pub binary_limit: u32,
    pub command_list: CommandListState,
    pub idle_state: IdleState,
    pub pending_idle: IdleMask,
    pub subscriptions: Vec<String>,
    pub messages: VecDeque<(String, String)>,
    pub max_command_list_size: usize,
}

impl ClientSession {
    pub fn new(id: u64, partition_name: impl Into<String>) -> Self {
        Self {
            id,
            partition_name: partition_name.into(),
            permission_mask: Permission::DEFAULT,
            binary_limit: 8192,
            command_list: CommandListState::None,
            idle_state: IdleState::Active,
            pending_idle: IdleMask::EMPTY,
            subscriptions: Vec::new(),
            messages: VecDeque::new(),
            max_command_list_size: 2 * 1024 * 1024,
        }
    }

    pub fn begin_command_list(&mut self, ok_mode: bool) -> Result<(), AckError> {
        if self.command_list != CommandListState::None {
            return Err(AckError::new(AckCode::NotList, "already in a command list"));
        }
        self.command_list = CommandListState::Collecting { ok_mode, lines: Vec::new() };
        Ok(())
    }

    /// Returns `Err` (connection must close) if the accumulated size would
    /// exceed the configured cap.
    pub fn push_command_list_line(&mut self, line: String) -> Result<(), ()> {
        if let CommandListState::Collecting { lines, .. } = &mut self.command_list {
            let projected: usize = lines.iter().map(|l| l.len() + 1).sum::<usize>() + line.len() + 1;
            if projected > self.max_command_list_size {
                return Err(());
            }
            lines.push(line);
        }
        Ok(())
    }

    /// Ends collection, returning the collected lines and whether `OK`
    /// replies between commands should be `list_OK`.
    pub fn end_command_list(&mut self) -> (Vec<String>, bool) {
        match std::mem::replace(&mut self.command_list, CommandListState::None) {
            CommandListState::Collecting { ok_mode, lines } => (lines, ok_mode),
            CommandListState::None => (Vec::new(), false),
        }
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.command_list, CommandListState::Collecting { .. })
    }

    /// True while parked inside an `idle` command. Any input but `noidle`
    /// is a protocol violation in this state.
    pub fn is_waiting(&self) -> bool {
        matches!(self.idle_state, IdleState::Waiting { .. })
    }

    /// `idle [CHANNELS...]`: returns `Some(mask)` to deliver immediately if
    /// pending bits already intersect the requested subscription, otherwise
    /// transitions to `Waiting` and returns `None`.
    pub fn begin_idle(&mut self, subscriptions: IdleMask) -> Option<IdleMask> {
        if self.pending_idle.contains(subscriptions) {
            let delivered = self.pending_idle.intersection(subscriptions);
            self.pending_idle.remove(delivered);
            Some(delivered)
        } else {
            self.idle_state = IdleState::Waiting { subscriptions };
            None
        }
    }

    /// Called when another task OR's bits relevant to this session. Returns
    /// `Some(mask)` if the session was `Waiting` and should be woken with a
    /// delivery now.
    pub fn idle_add(&mut self, bits: IdleMask) -> Option<IdleMask> {
        match self.idle_state {
            IdleState::Waiting { subscriptions } if bits.contains(subscriptions) => {
                let delivered = bits.intersection(subscriptions);
                self.idle_state = IdleState::Active;
                Some(delivered)
            }
            _ => {
                self.pending_idle |= bits;
                None
            }
        }
    }

    /// `noidle`: returns true if this actually cancelled a pending wait.
    pub fn noidle(&mut self) -> bool {
        if matches!(self.idle_state, IdleState::Waiting { .. }) {
            self.idle_state = IdleState::Active;
            true
        } else {
            false
        }
    }

    pub fn subscribe(&mut self, channel: String) -> Result<(), AckError> {
        if channel.is_empty() || !channel.is_ascii() || channel.chars().any(|c| c.is_ascii_control()) {
            return Err(AckError::arg("invalid channel name"));
        }
        if self.subscriptions.contains(&channel) {
            return Err(AckError::new(AckCode::Exist, "already subscribed"));
        }
        if self.subscriptions.len() >= MAX_SUBSCRIPTIONS {
            return Err(AckError::arg("subscription list is full"));
        }
        self.subscriptions.push(channel);
        Ok(())
    }

    pub fn unsubscribe(&mut self, channel: &str) -> Result<(), AckError> {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|c| c != channel);
        if self.subscriptions.len() == before {
            return Err(AckError::no_exist("not subscribed to this channel"));
        }
        Ok(())
    }

    /// Silently drops the message if the queue is full, matching the
    /// "posting beyond the limit silently fails" contract; the caller
    /// (`sendmessage` handler) decides whether to report "nobody
    /// subscribed" based on whether any recipient accepted it.
    pub fn deliver_message(&mut self, channel: &str, message: &str) -> bool {
        if !self.subscriptions.iter().any(|c| c == channel) {
            return false;
        }
        if self.messages.len() >= MAX_QUEUED_MESSAGES {
            return false;
        }
        self.messages.push_back((channel.to_string(), message.to_string()));
        true
    }

    pub fn drain_messages(&mut self) -> Vec<(String, String)> {
        self.messages.drain(..).collect()
    }

    /// `partition NAME`: updates the back-pointer and folds in the idle
    /// bits needed so the client re-syncs against its new partition's
    /// state.
    pub fn migrate_partition(&mut self, new_partition: impl Into<String>) {
        self.partition_name = new_partition.into();
        self.pending_idle |= crate::idle::IdleKind::Playlist.into();
        self.pending_idle |= crate::idle::IdleKind::Player.into();
        self.pending_idle |= crate::idle::IdleKind::Mixer.into();
        self.pending_idle |= crate::idle::IdleKind::Output.into();
        self.pending_idle |= crate::idle::IdleKind::Options.into();
    }

    pub fn set_binary_limit(&mut self, limit: u32, output_buffer_max: u32) -> Result<(), AckError> {
        let max = output_buffer_max.saturating_sub(4096);
        if !(MIN_BINARY_LIMIT..=max).contains(&limit) {
            return Err(AckError::arg(format!("Bad binary limit: {limit}")));
        }
        self.binary_limit = limit;
        Ok(())
    }
}

/// Validates the first byte of a raw input line: MPD rejects anything that
/// doesn't start with a lowercase ASCII letter (catches stray HTTP requests
/// and similar garbage) by closing the connection outright.
pub fn is_well_formed_command_line(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idle::IdleKind;

    #[test]
    fn idle_delivers_immediately_when_already_pending() {
        let mut session = ClientSession::new(1, "default");
        session.pending_idle |= IdleKind::Playlist.into();
        let delivered = session.begin_idle(IdleMask::all()).unwrap();
        assert!(delivered.contains(IdleKind::Playlist.into()));
        assert!(session.pending_idle.is_empty());
    }

    #[test]
    fn idle_waits_when_nothing_pending_then_wakes_on_matching_bits() {
        let mut session = ClientSession::new(1, "default");
        assert!(session.begin_idle(IdleKind::Player.into()).is_none());
        assert!(session.idle_add(IdleKind::Mixer.into()).is_none());
        let delivered = session.idle_add(IdleKind::Player.into()).unwrap();
        assert!(delivered.contains(IdleKind::Player.into()));
        assert_eq!(session.idle_state, IdleState::Active);
    }

    #[test]
    fn subscription_limit_is_enforced() {
        let mut session = ClientSession::new(1, "default");
        for i in 0..MAX_SUBSCRIPTIONS {
            session.subscribe(format!("ch{i}")).unwrap();
        }
        assert!(session.subscribe("one_too_many".into()).is_err());
    }

    #[test]
    fn malformed_first_byte_is_rejected() {
        assert!(!is_well_formed_command_line("GET / HTTP/1.1"));
        assert!(is_well_formed_command_line("ping"));
    }

    #[test]
    fn migrating_partition_requests_a_resync() {
        let mut session = ClientSession::new(1, "default");
        session.migrate_partition("studio");
        assert_eq!(session.partition_name, "studio");
        assert!(session.pending_idle.contains(IdleKind::Options.into()));
    }
}
