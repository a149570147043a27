//! Conversation state for a single turn.
//!
//! Every step of a turn produces a [`RoutePatch`]; applying it to the current
//! [`ConversationState`] yields a new snapshot, which the [`StateArena`] keeps
//! so the whole turn can be inspected afterwards.

use crate::types::HistoryEntry;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationState {
    pub input: String,
    /// Tagged `[node] text` entries, append-only within a turn
    pub message_log: Vec<String>,
    pub prompt: String,
    pub response: String,
    pub routing_status: String,
    pub progress_message: String,
    pub conversation_history: Vec<HistoryEntry>,
}

/// Partial state produced by one step. Absent fields leave the state untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutePatch {
    /// Entries appended to the message log
    pub message_log: Vec<String>,
    pub prompt: Option<String>,
    pub response: Option<String>,
    pub routing_status: Option<String>,
    pub progress_message: Option<String>,
}

impl RoutePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, entry: impl Into<String>) -> Self {
        self.message_log.push(entry.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn routing_status(mut self, status: impl Into<String>) -> Self {
        self.routing_status = Some(status.into());
        self
    }

    pub fn progress_message(mut self, message: impl Into<String>) -> Self {
        self.progress_message = Some(message.into());
        self
    }
}

/// Format a message log entry.
pub fn tag(node_id: &str, text: &str) -> String {
    format!("[{}] {}", node_id, text)
}

impl ConversationState {
    pub fn new(input: impl Into<String>, conversation_history: Vec<HistoryEntry>) -> Self {
        Self {
            input: input.into(),
            conversation_history,
            ..Default::default()
        }
    }

    /// New snapshot with `patch` applied.
    pub fn merged(&self, patch: RoutePatch) -> ConversationState {
        let mut message_log = Vec::with_capacity(self.message_log.len() + patch.message_log.len());
        message_log.extend(self.message_log.iter().cloned());
        message_log.extend(patch.message_log);

        ConversationState {
            input: self.input.clone(),
            message_log,
            prompt: patch.prompt.unwrap_or_else(|| self.prompt.clone()),
            response: patch.response.unwrap_or_else(|| self.response.clone()),
            routing_status: patch
                .routing_status
                .unwrap_or_else(|| self.routing_status.clone()),
            progress_message: patch
                .progress_message
                .unwrap_or_else(|| self.progress_message.clone()),
            conversation_history: self.conversation_history.clone(),
        }
    }

    /// `"\n\nPrevious User Conversations:\n" + role: content lines`, or empty
    pub fn history_block(&self) -> String {
        if self.conversation_history.is_empty() {
            return String::new();
        }
        let lines: Vec<String> = self
            .conversation_history
            .iter()
            .map(|entry| format!("{}: {}", entry.role, entry.content))
            .collect();
        format!("\n\nPrevious User Conversations:\n{}", lines.join("\n"))
    }

    /// Text of the most recent log entry tagged with `node_id`, trimmed.
    pub fn last_tagged(&self, node_id: &str) -> Option<&str> {
        let prefix = format!("[{}]", node_id);
        self.message_log
            .iter()
            .rev()
            .find_map(|entry| entry.strip_prefix(prefix.as_str()))
            .map(str::trim)
    }
}

/// Every snapshot of one turn, oldest first.
#[derive(Debug, Clone)]
pub struct StateArena {
    snapshots: Vec<ConversationState>,
}

impl StateArena {
    pub fn new(initial: ConversationState) -> Self {
        Self {
            snapshots: vec![initial],
        }
    }

    pub fn current(&self) -> &ConversationState {
        // never empty: seeded in `new` and only pushed to
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn apply(&mut self, patch: RoutePatch) -> &ConversationState {
        let next = self.current().merged(patch);
        self.snapshots.push(next);
        self.current()
    }

    pub fn snapshots(&self) -> &[ConversationState] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn into_current(mut self) -> ConversationState {
        self.snapshots.pop().unwrap_or_default()
    }
}
