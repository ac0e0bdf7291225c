//! Per-stream correlation of tool calls and approval requests
//!
//! Providers report one tool call through several lifecycle events, some of
//! them duplicated. The tracker folds them into one record per id and only
//! reports a change when the record actually moved.

use std::collections::{HashMap, HashSet};

use crate::types::{StreamEvent, ToolCall, ToolCallStatus};

/// One lifecycle observation for a tool call
#[derive(Debug, Clone)]
pub struct ToolCallUpdate {
    pub id: String,
    pub status: ToolCallStatus,
    pub name: Option<String>,
    pub arguments: Option<String>,
    pub server_label: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl ToolCallUpdate {
    pub fn new(id: impl Into<String>, status: ToolCallStatus) -> Self {
        Self {
            id: id.into(),
            status,
            name: None,
            arguments: None,
            server_label: None,
            result: None,
            error: None,
        }
    }
}

/// Tool-call and approval state for a single stream
#[derive(Debug, Default)]
pub struct ToolCallTracker {
    calls: HashMap<String, ToolCall>,
    approvals: HashSet<String>,
}

impl ToolCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an update and report the resulting state, if it changed
    ///
    /// A record seen for the first time is reported as a tool call. A known
    /// record reaching a terminal status, or gaining its outcome afterwards,
    /// is reported as a tool result. Result and error are set at most once.
    pub fn apply(&mut self, update: ToolCallUpdate) -> Option<StreamEvent> {
        let Some(current) = self.calls.get_mut(&update.id) else {
            let call = ToolCall {
                id: update.id.clone(),
                name: update.name.unwrap_or_default(),
                arguments: update.arguments.unwrap_or_default(),
                server_label: update.server_label,
                status: update.status,
                result: update.result,
                error: update.error,
            };
            self.calls.insert(update.id, call.clone());
            return Some(StreamEvent::ToolCall(call));
        };

        let before = current.clone();

        if let Some(name) = update.name.filter(|n| !n.is_empty()) {
            current.name = name;
        }
        if let Some(arguments) = update.arguments.filter(|a| !a.is_empty()) {
            current.arguments = arguments;
        }
        if update.server_label.is_some() {
            current.server_label = update.server_label;
        }
        current.status = current.status.advance(update.status);
        if current.result.is_none() {
            current.result = update.result;
        }
        if current.error.is_none() {
            current.error = update.error;
        }

        if *current == before {
            return None;
        }

        let call = current.clone();
        let outcome_changed = call.result != before.result || call.error != before.error;
        if call.status.is_terminal() && (!before.status.is_terminal() || outcome_changed) {
            Some(StreamEvent::ToolResult(call))
        } else {
            Some(StreamEvent::ToolCall(call))
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.calls.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ToolCall> {
        self.calls.get(id)
    }

    /// Record an approval request id, returning `false` if it was already seen
    pub fn first_approval(&mut self, id: &str) -> bool {
        self.approvals.insert(id.to_owned())
    }
}
