//! Channel messages exchanged over the client WebSocket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Action;

/// Inbound control message (client -> orchestrator).
///
/// Actions arrive as raw JSON values and are validated per item by
/// [`crate::ActionQueue::from_values`]; a malformed step must not reject the
/// whole request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit an ordered action queue for execution.
    ExecuteActions { actions: Vec<Value> },
    /// Request a one-shot screenshot outside the ticker schedule.
    Screenshot,
    /// Navigate the shared page without running a full queue.
    Navigate { url: String },
}

/// Outbound event (orchestrator -> client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// A captured page screenshot, base64-encoded PNG.
    Screenshot { screenshot: String, timestamp: i64 },
    /// Emitted once per action, before the action runs.
    ActionProgress {
        current_step: usize,
        total_steps: usize,
        action: Action,
    },
    /// Emitted once after the last action of a queue, regardless of how
    /// many individual steps failed.
    ExecutionComplete { total_actions: usize },
    /// A request could not be parsed or an unrecoverable condition occurred.
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
