//! Protocol error types.

use thiserror::Error;

/// Errors from decoding or validating protocol payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An inbound message could not be parsed.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A plan contained no executable actions.
    #[error("Plan contained no executable actions")]
    EmptyPlan,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::MalformedMessage(e.to_string())
    }
}
