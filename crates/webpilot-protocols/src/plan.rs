//! Plan provider contract.
//!
//! The plan provider is an external collaborator that turns free-text user
//! intent into an ordered action list. Its output is untrusted input: the
//! shape is validated here before anything reaches the executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ActionQueue, ProtocolError};

/// Request to the plan provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    /// The user's free-text intent.
    pub message: String,
}

/// Reply from the plan provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    /// Human-readable message for the client UI.
    pub message: String,
    /// The proposed action list, still raw.
    pub actions: Vec<Value>,
}

impl PlanResponse {
    /// Validate the tagged-variant shape of a planner reply.
    ///
    /// A plan where no item decodes to a known action is rejected so the
    /// caller can fall back to a locally constructed queue.
    pub fn into_queue(self) -> Result<(String, ActionQueue), ProtocolError> {
        let queue = ActionQueue::from_values(&self.actions);
        if queue.known_len() == 0 {
            return Err(ProtocolError::EmptyPlan);
        }
        Ok((self.message, queue))
    }
}
