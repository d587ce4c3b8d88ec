//! Plan provider client with a local fallback.
//!
//! The plan provider is an external service that turns free-text intent
//! into an action list. Its availability is never allowed to fail the whole
//! interaction: on transport errors, bad status codes, or malformed plans
//! the orchestrator degrades to a locally constructed generic search queue.
//! The fallback is built here, not fetched — a second remote call would
//! just add latency and retry pressure.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use webpilot_protocols::{
    Action, ActionQueue, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_SELECTOR_TIMEOUT_MS,
    DEFAULT_TYPE_DELAY_MS, PlanRequest, PlanResponse, ProtocolError,
};

/// How long to wait for the plan provider before falling back.
const PLAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Plan provider failures. All of them resolve to the local fallback.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("No plan provider configured")]
    NotConfigured,

    #[error("Plan request failed: {0}")]
    Request(String),

    #[error(transparent)]
    Invalid(#[from] ProtocolError),
}

/// A validated plan, ready for the executor.
#[derive(Debug)]
pub struct Plan {
    /// Human-readable message for the client UI.
    pub message: String,
    /// The validated action queue.
    pub queue: ActionQueue,
    /// Whether this plan was constructed locally.
    pub fallback: bool,
}

/// Client for the external plan provider.
pub struct Planner {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl Planner {
    pub fn new(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PLAN_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }

    /// Produce a plan for the user's intent. Never fails: provider errors
    /// degrade to [`fallback_plan`].
    pub async fn plan(&self, user_text: &str) -> Plan {
        match self.request_plan(user_text).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Plan provider unavailable ({}); using local fallback", e);
                fallback_plan(user_text)
            }
        }
    }

    async fn request_plan(&self, user_text: &str) -> Result<Plan, PlanError> {
        let endpoint = self.endpoint.as_ref().ok_or(PlanError::NotConfigured)?;

        let response = self
            .client
            .post(endpoint)
            .json(&PlanRequest {
                message: user_text.to_string(),
            })
            .send()
            .await
            .map_err(|e| PlanError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PlanError::Request(format!(
                "status {}",
                response.status()
            )));
        }

        let plan: PlanResponse = response
            .json()
            .await
            .map_err(|e| PlanError::Request(e.to_string()))?;

        let (message, queue) = plan.into_queue()?;
        debug!("Plan provider returned {} actions", queue.len());

        Ok(Plan {
            message,
            queue,
            fallback: false,
        })
    }
}

fn goto(url: &str) -> Action {
    Action::Goto {
        url: url.to_string(),
        timeout: DEFAULT_NAVIGATION_TIMEOUT_MS,
    }
}

fn wait_for(selector: &str) -> Action {
    Action::WaitForSelector {
        selector: selector.to_string(),
        timeout: DEFAULT_SELECTOR_TIMEOUT_MS,
    }
}

fn type_into(selector: &str, text: &str) -> Action {
    Action::Type {
        selector: selector.to_string(),
        text: text.to_string(),
        delay: DEFAULT_TYPE_DELAY_MS,
    }
}

/// Build a degraded plan locally when the provider is unavailable.
///
/// Routes on a few intent keywords, otherwise falls back to a generic web
/// search seeded with the user's text.
pub fn fallback_plan(user_text: &str) -> Plan {
    let lower = user_text.to_lowercase();

    let (message, actions) = if lower.contains("coffee") || lower.contains("latte") {
        (
            "I'll look for coffee options near you.",
            vec![
                goto("https://www.google.com"),
                wait_for("input[name='q']"),
                Action::Click {
                    selector: "input[name='q']".to_string(),
                },
                type_into("input[name='q']", "coffee delivery near me"),
                Action::Press {
                    key: "Enter".to_string(),
                },
                wait_for("#search"),
                Action::WaitForTimeout { timeout: 2000 },
            ],
        )
    } else if lower.contains("shop") || lower.contains("buy") || lower.contains("purchase") {
        (
            "I'll search for that on a shopping site.",
            vec![
                goto("https://www.amazon.com"),
                wait_for("#twotabsearchtextbox"),
                Action::Click {
                    selector: "#twotabsearchtextbox".to_string(),
                },
                type_into("#twotabsearchtextbox", user_text),
                Action::Press {
                    key: "Enter".to_string(),
                },
                wait_for("[data-component-type='s-search-result']"),
            ],
        )
    } else if lower.contains("flight") || lower.contains("travel") {
        (
            "I'll open a flight search for you.",
            vec![
                goto("https://www.google.com/travel/flights"),
                wait_for("input[placeholder*='Where from']"),
                Action::WaitForTimeout { timeout: 3000 },
            ],
        )
    } else {
        (
            "I'll run a web search for your request.",
            vec![
                goto("https://www.google.com"),
                wait_for("input[name='q']"),
                Action::Click {
                    selector: "input[name='q']".to_string(),
                },
                type_into("input[name='q']", user_text),
                Action::Press {
                    key: "Enter".to_string(),
                },
                wait_for("#search"),
            ],
        )
    };

    Plan {
        message: message.to_string(),
        queue: ActionQueue::new(actions),
        fallback: true,
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
