//! Sequential action execution against the shared page.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use webpilot_browser::{CdpError, SessionManager};
use webpilot_protocols::{
    Action, ActionQueue, DEFAULT_SELECTOR_TIMEOUT_MS, ServerMessage,
};

use crate::events::{EventSink, capture_and_emit};

/// Per-step failure. Always absorbed by the queue loop, never propagated as
/// a queue abort.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("No active page")]
    NoPage,

    #[error(transparent)]
    Cdp(#[from] CdpError),
}

/// Runs action queues in order, one step at a time.
///
/// The policy is continue-on-error: individual steps are expected to fail
/// intermittently against real, uncontrolled web pages (a missing selector,
/// a slow navigation), and partial completion beats queue abortion. Every
/// accepted queue therefore ends in exactly one `execution_complete` event,
/// however many steps failed along the way.
pub struct Executor {
    session: Arc<SessionManager>,
    settle_delay: Duration,
}

impl Executor {
    pub fn new(session: Arc<SessionManager>, settle_delay: Duration) -> Self {
        Self {
            session,
            settle_delay,
        }
    }

    /// Execute a queue in submission order.
    ///
    /// Emits one `action_progress` before each step and attempts one
    /// screenshot after each step, then a single `execution_complete`.
    pub async fn run_queue(&self, queue: &ActionQueue, sink: &dyn EventSink) {
        let total = queue.len();
        info!("Starting execution of {} actions", total);

        for (i, action) in queue.iter().enumerate() {
            sink.emit(ServerMessage::ActionProgress {
                current_step: i,
                total_steps: total,
                action: action.clone(),
            })
            .await;

            if let Err(e) = self.execute_action(action, sink).await {
                warn!("Action {} ({}) failed: {}", i, action.kind(), e);
            }

            // Snapshot after every step, success or not.
            capture_and_emit(&self.session, sink).await;

            // Settle heuristic: give the page a moment to stabilize after
            // DOM-mutating actions.
            tokio::time::sleep(self.settle_delay).await;
        }

        sink.emit(ServerMessage::ExecutionComplete {
            total_actions: total,
        })
        .await;
        info!("All {} actions completed", total);
    }

    /// Execute a single action against the current page.
    ///
    /// Also used directly for the `navigate` control message, which runs a
    /// lone `goto` without queue events.
    pub async fn execute_action(
        &self,
        action: &Action,
        sink: &dyn EventSink,
    ) -> Result<(), ActionError> {
        let Some(page) = self.session.page().await else {
            error!("No active page; cannot execute {}", action.kind());
            return Err(ActionError::NoPage);
        };

        debug!("Executing action: {}", action.kind());

        let selector_timeout = Duration::from_millis(DEFAULT_SELECTOR_TIMEOUT_MS);

        match action {
            Action::Goto { url, timeout } => {
                page.navigate(url, Duration::from_millis(*timeout)).await?;
            }
            Action::Click { selector } => {
                page.wait_for_selector(selector, selector_timeout).await?;
                page.click_selector(selector).await?;
            }
            Action::Type {
                selector,
                text,
                delay,
            } => {
                page.wait_for_selector(selector, selector_timeout).await?;
                page.focus_selector(selector).await?;
                page.type_text(text, Duration::from_millis(*delay)).await?;
            }
            Action::Press { key } => {
                page.press_key(key).await?;
            }
            Action::WaitForSelector { selector, timeout } => {
                page.wait_for_selector(selector, Duration::from_millis(*timeout))
                    .await?;
            }
            Action::WaitForTimeout { timeout } => {
                tokio::time::sleep(Duration::from_millis(*timeout)).await;
            }
            Action::Scroll { direction } => {
                page.scroll(*direction).await?;
            }
            Action::Hover { selector } => {
                page.wait_for_selector(selector, selector_timeout).await?;
                page.hover_selector(selector).await?;
            }
            Action::Select { selector, value } => {
                page.wait_for_selector(selector, selector_timeout).await?;
                page.select_option(selector, value).await?;
            }
            Action::Evaluate { script } => {
                page.evaluate(script).await?;
            }
            Action::Screenshot => {
                capture_and_emit(&self.session, sink).await;
            }
            Action::Unknown => {
                warn!("Unknown action type; skipping");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
