//! Periodic screenshot capture.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::debug;

use webpilot_browser::SessionManager;

use crate::events::{EventSink, capture_and_emit};

/// Background task that captures the page at a fixed period.
///
/// One ticker runs per connected client, started on connect and stopped on
/// disconnect. It is fully independent of any in-flight action queue: a
/// tick that races a navigation simply fails to capture and is skipped.
pub struct ScreenshotTicker {
    handle: tokio::task::JoinHandle<()>,
}

impl ScreenshotTicker {
    /// Spawn the capture loop.
    pub fn spawn(
        session: Arc<SessionManager>,
        sink: Arc<dyn EventSink>,
        period: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of `interval` fires immediately; consume it so
            // captures start one full period after connect.
            interval.tick().await;

            loop {
                interval.tick().await;
                capture_and_emit(&session, sink.as_ref()).await;
            }
        });

        debug!("Started screenshot ticker ({}ms period)", period.as_millis());
        Self { handle }
    }

    /// Stop the ticker. Safe to call more than once.
    pub fn stop(&self) {
        self.handle.abort();
        debug!("Stopped screenshot ticker");
    }

    /// Whether the capture loop has terminated.
    pub fn is_stopped(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScreenshotTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
#[path = "ticker_tests.rs"]
mod tests;
