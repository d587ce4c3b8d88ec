//! Outbound event plumbing.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use webpilot_browser::SessionManager;
use webpilot_protocols::ServerMessage;

/// Destination for outbound events.
///
/// The executor and ticker emit through this seam so tests can record
/// events without a socket. Emission is infallible from the caller's point
/// of view: a closed connection just drops the event.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: ServerMessage);
}

/// Production sink: forwards into a connection's outbound channel.
pub struct OutboundSink {
    tx: mpsc::Sender<ServerMessage>,
}

impl OutboundSink {
    pub fn new(tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for OutboundSink {
    async fn emit(&self, event: ServerMessage) {
        if self.tx.send(event).await.is_err() {
            debug!("Connection closed; dropping outbound event");
        }
    }
}

/// Capture the current page and emit a screenshot event.
///
/// Capture errors are an expected race (the ticker may fire mid-navigation)
/// and are skipped silently; the absence of the event is the only signal.
pub async fn capture_and_emit(session: &SessionManager, sink: &dyn EventSink) {
    let Some(page) = session.page().await else {
        debug!("No active page; skipping screenshot");
        return;
    };

    match page.screenshot_base64().await {
        Ok(data) => {
            sink.emit(ServerMessage::Screenshot {
                screenshot: data,
                timestamp: chrono::Utc::now().timestamp_millis(),
            })
            .await;
        }
        Err(e) => {
            debug!("Screenshot failed: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Records emitted events for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        events: Mutex<Vec<ServerMessage>>,
    }

    impl RecordingSink {
        pub(crate) fn events(&self) -> Vec<ServerMessage> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn emit(&self, event: ServerMessage) {
            self.events.lock().unwrap().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::*;
    use webpilot_browser::SessionConfig;

    #[tokio::test]
    async fn test_capture_without_page_emits_nothing() {
        let session = SessionManager::new(SessionConfig::default());
        let sink = RecordingSink::default();

        capture_and_emit(&session, &sink).await;

        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_outbound_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let sink = OutboundSink::new(tx);
        // Must not panic or error.
        sink.emit(ServerMessage::error("gone")).await;
    }
}
