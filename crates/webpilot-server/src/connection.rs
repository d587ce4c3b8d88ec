//! Per-client WebSocket connection handling.
//!
//! Each connection gets its own outbound channel, its own screenshot
//! ticker, and its own single-flight guard for action queues. The browser
//! session itself is process-wide: disconnecting a client never touches it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use webpilot_protocols::{
    Action, ActionQueue, ClientMessage, DEFAULT_NAVIGATION_TIMEOUT_MS, ProtocolError,
    ServerMessage,
};

use crate::AppState;
use crate::events::{EventSink, OutboundSink, capture_and_emit};
use crate::executor::Executor;
use crate::ticker::ScreenshotTicker;

/// Outbound channel depth. Screenshots are large; a slow client applies
/// backpressure to the ticker rather than buffering without bound.
const OUTBOUND_BUFFER: usize = 64;

/// Drive one WebSocket connection to completion.
pub(crate) async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!("WebSocket client connected: {}", conn_id);
    state.connections.fetch_add(1, Ordering::SeqCst);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let sink: Arc<dyn EventSink> = Arc::new(OutboundSink::new(tx));

    // Screenshots start streaming as soon as the client connects.
    let ticker = ScreenshotTicker::spawn(
        state.session.clone(),
        sink.clone(),
        state.config.tick_interval(),
    );

    let executing = Arc::new(AtomicBool::new(false));

    loop {
        tokio::select! {
            // Outbound events (executor, ticker, errors) -> client.
            Some(event) = outbound_rx.recv() => {
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if let Err(e) = ws_tx.send(Message::Text(json.into())).await {
                            warn!("Failed to send to {}: {}", conn_id, e);
                            break;
                        }
                    }
                    Err(e) => error!("Failed to encode outbound event: {}", e),
                }
            }

            // Inbound control messages.
            result = ws_rx.next() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_text(&conn_id, &text, &state, &sink, &executing).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected: {}", conn_id);
                        break;
                    }
                    Some(Ok(other)) => {
                        debug!("Ignoring non-text frame from {}: {:?}", conn_id, other);
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", conn_id, e);
                        break;
                    }
                }
            }
        }
    }

    // Disconnect stops this client's ticker; the browser session is
    // process-wide and stays up. An in-flight queue runs to completion,
    // its remaining events dropping into the closed channel.
    ticker.stop();
    state.connections.fetch_sub(1, Ordering::SeqCst);
    debug!("Connection {} cleaned up", conn_id);
}

/// Dispatch one inbound text frame.
///
/// A malformed frame produces exactly one `error` event and leaves the
/// connection open.
pub(crate) async fn handle_text(
    conn_id: &str,
    text: &str,
    state: &Arc<AppState>,
    sink: &Arc<dyn EventSink>,
    executing: &Arc<AtomicBool>,
) {
    let message: ClientMessage = match serde_json::from_str(text).map_err(ProtocolError::from) {
        Ok(message) => message,
        Err(e) => {
            warn!("Protocol error from {}: {}", conn_id, e);
            sink.emit(ServerMessage::error(e.to_string())).await;
            return;
        }
    };

    match message {
        ClientMessage::ExecuteActions { actions } => {
            let queue = ActionQueue::from_values(&actions);
            info!(
                "Received queue of {} actions from {} ({} recognized)",
                queue.len(),
                conn_id,
                queue.known_len()
            );

            // One queue at a time per connection: a second submission while
            // one is running is rejected, not queued or interleaved.
            if executing
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                warn!("Rejecting concurrent execute_actions from {}", conn_id);
                sink.emit(ServerMessage::error(
                    "An action queue is already running on this connection",
                ))
                .await;
                return;
            }

            let executor = Executor::new(state.session.clone(), state.config.settle_delay());
            let sink = sink.clone();
            let executing = executing.clone();
            tokio::spawn(async move {
                executor.run_queue(&queue, sink.as_ref()).await;
                executing.store(false, Ordering::SeqCst);
            });
        }

        ClientMessage::Screenshot => {
            let session = state.session.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                capture_and_emit(&session, sink.as_ref()).await;
            });
        }

        ClientMessage::Navigate { url } => {
            // A bare navigation: one goto with defaults, no queue events.
            let executor = Executor::new(state.session.clone(), state.config.settle_delay());
            let sink = sink.clone();
            tokio::spawn(async move {
                let action = Action::Goto {
                    url,
                    timeout: DEFAULT_NAVIGATION_TIMEOUT_MS,
                };
                if let Err(e) = executor.execute_action(&action, sink.as_ref()).await {
                    warn!("Navigate failed: {}", e);
                }
            });
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
