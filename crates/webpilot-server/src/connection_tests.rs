use super::*;
use std::time::Duration;

use webpilot_browser::{SessionConfig, SessionManager};
use webpilot_protocols::ServerMessage;

use crate::ServerConfig;
use crate::events::test_support::RecordingSink;

fn state() -> Arc<AppState> {
    let session = Arc::new(SessionManager::new(SessionConfig::default()));
    Arc::new(AppState::new(ServerConfig::default(), session))
}

fn error_messages(events: &[ServerMessage]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerMessage::Error { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

async fn wait_for_completion(sink: &Arc<RecordingSink>) {
    for _ in 0..1000 {
        if sink
            .events()
            .iter()
            .any(|e| matches!(e, ServerMessage::ExecutionComplete { .. }))
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("execution did not complete");
}

#[tokio::test(start_paused = true)]
async fn test_malformed_json_yields_one_error_and_connection_stays_usable() {
    let state = state();
    let sink = Arc::new(RecordingSink::default());
    let sink_dyn: Arc<dyn EventSink> = sink.clone();
    let executing = Arc::new(AtomicBool::new(false));

    handle_text("conn-1", "{not json", &state, &sink_dyn, &executing).await;

    let errors = error_messages(&sink.events());
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Malformed message:"));

    // The connection still processes well-formed messages afterwards.
    handle_text(
        "conn-1",
        r#"{"type":"execute_actions","actions":[]}"#,
        &state,
        &sink_dyn,
        &executing,
    )
    .await;
    wait_for_completion(&sink).await;

    let events = sink.events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ServerMessage::ExecutionComplete { total_actions: 0 }))
    );
    // Still exactly the one parse error.
    assert_eq!(error_messages(&events).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_message_type_yields_error() {
    let state = state();
    let sink = Arc::new(RecordingSink::default());
    let sink_dyn: Arc<dyn EventSink> = sink.clone();
    let executing = Arc::new(AtomicBool::new(false));

    handle_text(
        "conn-1",
        r#"{"type":"reboot_everything"}"#,
        &state,
        &sink_dyn,
        &executing,
    )
    .await;

    assert_eq!(error_messages(&sink.events()).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_execute_actions_is_rejected() {
    let state = state();
    let sink = Arc::new(RecordingSink::default());
    let sink_dyn: Arc<dyn EventSink> = sink.clone();
    let executing = Arc::new(AtomicBool::new(false));

    // Simulate an in-flight run.
    executing.store(true, Ordering::SeqCst);

    handle_text(
        "conn-1",
        r#"{"type":"execute_actions","actions":[{"type":"screenshot"}]}"#,
        &state,
        &sink_dyn,
        &executing,
    )
    .await;

    let errors = error_messages(&sink.events());
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("already running"));
    // The guard is still held by the (simulated) first run.
    assert!(executing.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_execute_actions_releases_guard_on_completion() {
    let state = state();
    let sink = Arc::new(RecordingSink::default());
    let sink_dyn: Arc<dyn EventSink> = sink.clone();
    let executing = Arc::new(AtomicBool::new(false));

    handle_text(
        "conn-1",
        r#"{"type":"execute_actions","actions":[{"type":"waitForTimeout","timeout":100}]}"#,
        &state,
        &sink_dyn,
        &executing,
    )
    .await;
    wait_for_completion(&sink).await;

    // Guard release races the completion event by one store; yield once.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!executing.load(Ordering::SeqCst));

    let events = sink.events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ServerMessage::ExecutionComplete { total_actions: 1 }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_screenshot_request_without_page_emits_nothing() {
    let state = state();
    let sink = Arc::new(RecordingSink::default());
    let sink_dyn: Arc<dyn EventSink> = sink.clone();
    let executing = Arc::new(AtomicBool::new(false));

    handle_text(
        "conn-1",
        r#"{"type":"screenshot"}"#,
        &state,
        &sink_dyn,
        &executing,
    )
    .await;

    // Give the spawned capture a chance to run.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(sink.events().is_empty());
}
