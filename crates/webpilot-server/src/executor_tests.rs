use super::*;
use serde_json::json;

use webpilot_browser::SessionConfig;
use webpilot_protocols::ScrollDirection;

use crate::events::test_support::RecordingSink;

fn executor() -> Executor {
    // No browser behind this session: every page-touching step fails
    // recoverably, which is exactly what the event-contract tests need.
    let session = Arc::new(SessionManager::new(SessionConfig::default()));
    Executor::new(session, Duration::from_millis(500))
}

fn progress_steps(events: &[ServerMessage]) -> Vec<(usize, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerMessage::ActionProgress {
                current_step,
                total_steps,
                ..
            } => Some((*current_step, *total_steps)),
            _ => None,
        })
        .collect()
}

fn completions(events: &[ServerMessage]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerMessage::ExecutionComplete { total_actions } => Some(*total_actions),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_n_progress_events_then_one_completion() {
    let executor = executor();
    let sink = RecordingSink::default();
    let queue = ActionQueue::new(vec![
        Action::Goto {
            url: "https://example.com".to_string(),
            timeout: 30_000,
        },
        Action::Click {
            selector: "#missing".to_string(),
        },
        Action::WaitForTimeout { timeout: 100 },
    ]);

    executor.run_queue(&queue, &sink).await;

    let events = sink.events();
    assert_eq!(progress_steps(&events), vec![(0, 3), (1, 3), (2, 3)]);
    assert_eq!(completions(&events), vec![3]);

    // Completion comes last.
    assert!(matches!(
        events.last(),
        Some(ServerMessage::ExecutionComplete { total_actions: 3 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_empty_queue_yields_only_completion() {
    let executor = executor();
    let sink = RecordingSink::default();

    executor.run_queue(&ActionQueue::default(), &sink).await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(completions(&events), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_action_does_not_halt_queue() {
    let executor = executor();
    let sink = RecordingSink::default();
    let queue = ActionQueue::from_values(&[
        json!({"type": "frobnicate"}),
        json!({"type": "waitForTimeout", "timeout": 50}),
    ]);

    executor.run_queue(&queue, &sink).await;

    let events = sink.events();
    assert_eq!(progress_steps(&events), vec![(0, 2), (1, 2)]);
    assert_eq!(completions(&events), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_every_step_failing_still_completes() {
    let executor = executor();
    let sink = RecordingSink::default();
    let queue = ActionQueue::new(vec![
        Action::Click {
            selector: "#a".to_string(),
        },
        Action::Hover {
            selector: "#b".to_string(),
        },
        Action::Evaluate {
            script: "1 + 1".to_string(),
        },
    ]);

    executor.run_queue(&queue, &sink).await;

    let events = sink.events();
    assert_eq!(progress_steps(&events).len(), 3);
    assert_eq!(completions(&events), vec![3]);
}

#[tokio::test(start_paused = true)]
async fn test_progress_precedes_completion_in_order() {
    let executor = executor();
    let sink = RecordingSink::default();
    let queue = ActionQueue::new(vec![
        Action::Scroll {
            direction: Some(ScrollDirection::Down),
        },
        Action::Press {
            key: "Enter".to_string(),
        },
    ]);

    executor.run_queue(&queue, &sink).await;

    let events = sink.events();
    let first_completion = events
        .iter()
        .position(|e| matches!(e, ServerMessage::ExecutionComplete { .. }))
        .unwrap();
    let last_progress = events
        .iter()
        .rposition(|e| matches!(e, ServerMessage::ActionProgress { .. }))
        .unwrap();
    assert!(last_progress < first_completion);
}

#[tokio::test(start_paused = true)]
async fn test_execute_action_without_page_is_no_page_error() {
    let executor = executor();
    let sink = RecordingSink::default();

    let result = executor
        .execute_action(
            &Action::Goto {
                url: "https://example.com".to_string(),
                timeout: 1000,
            },
            &sink,
        )
        .await;

    assert!(matches!(result, Err(ActionError::NoPage)));
    assert!(sink.events().is_empty());
}
