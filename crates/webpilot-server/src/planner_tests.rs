use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_fallback_generic_search() {
    let plan = fallback_plan("what is the tallest building");

    assert!(plan.fallback);
    assert!(!plan.queue.is_empty());

    let actions = plan.queue.actions();
    assert!(matches!(&actions[0], Action::Goto { url, .. } if url.contains("google.com")));
    assert!(
        actions
            .iter()
            .any(|a| matches!(a, Action::Type { text, .. } if text == "what is the tallest building"))
    );
    assert!(actions.iter().any(|a| matches!(a, Action::Press { key } if key == "Enter")));
}

#[test]
fn test_fallback_keyword_routing() {
    let shop = fallback_plan("buy a mechanical keyboard");
    assert!(matches!(
        &shop.queue.actions()[0],
        Action::Goto { url, .. } if url.contains("amazon.com")
    ));

    let coffee = fallback_plan("order me a coffee");
    assert!(
        coffee
            .queue
            .iter()
            .any(|a| matches!(a, Action::Type { text, .. } if text.contains("coffee")))
    );

    let flight = fallback_plan("find a flight to Lisbon");
    assert!(matches!(
        &flight.queue.actions()[0],
        Action::Goto { url, .. } if url.contains("travel/flights")
    ));
}

#[tokio::test]
async fn test_unconfigured_planner_falls_back() {
    let planner = Planner::new(None);
    let plan = planner.plan("look something up").await;

    assert!(plan.fallback);
    assert!(!plan.queue.is_empty());
}

#[tokio::test]
async fn test_planner_uses_provider_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/plan"))
        .and(body_partial_json(json!({"message": "open example"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Opening example.com for you.",
            "actions": [
                {"type": "goto", "url": "https://example.com"},
                {"type": "screenshot"}
            ]
        })))
        .mount(&server)
        .await;

    let planner = Planner::new(Some(format!("{}/plan", server.uri())));
    let plan = planner.plan("open example").await;

    assert!(!plan.fallback);
    assert_eq!(plan.message, "Opening example.com for you.");
    assert_eq!(plan.queue.len(), 2);
    assert_eq!(plan.queue.actions()[1], Action::Screenshot);
}

#[tokio::test]
async fn test_provider_error_status_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let planner = Planner::new(Some(server.uri()));
    let plan = planner.plan("anything").await;

    assert!(plan.fallback);
}

#[tokio::test]
async fn test_provider_garbage_plan_falls_back() {
    let server = MockServer::start().await;

    // Valid JSON shape, but no item decodes to a known action.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "trust me",
            "actions": [{"type": "levitate"}, 17]
        })))
        .mount(&server)
        .await;

    let planner = Planner::new(Some(server.uri()));
    let plan = planner.plan("anything").await;

    assert!(plan.fallback);
}

#[tokio::test]
async fn test_provider_malformed_body_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let planner = Planner::new(Some(server.uri()));
    let plan = planner.plan("anything").await;

    assert!(plan.fallback);
}
