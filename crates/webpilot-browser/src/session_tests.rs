use super::*;

#[test]
fn test_config_defaults() {
    let config = SessionConfig::default();
    assert_eq!(config.debug_port, 9222);
    assert_eq!(config.viewport_width, 1280);
    assert_eq!(config.viewport_height, 720);
    assert!(!config.headless);
    assert!(config.profile_dir.is_none());
}

#[test]
fn test_config_deserialization_with_defaults() {
    let config: SessionConfig = serde_json::from_str(r#"{"debug_port": 9333}"#).unwrap();
    assert_eq!(config.debug_port, 9333);
    assert_eq!(config.viewport_width, 1280);
}

#[test]
fn test_endpoint() {
    let config = SessionConfig {
        debug_port: 9333,
        ..Default::default()
    };
    assert_eq!(config.endpoint(), "http://localhost:9333");
}

#[test]
fn test_resolved_profile_dir_honors_override() {
    let config = SessionConfig {
        profile_dir: Some(PathBuf::from("/tmp/profile")),
        ..Default::default()
    };
    assert_eq!(config.resolved_profile_dir(), PathBuf::from("/tmp/profile"));
}

#[test]
fn test_resolved_profile_dir_default_location() {
    let config = SessionConfig::default();
    let dir = config.resolved_profile_dir();
    assert!(dir.ends_with(PathBuf::from(".webpilot").join("browser-profile")));
}

#[tokio::test]
async fn test_page_is_none_before_initialization() {
    let manager = SessionManager::new(SessionConfig::default());
    assert!(manager.page().await.is_none());
    assert!(!manager.is_connected().await);
}

#[tokio::test]
async fn test_shutdown_is_idempotent_without_init() {
    let manager = SessionManager::new(SessionConfig::default());
    manager.shutdown().await;
    manager.shutdown().await;
    assert!(manager.page().await.is_none());
}

#[test]
fn test_find_chrome_does_not_panic() {
    // May or may not find a browser on the test host; it must simply not
    // panic either way.
    let _ = SessionManager::find_chrome();
}
