//! HTTP server and routing.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use webpilot_protocols::{PlanRequest, PlanResponse};

use crate::AppState;
use crate::connection;

/// Server startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Io(String),
}

/// Create the axum router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Persistent bidirectional channel
        .route("/ws", get(ws_handler))
        // Control plane
        .route("/health", get(health))
        .route("/init-browser", post(init_browser))
        .route("/plan", post(plan))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = state.config.address();
    let listener_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| ServerError::InvalidAddress(format!("{}: {}", addr, e)))?;

    let listener = tokio::net::TcpListener::bind(listener_addr)
        .await
        .map_err(|e| ServerError::Bind(e.to_string()))?;

    info!("WebPilot server listening at http://{}", addr);
    info!("WebSocket endpoint ready at ws://{}/ws", addr);

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| ServerError::Io(e.to_string()))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state))
}

/// Health check: status plus browser connectivity.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let browser = if state.session.is_connected().await {
        "connected"
    } else {
        "disconnected"
    };

    axum::Json(json!({
        "status": "ok",
        "browser": browser,
        "connections": state.connections.load(Ordering::SeqCst),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Initialize (or re-initialize) the browser session.
///
/// This is the explicit retry path for launch failures; repeating it is
/// safe and replaces the current page.
async fn init_browser(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.session.initialize().await {
        Ok(()) => axum::Json(json!({
            "success": true,
            "message": "Browser initialized",
        })),
        Err(e) => {
            error!("Browser initialization failed: {}", e);
            axum::Json(json!({
                "success": false,
                "message": format!("Failed to initialize browser: {}", e),
            }))
        }
    }
}

/// Proxy the user's intent to the plan provider, degrading to the local
/// fallback queue when it is unavailable. Always answers 200.
async fn plan(
    State(state): State<Arc<AppState>>,
    axum::Json(request): axum::Json<PlanRequest>,
) -> impl IntoResponse {
    let plan = state.planner.plan(&request.message).await;

    axum::Json(PlanResponse {
        message: plan.message,
        actions: plan.queue.to_values(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;
    use webpilot_browser::{SessionConfig, SessionManager};

    fn state() -> Arc<AppState> {
        let session = Arc::new(SessionManager::new(SessionConfig::default()));
        Arc::new(AppState::new(ServerConfig::default(), session))
    }

    #[test]
    fn test_create_router() {
        let _router = create_router(state());
    }

    #[tokio::test]
    async fn test_serve_rejects_invalid_address() {
        let session = Arc::new(SessionManager::new(SessionConfig::default()));
        let config = ServerConfig {
            host: "not an address".to_string(),
            ..Default::default()
        };
        let state = Arc::new(AppState::new(config, session));

        let result = serve(state).await;
        assert!(matches!(result, Err(ServerError::InvalidAddress(_))));
    }
}
