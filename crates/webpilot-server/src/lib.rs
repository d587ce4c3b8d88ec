//! # WebPilot Server
//!
//! The automation orchestrator: accepts persistent WebSocket connections,
//! executes ordered action queues against the shared browser page, and
//! streams periodic screenshots and step-progress events back to each
//! client.
//!
//! Concurrency contract: the action executor and the per-connection
//! screenshot ticker run as independent tasks sharing the page through
//! [`SessionManager::page`] with no mutual exclusion. A capture racing a
//! navigation may fail; that is absorbed, because losing an occasional tick
//! is cheaper than serializing screenshots behind action execution.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use webpilot_browser::SessionManager;

mod connection;
mod events;
mod executor;
mod planner;
mod server;
mod ticker;

pub use events::{EventSink, OutboundSink};
pub use executor::{ActionError, Executor};
pub use planner::{Plan, PlanError, Planner};
pub use server::{ServerError, create_router, serve};
pub use ticker::ScreenshotTicker;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: "127.0.0.1").
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on (default: 3001).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Screenshot ticker period in milliseconds (default: 3000).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Settle delay after each executed action in milliseconds
    /// (default: 500).
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Plan provider endpoint; the local fallback planner is used when
    /// unset.
    #[serde(default)]
    pub planner_url: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_tick_interval_ms() -> u64 {
    3000
}

fn default_settle_delay_ms() -> u64 {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tick_interval_ms: default_tick_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            planner_url: None,
        }
    }
}

impl ServerConfig {
    /// The listen address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Shared state across handlers and connections.
pub struct AppState {
    /// The process-wide browser session.
    pub session: Arc<SessionManager>,
    /// Plan provider client.
    pub planner: Planner,
    /// Server configuration.
    pub config: ServerConfig,
    /// Number of active WebSocket connections.
    pub connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: ServerConfig, session: Arc<SessionManager>) -> Self {
        let planner = Planner::new(config.planner_url.clone());
        Self {
            session,
            planner,
            config,
            connections: AtomicUsize::new(0),
        }
    }
}
