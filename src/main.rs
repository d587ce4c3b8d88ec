//! WebPilot - browser automation orchestrator.
//!
//! Main entry point: CLI parsing, tracing setup, browser bootstrap, and the
//! HTTP/WebSocket server.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use webpilot_browser::{SessionConfig, SessionManager};
use webpilot_server::{AppState, ServerConfig};

/// WebPilot CLI.
#[derive(Parser)]
#[command(name = "webpilot")]
#[command(about = "Browser automation orchestrator with live screenshot streaming")]
#[command(version)]
struct Cli {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Chrome remote-debugging port
    #[arg(long, default_value_t = 9222)]
    debug_port: u16,

    /// Run Chrome headless
    #[arg(long)]
    headless: bool,

    /// Plan provider endpoint; a local fallback plan is used when unset
    #[arg(long, env = "WEBPILOT_PLANNER_URL")]
    planner_url: Option<String>,

    /// Screenshot ticker period in milliseconds
    #[arg(long, default_value_t = 3000)]
    tick_interval_ms: u64,

    /// Skip launching the browser at startup
    #[arg(long)]
    no_auto_init: bool,
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let session = Arc::new(SessionManager::new(SessionConfig {
        debug_port: cli.debug_port,
        headless: cli.headless,
        ..Default::default()
    }));

    // Bring the browser up before serving so the first client sees a live
    // page. A failure here is not fatal: POST /init-browser is the retry
    // path.
    if !cli.no_auto_init {
        match session.initialize().await {
            Ok(()) => info!("Browser session ready"),
            Err(e) => warn!("Browser auto-initialization failed: {}", e),
        }
    }

    let state = Arc::new(AppState::new(
        ServerConfig {
            host: cli.host,
            port: cli.port,
            tick_interval_ms: cli.tick_interval_ms,
            planner_url: cli.planner_url,
            ..Default::default()
        },
        session.clone(),
    ));

    let result = tokio::select! {
        result = webpilot_server::serve(state) => result.map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    session.shutdown().await;
    info!("Shutdown complete");

    result
}
