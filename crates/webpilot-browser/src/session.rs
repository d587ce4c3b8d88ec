//! Browser session lifecycle.
//!
//! The [`SessionManager`] is the only component that creates or destroys
//! browser resources. Everyone else — the action executor, the screenshot
//! ticker, the health endpoint — borrows the page through
//! [`SessionManager::page`] and must tolerate `None`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cdp::{CdpClient, CdpError, Page};

/// Session manager errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Chrome not found. Please install Google Chrome.")]
    ChromeNotFound,

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error(transparent)]
    Cdp(#[from] CdpError),
}

/// Browser session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Chrome remote-debugging port.
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,
    /// Fixed viewport width.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    /// Fixed viewport height.
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Run Chrome headless.
    #[serde(default)]
    pub headless: bool,
    /// Profile directory for persistent browser state.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,
}

fn default_debug_port() -> u16 {
    9222
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            headless: false,
            profile_dir: None,
        }
    }
}

impl SessionConfig {
    /// The CDP discovery endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }

    /// Profile directory, defaulting under the user's home.
    pub fn resolved_profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".webpilot")
                .join("browser-profile")
        })
    }
}

/// Owns the singleton browser process and page.
///
/// `initialize` is idempotent in effect (re-initializing replaces the old
/// page) but must be serialized against an in-flight action queue by the
/// caller. `shutdown` is an idempotent no-op once closed.
pub struct SessionManager {
    config: SessionConfig,
    client: RwLock<Option<Arc<CdpClient>>>,
    page: RwLock<Option<Arc<Page>>>,
    /// Chrome process handle (if we launched it).
    chrome_process: RwLock<Option<Child>>,
}

impl SessionManager {
    /// Create a new session manager. Performs no I/O.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            page: RwLock::new(None),
            chrome_process: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The active page, or `None` when not initialized.
    ///
    /// A `None` page is a non-fatal per-call condition for consumers: log,
    /// skip, and try again on the next call.
    pub async fn page(&self) -> Option<Arc<Page>> {
        self.page.read().await.clone()
    }

    /// Whether a live page is available.
    pub async fn is_connected(&self) -> bool {
        self.page.read().await.is_some()
    }

    /// Find the Chrome executable.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];

        #[cfg(target_os = "linux")]
        let paths = [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Check whether Chrome already answers on the debug port.
    async fn is_chrome_running(&self) -> bool {
        reqwest::get(format!("{}/json/version", self.config.endpoint()))
            .await
            .is_ok()
    }

    /// Launch Chrome with remote debugging enabled.
    async fn launch_chrome(&self) -> Result<Child, SessionError> {
        let chrome_path = Self::find_chrome().ok_or(SessionError::ChromeNotFound)?;
        let profile_dir = self.config.resolved_profile_dir();

        if let Err(e) = std::fs::create_dir_all(&profile_dir) {
            warn!("Failed to create profile directory: {}", e);
        }

        info!("Launching Chrome with profile at: {}", profile_dir.display());

        let mut cmd = Command::new(&chrome_path);
        cmd.arg(format!("--remote-debugging-port={}", self.config.debug_port))
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg(format!(
                "--window-size={},{}",
                self.config.viewport_width, self.config.viewport_height
            ))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--metrics-recording-only")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if self.config.headless {
            cmd.arg("--headless=new");
        }

        let child = cmd
            .spawn()
            .map_err(|e| SessionError::LaunchFailed(e.to_string()))?;

        info!("Chrome launched with PID: {:?}", child.id());
        Ok(child)
    }

    /// Launch (or attach to) Chrome and open a fresh page at the fixed
    /// viewport.
    ///
    /// Re-initializing replaces the previous page. A launch or connect
    /// failure is reported to the caller and leaves the session
    /// uninitialized; there is no automatic retry.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        if !self.is_chrome_running().await {
            info!(
                "Chrome not running on port {}, launching...",
                self.config.debug_port
            );

            let child = self.launch_chrome().await?;
            *self.chrome_process.write().await = Some(child);

            let mut attempts = 0;
            let max_attempts = 30;
            while attempts < max_attempts {
                tokio::time::sleep(Duration::from_millis(200)).await;
                if self.is_chrome_running().await {
                    break;
                }
                attempts += 1;
            }

            if attempts >= max_attempts {
                return Err(SessionError::LaunchFailed(
                    "Chrome failed to start within timeout".to_string(),
                ));
            }
        }

        let client = {
            let existing = self.client.read().await.clone();
            match existing {
                Some(client) => client,
                None => {
                    let client = Arc::new(
                        CdpClient::connect(&self.config.endpoint())
                            .await
                            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?,
                    );
                    *self.client.write().await = Some(client.clone());
                    client
                }
            }
        };

        // Replace any previous page so re-initialization starts clean.
        if let Some(old) = self.page.write().await.take() {
            if let Err(e) = client.close_page(old.target_id()).await {
                warn!("Failed to close previous page: {}", e);
            }
        }

        let page = client.new_page(None).await?;
        page.set_viewport(self.config.viewport_width, self.config.viewport_height)
            .await?;
        *self.page.write().await = Some(Arc::new(page));

        info!("Browser session initialized");
        Ok(())
    }

    /// Close the page and browser, releasing OS resources.
    ///
    /// Safe to call repeatedly; errors during teardown are logged and
    /// absorbed.
    pub async fn shutdown(&self) {
        let page = self.page.write().await.take();
        if let Some(page) = page {
            if let Some(client) = self.client.read().await.clone() {
                if let Err(e) = client.close_page(page.target_id()).await {
                    warn!("Failed to close page during shutdown: {}", e);
                }
            }
        }

        let _ = self.client.write().await.take();

        if let Some(mut child) = self.chrome_process.write().await.take() {
            info!("Shutting down Chrome...");
            let _ = child.kill().await;
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
