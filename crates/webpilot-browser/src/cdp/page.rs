//! Handle to a single attached page target.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use webpilot_protocols::ScrollDirection;

use super::client::CallChannel;
use super::error::CdpError;

/// Poll interval for readiness and selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A page attached over CDP.
///
/// Cheap to share: all consumers hold `Arc<Page>` handed out by the session
/// manager, and every operation is a per-call `Result` so concurrent use
/// (executor and ticker) degrades to recoverable failures, never panics.
pub struct Page {
    target_id: String,
    session_id: String,
    channel: Arc<CallChannel>,
}

impl Page {
    pub(crate) fn new(target_id: String, session_id: String, channel: Arc<CallChannel>) -> Self {
        Self {
            target_id,
            session_id,
            channel,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a CDP command scoped to this page's session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.channel
            .call(method, params, Some(&self.session_id))
            .await
    }

    /// Enable the CDP domains the orchestrator relies on.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Fix the viewport dimensions for this page.
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CdpError> {
        self.call(
            "Emulation.setDeviceMetricsOverride",
            Some(json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 1,
                "mobile": false,
            })),
        )
        .await?;
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigate to a URL and wait for the page to settle, bounded by
    /// `timeout`. Timing out is a recoverable per-action failure.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        let result = self.call("Page.navigate", Some(json!({"url": url}))).await?;

        if let Some(error) = result.get("errorText") {
            return Err(CdpError::NavigationFailed(
                error.as_str().unwrap_or("Unknown error").to_string(),
            ));
        }

        self.wait_for_ready(timeout).await?;

        debug!("Navigated to {}", url);
        Ok(())
    }

    /// Wait until the document reports itself loaded.
    ///
    /// Readiness is a heuristic poll of `document.readyState`; pages that
    /// keep loading subresources past `interactive` are considered settled.
    pub async fn wait_for_ready(&self, timeout: Duration) -> Result<(), CdpError> {
        let start = std::time::Instant::now();

        loop {
            let result = self.evaluate("document.readyState").await?;

            if let Some(state) = result.as_str() {
                if state == "complete" || state == "interactive" {
                    return Ok(());
                }
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("Page load timeout".to_string()));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    // ========================================================================
    // JavaScript execution
    // ========================================================================

    /// Evaluate a JavaScript expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    // ========================================================================
    // Screenshots
    // ========================================================================

    /// Capture the current viewport as a base64-encoded PNG.
    pub async fn screenshot_base64(&self) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.captureScreenshot",
                Some(json!({"format": "png", "captureBeyondViewport": false})),
            )
            .await?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }

    // ========================================================================
    // Selectors
    // ========================================================================

    /// Query a selector against the document root.
    pub async fn query_selector(&self, selector: &str) -> Result<Option<i64>, CdpError> {
        let doc = self.call("DOM.getDocument", Some(json!({"depth": 0}))).await?;
        let root_id = doc["root"]["nodeId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("Missing document root".to_string()))?;

        let result = self
            .call(
                "DOM.querySelector",
                Some(json!({
                    "nodeId": root_id,
                    "selector": selector,
                })),
            )
            .await?;

        let node_id = result["nodeId"].as_i64().unwrap_or(0);
        if node_id == 0 { Ok(None) } else { Ok(Some(node_id)) }
    }

    /// Wait for a selector to appear, bounded by `timeout`.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<i64, CdpError> {
        let start = std::time::Instant::now();

        loop {
            if let Some(node_id) = self.query_selector(selector).await? {
                return Ok(node_id);
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout(format!(
                    "Waiting for selector '{}' timed out",
                    selector
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Center coordinates of the element matching a selector.
    async fn selector_center(&self, selector: &str) -> Result<(f64, f64), CdpError> {
        let node_id = self
            .query_selector(selector)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(selector.to_string()))?;

        let result = self
            .call("DOM.getBoxModel", Some(json!({"nodeId": node_id})))
            .await
            .map_err(|e| match e {
                CdpError::Protocol { .. } => {
                    CdpError::ElementNotFound(format!("{} (not visible)", selector))
                }
                other => other,
            })?;

        let quad: Vec<f64> = result["model"]["content"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
            .unwrap_or_default();

        Ok(quad_center(&quad))
    }

    // ========================================================================
    // Input - mouse
    // ========================================================================

    /// Click the element matching a selector at its center point.
    pub async fn click_selector(&self, selector: &str) -> Result<(), CdpError> {
        let (x, y) = self.selector_center(selector).await?;

        for event_type in ["mousePressed", "mouseReleased"] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event_type,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                })),
            )
            .await?;
        }

        debug!("Clicked {} at ({}, {})", selector, x, y);
        Ok(())
    }

    /// Move the mouse over the element matching a selector.
    pub async fn hover_selector(&self, selector: &str) -> Result<(), CdpError> {
        let (x, y) = self.selector_center(selector).await?;

        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": "mouseMoved",
                "x": x,
                "y": y,
            })),
        )
        .await?;

        debug!("Hovering {} at ({}, {})", selector, x, y);
        Ok(())
    }

    // ========================================================================
    // Input - keyboard
    // ========================================================================

    /// Focus the element matching a selector.
    pub async fn focus_selector(&self, selector: &str) -> Result<(), CdpError> {
        let node_id = self
            .query_selector(selector)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(selector.to_string()))?;

        self.call("DOM.focus", Some(json!({"nodeId": node_id}))).await?;
        Ok(())
    }

    /// Type text into the focused element, one character at a time with
    /// `delay` between characters to emulate human input.
    pub async fn type_text(&self, text: &str, delay: Duration) -> Result<(), CdpError> {
        for ch in text.chars() {
            self.call(
                "Input.insertText",
                Some(json!({"text": ch.to_string()})),
            )
            .await?;

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        debug!("Typed {} characters", text.chars().count());
        Ok(())
    }

    /// Press a key (down then up).
    pub async fn press_key(&self, key: &str) -> Result<(), CdpError> {
        for event_type in ["keyDown", "keyUp"] {
            self.call(
                "Input.dispatchKeyEvent",
                Some(json!({
                    "type": event_type,
                    "key": key,
                })),
            )
            .await?;
        }
        Ok(())
    }

    // ========================================================================
    // Page-context helpers
    // ========================================================================

    /// Select an option in a `<select>` element by value.
    ///
    /// CDP has no native select operation, so the value is set in page
    /// context and `input`/`change` events are dispatched the way a user
    /// interaction would.
    pub async fn select_option(&self, selector: &str, value: &str) -> Result<(), CdpError> {
        self.evaluate(&select_script(selector, value)).await?;
        debug!("Selected '{}' in {}", value, selector);
        Ok(())
    }

    /// Scroll by a fixed offset in the given direction, or to the bottom
    /// of the page when no direction is given.
    pub async fn scroll(&self, direction: Option<ScrollDirection>) -> Result<(), CdpError> {
        self.evaluate(scroll_script(direction)).await?;
        Ok(())
    }
}

/// Center point of a CDP content quad.
fn quad_center(quad: &[f64]) -> (f64, f64) {
    if quad.len() >= 8 {
        let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
        let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
        (x, y)
    } else {
        (0.0, 0.0)
    }
}

/// Embed a Rust string as a JavaScript string literal.
///
/// JSON string encoding is valid JavaScript and handles quotes, backslashes
/// and control characters.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Script for [`Page::select_option`].
fn select_script(selector: &str, value: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) throw new Error('no element'); \
         el.value = {val}; \
         el.dispatchEvent(new Event('input', {{bubbles: true}})); \
         el.dispatchEvent(new Event('change', {{bubbles: true}})); }})()",
        sel = js_string(selector),
        val = js_string(value),
    )
}

/// Script for [`Page::scroll`]. Relative scrolls move a fixed 500 px.
fn scroll_script(direction: Option<ScrollDirection>) -> &'static str {
    match direction {
        Some(ScrollDirection::Down) => "window.scrollBy(0, 500)",
        Some(ScrollDirection::Up) => "window.scrollBy(0, -500)",
        None => "window.scrollTo(0, document.body.scrollHeight)",
    }
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
