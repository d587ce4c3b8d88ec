//! Browser automation actions.
//!
//! An [`Action`] is one discrete instruction against the live page. Queues
//! arrive as raw JSON from clients and from the plan provider, so decoding
//! is deliberately lenient: an item with an unrecognized `type` tag, or a
//! known tag with malformed fields, degrades to [`Action::Unknown`] instead
//! of failing the whole submission. The executor logs and skips unknown
//! steps; they still count toward queue length.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_SELECTOR_TIMEOUT_MS, DEFAULT_TYPE_DELAY_MS};

fn default_navigation_timeout() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT_MS
}

fn default_selector_timeout() -> u64 {
    DEFAULT_SELECTOR_TIMEOUT_MS
}

fn default_type_delay() -> u64 {
    DEFAULT_TYPE_DELAY_MS
}

/// Scroll direction for relative scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// One browser-automation instruction.
///
/// The wire format is an internally tagged object: `{"type": "goto", "url":
/// ...}`. Tags and field names match the original protocol, so existing
/// clients and planner prompts keep working unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    /// Navigate to a URL and wait for the page to settle.
    Goto {
        url: String,
        /// Navigation timeout in milliseconds.
        #[serde(default = "default_navigation_timeout")]
        timeout: u64,
    },
    /// Click the first element matching a CSS selector.
    Click { selector: String },
    /// Type text into the element matching a CSS selector.
    ///
    /// Characters are sent one at a time with `delay` milliseconds between
    /// them to emulate human input.
    Type {
        selector: String,
        text: String,
        #[serde(default = "default_type_delay")]
        delay: u64,
    },
    /// Press a keyboard key (e.g. "Enter", "Tab").
    Press { key: String },
    /// Wait for a selector to appear, bounded by a timeout.
    WaitForSelector {
        selector: String,
        #[serde(default = "default_selector_timeout")]
        timeout: u64,
    },
    /// Pure delay of the given number of milliseconds. Always succeeds.
    WaitForTimeout { timeout: u64 },
    /// Scroll by a fixed offset in the given direction, or to the bottom
    /// of the page when no direction is given.
    Scroll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<ScrollDirection>,
    },
    /// Hover over the first element matching a CSS selector.
    Hover { selector: String },
    /// Select an option value in a `<select>` element.
    Select { selector: String, value: String },
    /// Execute an arbitrary script in the page context.
    ///
    /// Not sandboxed: the caller (and the plan provider feeding it) is
    /// trusted with full page access.
    Evaluate { script: String },
    /// Capture a screenshot on demand, independent of the ticker schedule.
    Screenshot,
    /// Catch-all for action types this executor does not implement.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// The wire tag of this action, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Goto { .. } => "goto",
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Press { .. } => "press",
            Action::WaitForSelector { .. } => "waitForSelector",
            Action::WaitForTimeout { .. } => "waitForTimeout",
            Action::Scroll { .. } => "scroll",
            Action::Hover { .. } => "hover",
            Action::Select { .. } => "select",
            Action::Evaluate { .. } => "evaluate",
            Action::Screenshot => "screenshot",
            Action::Unknown => "unknown",
        }
    }

    /// Whether this is the catch-all variant for unrecognized input.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Action::Unknown)
    }

    /// Decode a single raw value, degrading to [`Action::Unknown`] when the
    /// shape does not match any known variant.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Action::Unknown)
    }
}

/// An ordered, immutable batch of actions submitted together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionQueue {
    actions: Vec<Action>,
}

impl ActionQueue {
    /// Create a queue from already-typed actions.
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// Decode a queue from raw JSON values, preserving order.
    ///
    /// This is the validation gate for untrusted action lists: items that
    /// fail to decode become [`Action::Unknown`] rather than rejecting the
    /// submission, so one malformed step never drops the rest of the plan.
    pub fn from_values(values: &[Value]) -> Self {
        Self {
            actions: values.iter().map(Action::from_value).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of steps that decoded to a known action type.
    pub fn known_len(&self) -> usize {
        self.actions.iter().filter(|a| !a.is_unknown()).count()
    }

    /// Serialize back to raw JSON values, e.g. for plan replies.
    pub fn to_values(&self) -> Vec<Value> {
        self.actions
            .iter()
            .filter_map(|a| serde_json::to_value(a).ok())
            .collect()
    }
}

impl IntoIterator for ActionQueue {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl From<Vec<Action>> for ActionQueue {
    fn from(actions: Vec<Action>) -> Self {
        Self::new(actions)
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
