//! # WebPilot Protocols
//!
//! Wire types shared by the orchestrator and its clients:
//!
//! - [`Action`] / [`ActionQueue`]: the abstract browser-automation steps a
//!   client (or the plan provider) submits for execution.
//! - [`ClientMessage`] / [`ServerMessage`]: the JSON messages exchanged over
//!   the persistent WebSocket channel.
//! - [`PlanRequest`] / [`PlanResponse`]: the contract with the external plan
//!   provider that turns free-text intent into an action list.
//!
//! All types serialize with `serde` and match the wire format the original
//! clients speak (`type`-tagged objects, camelCase field names).

mod action;
mod error;
mod message;
mod plan;

pub use action::{Action, ActionQueue, ScrollDirection};
pub use error::ProtocolError;
pub use message::{ClientMessage, ServerMessage};
pub use plan::{PlanRequest, PlanResponse};

/// Default navigation timeout in milliseconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for selector waits in milliseconds.
pub const DEFAULT_SELECTOR_TIMEOUT_MS: u64 = 10_000;

/// Default per-character typing delay in milliseconds.
pub const DEFAULT_TYPE_DELAY_MS: u64 = 100;
