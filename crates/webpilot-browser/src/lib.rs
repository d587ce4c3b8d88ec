//! Browser session ownership for WebPilot.
//!
//! This crate owns the process-wide browser resources: exactly one Chrome
//! process and one page within it, driven over the Chrome DevTools Protocol.
//!
//! ```text
//! ┌──────────────────┐    WebSocket     ┌──────────────────┐
//! │  webpilot-server │ ◄──────────────► │   Chrome         │
//! │  (via this crate)│       CDP        │  (launched here) │
//! └──────────────────┘                  └──────────────────┘
//! ```
//!
//! The [`SessionManager`] is the single owner: it launches (or attaches to)
//! Chrome, opens the page, and hands out shared [`Page`] handles through
//! [`SessionManager::page`]. Consumers never own the page and must treat a
//! `None` page as a recoverable per-call condition — the executor and the
//! screenshot ticker both act on the page concurrently and without locking,
//! so individual calls racing a navigation are expected to fail.

pub mod cdp;
mod session;

pub use cdp::{CdpClient, CdpError, Page};
pub use session::{SessionConfig, SessionError, SessionManager};
