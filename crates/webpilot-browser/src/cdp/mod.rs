//! Chrome DevTools Protocol client.
//!
//! A minimal CDP layer: [`CdpClient`] holds the browser-level WebSocket and
//! correlates request/response pairs; [`Page`] is a handle to one attached
//! page target and exposes the operations the orchestrator needs
//! (navigation, input dispatch, selector waits, screenshots, script
//! evaluation).

mod client;
mod error;
mod page;
mod protocol;

pub use client::CdpClient;
pub use error::CdpError;
pub use page::Page;
pub use protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
