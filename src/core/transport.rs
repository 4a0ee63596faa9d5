use crate::core::session::state::StatusSnapshot;
use crate::domain::{config::Endpoint, error::HexLinkResult};
use async_trait::async_trait;

/// Outcome of a single send: the reply collected during the wait, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReply {
    /// Reply bytes rendered as spaced hex; `None` when nothing arrived.
    pub response: Option<String>,
}

/// Single-connection hex transport driven by the session manager
#[async_trait]
pub trait HexTransport: Send + Sync {
    /// Open a connection, tearing down any existing one first
    async fn connect(&self, endpoint: Endpoint) -> HexLinkResult<()>;

    /// Close the connection; best-effort, always reports success
    async fn disconnect(&self) -> bool;

    /// Write one hex payload and collect whatever reply arrives
    async fn send(&self, hex: &str) -> HexLinkResult<SendReply>;

    /// Point-in-time view including up to `max_entries` log entries
    fn status(&self, max_entries: usize) -> StatusSnapshot;
}
