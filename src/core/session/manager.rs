use crate::core::session::{session::TcpSession, state::StatusSnapshot};
use crate::core::transport::{HexTransport, SendReply};
use crate::domain::config::{Endpoint, HexLinkConfig, HexPreset, SessionConfig};
use crate::domain::error::HexLinkResult;
use crate::infrastructure::history::{HistoryEntry, HistoryStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for `repeat_count` accepted by the glue layers
pub const MAX_REPEAT_COUNT: u32 = 100;

/// Result of a (possibly repeated) send.
///
/// A single send fills `response`. A repeated send fills the counts and
/// `responses`, which is left out when no attempt got a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u32>,
}

impl From<SendReply> for SendResult {
    fn from(reply: SendReply) -> Self {
        Self {
            success: true,
            response: reply.response,
            ..Self::default()
        }
    }
}

/// Owns the one session and layers repeat-send orchestration on top of it.
///
/// Created once at startup and shared (`Arc`) with the HTTP and console
/// front ends.
pub struct SessionManager<T: HexTransport = TcpSession> {
    transport: T,
    repeat_pause: Duration,
    reply_bound: Duration,
    status_log_limit: usize,
    presets: Vec<HexPreset>,
    history: Option<Arc<HistoryStore>>,
}

impl SessionManager<TcpSession> {
    pub fn new(config: &HexLinkConfig) -> Self {
        let mut manager = Self::with_transport(TcpSession::new(config.session.clone()), &config.session);
        manager.presets = config.all_presets();
        manager
    }
}

impl<T: HexTransport> SessionManager<T> {
    pub fn with_transport(transport: T, session: &SessionConfig) -> Self {
        Self {
            transport,
            repeat_pause: session.repeat_pause(),
            reply_bound: session.reply_wait.upper_bound(),
            status_log_limit: session.status_log_limit,
            presets: HexPreset::builtins(),
            history: None,
        }
    }

    /// Remember successful connections in `store`
    pub fn with_history(mut self, store: HistoryStore) -> Self {
        self.history = Some(Arc::new(store));
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn connect(&self, host: &str, port: u32) -> HexLinkResult<bool> {
        let endpoint = Endpoint::new(host, port)?;
        self.transport.connect(endpoint.clone()).await?;

        if let Some(history) = &self.history {
            let store = Arc::clone(history);
            match tokio::task::spawn_blocking(move || store.record(&endpoint)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Failed to save connection history: {}", e),
                Err(e) => warn!("History task failed: {}", e),
            }
        }

        Ok(true)
    }

    pub async fn disconnect(&self) -> bool {
        self.transport.disconnect().await
    }

    /// Send `hex` once, or `repeat_count` times in sequence.
    ///
    /// A repeated send succeeds if any attempt succeeds; the counts in the
    /// result expose partial failure. When every attempt fails, the last
    /// attempt's error is returned.
    pub async fn send_hex(&self, hex: &str, repeat_count: u32) -> HexLinkResult<SendResult> {
        if repeat_count <= 1 {
            return self.transport.send(hex).await.map(SendResult::from);
        }

        info!("Starting send operation with repeat count: {}", repeat_count);

        let mut responses = Vec::new();
        let mut success_count = 0;
        let mut last_error = None;

        for attempt in 1..=repeat_count {
            debug!("Send attempt {}/{}", attempt, repeat_count);

            match self.transport.send(hex).await {
                Ok(reply) => {
                    success_count += 1;
                    match reply.response {
                        Some(response) => {
                            debug!("Attempt {}: successful with response", attempt);
                            responses.push(response);
                        }
                        None => debug!("Attempt {}: successful without response", attempt),
                    }
                }
                Err(e) => {
                    warn!("Attempt {}: {}", attempt, e);
                    last_error = Some(e);
                }
            }

            if attempt < repeat_count {
                tokio::time::sleep(self.repeat_pause).await;
            }
        }

        if success_count > 0 {
            info!(
                "Completed {}/{} send operations successfully",
                success_count, repeat_count
            );
            return Ok(SendResult {
                success: true,
                response: None,
                responses: (!responses.is_empty()).then_some(responses),
                success_count: Some(success_count),
                total_count: Some(repeat_count),
            });
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(SendResult::default()),
        }
    }

    /// Never blocks on socket I/O
    pub fn status(&self) -> StatusSnapshot {
        self.transport.status(self.status_log_limit)
    }

    pub fn presets(&self) -> &[HexPreset] {
        &self.presets
    }

    /// Longest a send of `repeat_count` attempts can take once the socket
    /// accepted the writes: every reply window plus the pauses between them.
    pub fn send_budget(&self, repeat_count: u32) -> Duration {
        let count = repeat_count.max(1);
        self.reply_bound.saturating_mul(count)
            + self.repeat_pause.saturating_mul(count - 1)
    }

    /// File reads run on the blocking pool
    pub async fn history(&self) -> Vec<HistoryEntry> {
        let Some(history) = &self.history else {
            return Vec::new();
        };

        let store = Arc::clone(history);
        match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("History task failed: {}", e);
                Vec::new()
            }
        }
    }
}
