use crate::core::codec;
use crate::core::log::{ActivityLog, LogKind};
use crate::core::session::state::{SessionCore, SessionState, StatusSnapshot};
use crate::core::transport::{HexTransport, SendReply};
use crate::domain::config::{Endpoint, ReplyWait, SessionConfig};
use crate::domain::error::{HexLinkError, HexLinkResult};
use async_trait::async_trait;
use chrono::Local;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const READ_BUFFER_SIZE: usize = 4096;

/// Upper bound on bytes held for the current reply window. Older bytes are
/// dropped first; every chunk still reaches the activity log.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// How long a status read may wait for the state lock before falling back
/// to the previous snapshot.
const STATUS_LOCK_WAIT: Duration = Duration::from_millis(5);

/// State shared between the session handle and the socket reader task
struct Shared {
    core: RwLock<SessionCore>,
    log: RwLock<ActivityLog>,
    /// Bytes received since the last send started
    response: Mutex<Vec<u8>>,
    last_status: Mutex<Option<StatusSnapshot>>,
}

impl Shared {
    fn new(log_capacity: usize) -> Self {
        Self {
            core: RwLock::new(SessionCore::default()),
            log: RwLock::new(ActivityLog::with_capacity(log_capacity)),
            response: Mutex::new(Vec::new()),
            last_status: Mutex::new(None),
        }
    }

    fn record(&self, kind: LogKind, message: impl Into<String>) {
        self.log.write().append(kind, message);
    }

    fn is_connected(&self) -> bool {
        self.core.read().state.is_connected()
    }

    fn set_state(&self, state: SessionState) {
        self.core.write().state = state;
    }

    fn touch(&self) {
        self.core.write().last_activity = Some(Local::now());
    }

    fn on_received(&self, generation: u64, bytes: &[u8]) {
        {
            let mut core = self.core.write();
            if core.generation != generation {
                return;
            }
            core.last_activity = Some(Local::now());
        }

        {
            let mut response = self.response.lock();
            response.extend_from_slice(bytes);
            if response.len() > MAX_RESPONSE_BYTES {
                let excess = response.len() - MAX_RESPONSE_BYTES;
                response.drain(..excess);
            }
        }
        self.record(LogKind::Received, format!("Received: {}", codec::decode(bytes)));
    }

    /// Socket went away underneath us. Ignored if a disconnect already
    /// owns the transition or a newer connection replaced this one.
    fn on_closed(&self, generation: u64, cause: Option<std::io::Error>) {
        {
            let mut core = self.core.write();
            if core.generation != generation || !core.state.is_connected() {
                return;
            }
            core.state = SessionState::Idle;
        }

        match cause {
            Some(e) => {
                self.record(LogKind::Error, format!("Socket error: {}", e));
                self.record(LogKind::Error, "Connection closed due to error");
            }
            None => self.record(LogKind::Info, "Connection closed by peer"),
        }
    }

    fn status(&self, max_entries: usize) -> StatusSnapshot {
        let fresh = self.core.try_read_for(STATUS_LOCK_WAIT).and_then(|core| {
            let log = self.log.try_read_for(STATUS_LOCK_WAIT)?;
            Some(StatusSnapshot::from_core(&core, log.snapshot(max_entries)))
        });

        let mut last = self.last_status.lock();
        match fresh {
            Some(snapshot) => {
                *last = Some(snapshot.clone());
                snapshot
            }
            None => {
                warn!("Status lock busy, returning last known snapshot");
                let mut snapshot = last.clone().unwrap_or_else(|| {
                    StatusSnapshot::from_core(&SessionCore::default(), Vec::new())
                });
                snapshot.last_updated = Local::now();
                snapshot
            }
        }
    }
}

/// Open socket owned by the session
struct Link {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
    generation: u64,
}

struct SessionInner {
    config: SessionConfig,
    shared: Arc<Shared>,
    link: tokio::sync::Mutex<Option<Link>>,
    /// Single-slot guard: one send (write plus reply window) at a time
    /// Held by `connect` too, so a socket swap waits for the reply window
    send_gate: tokio::sync::Mutex<()>,
}

/// The single TCP session.
///
/// Cloning yields another handle to the same socket, log and state. Every
/// operation runs on its own task, so a caller that stops waiting (for
/// example an outer timeout) never leaves the state machine half-way.
#[derive(Clone)]
pub struct TcpSession {
    inner: Arc<SessionInner>,
}

impl TcpSession {
    pub fn new(config: SessionConfig) -> Self {
        let shared = Arc::new(Shared::new(config.log_capacity));
        shared.record(LogKind::Info, "TCP client initialized");

        Self {
            inner: Arc::new(SessionInner {
                config,
                shared,
                link: tokio::sync::Mutex::new(None),
                send_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Last confirmed lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner.shared.core.read().state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.shared.is_connected()
    }
}

/// Run one session operation on its own task so it resolves exactly once,
/// even if the caller stops waiting.
async fn run_detached<F, T>(operation: F) -> HexLinkResult<T>
where
    F: Future<Output = HexLinkResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| HexLinkError::Session {
            message: format!("session task failed: {}", e),
        })?
}

impl SessionInner {
    async fn connect(&self, endpoint: Endpoint) -> HexLinkResult<()> {
        // Same lock order as `send`: gate first, then link
        let _gate = self.send_gate.lock().await;
        let mut link = self.link.lock().await;

        if let Some(previous) = link.take() {
            self.close_link(previous).await;
        }

        let generation = {
            let mut core = self.shared.core.write();
            core.generation += 1;
            core.state = SessionState::Connecting;
            core.endpoint = Some(endpoint.clone());
            core.generation
        };
        self.shared
            .record(LogKind::Info, format!("Connecting to {}...", endpoint));

        let timeout = self.config.connect_timeout();
        let attempt = tokio::time::timeout(
            timeout,
            TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
        )
        .await;

        let stream = match attempt {
            Err(_) => {
                self.shared.record(LogKind::Error, "Connection timeout");
                self.shared
                    .set_state(SessionState::Closed(Some("connection timeout".to_string())));
                return Err(HexLinkError::ConnectTimeout {
                    endpoint: endpoint.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Ok(Err(e)) => {
                self.shared
                    .record(LogKind::Error, format!("Socket error: {}", e));
                self.shared.set_state(SessionState::Closed(Some(e.to_string())));
                return Err(HexLinkError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    source: e,
                });
            }
            Ok(Ok(stream)) => stream,
        };

        if self.config.no_delay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY: {}", e);
            }
        }

        let (read_half, writer) = stream.into_split();
        self.shared.response.lock().clear();
        {
            let mut core = self.shared.core.write();
            core.state = SessionState::Connected;
            core.last_activity = Some(Local::now());
        }
        self.shared
            .record(LogKind::Info, format!("Connected to {}", endpoint));

        let reader = tokio::spawn(read_loop(Arc::clone(&self.shared), read_half, generation));
        *link = Some(Link {
            writer,
            reader,
            generation,
        });

        info!("TCP connection established to {}", endpoint);
        Ok(())
    }

    async fn disconnect(&self) -> bool {
        let mut link = self.link.lock().await;

        match link.take() {
            Some(active) => self.close_link(active).await,
            None => {
                self.shared.record(LogKind::Info, "Not connected");
                let mut core = self.shared.core.write();
                if core.state.is_idle() {
                    core.state = SessionState::Idle;
                }
            }
        }

        true
    }

    /// Graceful close. Errors are logged; the socket is gone either way.
    async fn close_link(&self, link: Link) {
        let Link {
            mut writer,
            reader,
            generation,
        } = link;

        {
            let mut core = self.shared.core.write();
            if core.generation == generation {
                core.state = SessionState::Disconnecting;
            }
        }
        self.shared.record(LogKind::Info, "Disconnecting...");

        reader.abort();
        if let Err(e) = reader.await {
            if !e.is_cancelled() {
                warn!("TCP reader task ended with error: {}", e);
            }
        }

        match writer.shutdown().await {
            Ok(()) => self
                .shared
                .record(LogKind::Info, "Disconnected successfully"),
            Err(e) => self
                .shared
                .record(LogKind::Error, format!("Disconnect error: {}", e)),
        }
        drop(writer);

        let mut core = self.shared.core.write();
        if core.generation == generation {
            core.state = SessionState::Idle;
        }
    }

    async fn send(&self, hex: &str) -> HexLinkResult<SendReply> {
        let _gate = self.send_gate.lock().await;

        if !self.shared.is_connected() {
            self.shared
                .record(LogKind::Error, "Not connected. Cannot send data.");
            return Err(HexLinkError::NotConnected);
        }

        let payload = codec::encode(hex).map_err(|e| {
            self.shared.record(LogKind::Error, format!("Send error: {}", e));
            e
        })?;

        self.shared.response.lock().clear();

        {
            let mut link = self.link.lock().await;
            let Some(active) = link.as_mut() else {
                self.shared
                    .record(LogKind::Error, "Not connected. Cannot send data.");
                return Err(HexLinkError::NotConnected);
            };

            if let Err(e) = write_payload(&mut active.writer, &payload).await {
                error!("Failed to write to TCP stream: {}", e);
                self.shared.on_closed(
                    active.generation,
                    Some(std::io::Error::new(e.kind(), e.to_string())),
                );
                return Err(HexLinkError::Socket(e));
            }
        }

        self.shared.touch();
        self.shared
            .record(LogKind::Sent, format!("Sent: {}", codec::decode(&payload)));

        self.await_reply().await;

        let reply = self.shared.response.lock().clone();
        debug!("Reply window closed with {} bytes", reply.len());

        Ok(SendReply {
            response: (!reply.is_empty()).then(|| codec::decode(&reply)),
        })
    }

    /// Hold the send open while the reply arrives.
    ///
    /// Without framing there is no way to know a reply is complete, so this
    /// is a heuristic: either a fixed quiet window, or "no new bytes for
    /// `idle_ms`" capped at `max_ms`.
    async fn await_reply(&self) {
        match self.config.reply_wait {
            ReplyWait::Fixed { window_ms } => {
                tokio::time::sleep(Duration::from_millis(window_ms)).await;
            }
            ReplyWait::Idle { idle_ms, max_ms } => {
                let idle = Duration::from_millis(idle_ms.max(1));
                let deadline = Instant::now() + Duration::from_millis(max_ms);
                let mut seen = 0;

                loop {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    tokio::time::sleep(idle.min(deadline - now)).await;

                    let received = self.shared.response.lock().len();
                    if received > 0 && received == seen {
                        break;
                    }
                    seen = received;
                }
            }
        }
    }
}

async fn write_payload(writer: &mut OwnedWriteHalf, payload: &[u8]) -> std::io::Result<()> {
    writer.write_all(payload).await?;
    writer.flush().await?;
    debug!("Sent {} bytes over TCP", payload.len());
    Ok(())
}

async fn read_loop(shared: Arc<Shared>, mut reader: OwnedReadHalf, generation: u64) {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                info!("TCP connection closed by peer");
                shared.on_closed(generation, None);
                break;
            }
            Ok(n) => {
                debug!("Received {} bytes over TCP", n);
                shared.on_received(generation, &buffer[..n]);
            }
            Err(e) => {
                error!("Failed to read from TCP stream: {}", e);
                shared.on_closed(generation, Some(e));
                break;
            }
        }
    }
}

#[async_trait]
impl HexTransport for TcpSession {
    async fn connect(&self, endpoint: Endpoint) -> HexLinkResult<()> {
        let inner = Arc::clone(&self.inner);
        run_detached(async move { inner.connect(endpoint).await }).await
    }

    async fn disconnect(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        match tokio::spawn(async move { inner.disconnect().await }).await {
            Ok(done) => done,
            Err(e) => {
                error!("Disconnect task failed: {}", e);
                true
            }
        }
    }

    async fn send(&self, hex: &str) -> HexLinkResult<SendReply> {
        let inner = Arc::clone(&self.inner);
        let hex = hex.to_string();
        run_detached(async move { inner.send(&hex).await }).await
    }

    fn status(&self, max_entries: usize) -> StatusSnapshot {
        self.inner.shared.status(max_entries)
    }
}
