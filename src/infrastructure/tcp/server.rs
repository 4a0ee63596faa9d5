use crate::core::codec;
use crate::domain::error::{HexLinkError, HexLinkResult};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

/// Local stand-in for a relay controller: every byte received is sent back.
pub struct EchoServer {
    listener: Option<TcpListener>,
    bind_addr: SocketAddr,
    clients: Arc<Mutex<Vec<SocketAddr>>>,
    shutdown_sender: Option<oneshot::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl EchoServer {
    pub async fn new(bind_addr: &str) -> HexLinkResult<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| HexLinkError::Session {
            message: format!("Failed to bind to {}: {}", bind_addr, e),
        })?;

        let actual_addr = listener.local_addr()?;
        info!("Echo server created on {}", actual_addr);

        Ok(Self {
            listener: Some(listener),
            bind_addr: actual_addr,
            clients: Arc::new(Mutex::new(Vec::new())),
            shutdown_sender: None,
            server_handle: None,
        })
    }

    pub fn get_bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub async fn start(&mut self) -> HexLinkResult<()> {
        let listener = self.listener.take().ok_or_else(|| HexLinkError::Session {
            message: "Server is already running".to_string(),
        })?;

        info!("Starting echo server on {}", self.bind_addr);

        let clients = Arc::clone(&self.clients);
        let (shutdown_sender, mut shutdown_receiver) = oneshot::channel();

        let server_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                info!("New client connected: {}", addr);
                                clients.lock().await.push(addr);

                                let clients = Arc::clone(&clients);
                                tokio::spawn(async move {
                                    if let Err(e) = Self::handle_client(stream, addr).await {
                                        error!("Error handling client {}: {}", addr, e);
                                    }
                                    clients.lock().await.retain(|client| *client != addr);
                                    info!("Client disconnected: {}", addr);
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {}", e);
                            }
                        }
                    }

                    _ = &mut shutdown_receiver => {
                        info!("Received shutdown signal, stopping server");
                        break;
                    }
                }
            }
        });

        self.shutdown_sender = Some(shutdown_sender);
        self.server_handle = Some(server_handle);
        Ok(())
    }

    async fn handle_client(mut stream: TcpStream, addr: SocketAddr) -> HexLinkResult<()> {
        let mut buffer = vec![0u8; 4096];

        loop {
            let n = stream.read(&mut buffer).await?;
            if n == 0 {
                debug!("Client {} disconnected gracefully", addr);
                return Ok(());
            }

            debug!("Echoing {} bytes to {}: {}", n, addr, codec::decode(&buffer[..n]));
            stream.write_all(&buffer[..n]).await?;
            stream.flush().await?;
        }
    }

    pub async fn stop(&mut self) -> HexLinkResult<()> {
        if let Some(handle) = self.server_handle.take() {
            info!("Stopping echo server");

            if let Some(sender) = self.shutdown_sender.take() {
                if sender.send(()).is_err() {
                    warn!("Echo server task already finished");
                }
            }

            if let Err(e) = handle.await {
                warn!("Server task completed with error: {}", e);
            }

            info!("Echo server stopped");
        }

        Ok(())
    }

    /// Run until the process receives Ctrl+C
    pub async fn run_until_ctrl_c(&mut self) -> HexLinkResult<()> {
        self.start().await?;
        tokio::signal::ctrl_c().await?;
        self.stop().await
    }

    pub async fn get_client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.is_some()
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            warn!("EchoServer dropped while still running - aborting accept loop");
            handle.abort();
        }
    }
}
