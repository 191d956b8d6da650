// Channel relay server - Accepts JSON-lines channel messages over TCP

use crate::channel::{ChannelMessage, Dispatcher};
use crate::error::{DevLogsError, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Default address the relay listens on
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5899";

/// Relay that forwards channel messages from external hosts to a [`Dispatcher`]
///
/// Each connection sends one JSON object per line:
/// `{"event": "devlogs:log", "data": {...}}`. Nothing is sent back.
pub struct ChannelServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl ChannelServer {
    /// Bind the relay to `addr`
    ///
    /// # Arguments
    /// * `addr` - Socket address to listen on; port 0 picks a free port
    /// * `dispatcher` - Receives every decoded channel message
    ///
    /// # Returns
    /// * `Ok(ChannelServer)` - Bound relay, not yet accepting
    /// * `Err(DevLogsError::ChannelError)` - The address could not be bound
    pub async fn bind(addr: &str, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DevLogsError::ChannelError(format!("Failed to bind to {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| DevLogsError::ChannelError(format!("Failed to read local address: {}", e)))
    }

    /// Run the accept loop forever
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run the accept loop until `shutdown` completes
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Channel relay shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    tracing::debug!("Channel connection from {}", peer);
                    let dispatcher = Arc::clone(&self.dispatcher);
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, dispatcher).await {
                            tracing::warn!("Channel connection from {} failed: {}", peer, e);
                        }
                    });
                }
            }
        }
    }

    /// Read messages from one connection until it closes
    async fn handle_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>) -> Result<()> {
        let mut lines = BufReader::new(stream).lines();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| DevLogsError::ChannelError(format!("Failed to read message: {}", e)))?
        {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ChannelMessage>(&line) {
                Ok(message) => {
                    dispatcher.dispatch(&message.event, message.data);
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed channel message: {}", e);
                }
            }
        }

        Ok(())
    }
}
