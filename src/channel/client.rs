// Channel relay client - Pushes channel messages to a running relay

use crate::channel::protocol::{BrowserEvent, ChannelMessage};
use crate::error::{DevLogsError, Result};
use serde_json::Value;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Maximum number of connection retry attempts
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Delay between retry attempts
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Fire-and-forget sender for the channel relay
pub struct ChannelClient {
    stream: TcpStream,
}

impl ChannelClient {
    /// Connect to a relay, retrying briefly while it starts up
    pub async fn connect(addr: &str) -> Result<Self> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(Self { stream }),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < MAX_RETRY_ATTEMPTS {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(DevLogsError::ChannelError(format!(
            "Failed to connect to {}: {}",
            addr,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string())
        )))
    }

    /// Send one named event
    pub async fn send(&mut self, event: &str, data: Value) -> Result<()> {
        let message = ChannelMessage::new(event, data);
        let mut line = serde_json::to_vec(&message).map_err(|e| {
            DevLogsError::SerializationError(format!("Failed to serialize message: {}", e))
        })?;
        line.push(b'\n');

        self.stream
            .write_all(&line)
            .await
            .map_err(|e| DevLogsError::ChannelError(format!("Failed to send message: {}", e)))?;

        self.stream
            .flush()
            .await
            .map_err(|e| DevLogsError::ChannelError(format!("Failed to flush stream: {}", e)))
    }

    /// Send a browser event under `event`
    pub async fn send_event(&mut self, event: &str, browser_event: &BrowserEvent) -> Result<()> {
        self.send(event, browser_event.to_payload()).await
    }

    /// Close the write side so the relay sees the end of the stream
    pub async fn close(mut self) -> Result<()> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| DevLogsError::ChannelError(format!("Failed to close stream: {}", e)))
    }
}
