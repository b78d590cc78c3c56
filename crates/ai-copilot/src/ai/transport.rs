//! The concrete [`AiTransport`] used in production: a WebSocket
//! connection to the speech-to-speech provider (spec §4.6 "opens a
//! connection to the remote AI provider"). Tests exercise the driver and
//! the uplink/downlink tasks against in-memory doubles instead.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::ai::driver::AiTransport;
use crate::error::{BridgeError, Result};

pub struct WebSocketAiTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketAiTransport {
    /// Open the provider connection. `url` is a full `wss://` (or `ws://`
    /// for local testing) endpoint, deployment-configured per §4.6 step 1.
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, response) =
            connect_async(url).await.map_err(|e| BridgeError::Transport(format!("AI provider connect failed: {e}")))?;
        debug!(status = %response.status(), "AI provider websocket connected");
        Ok(Self { stream })
    }
}

#[async_trait]
impl AiTransport for WebSocketAiTransport {
    async fn send(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.stream
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| BridgeError::Transport(format!("AI provider send failed: {e}")))
    }

    /// Returns the next event-stream chunk, or `None` on a clean close.
    /// Ping/pong/frame-control messages are consumed transparently —
    /// only `Binary`/`Text` payloads carry an event chunk.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            return match self.stream.next().await {
                Some(Ok(Message::Binary(bytes))) => Ok(Some(bytes.to_vec())),
                Some(Ok(Message::Text(text))) => Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Close(_))) | None => Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => Err(BridgeError::Transport(format!("AI provider recv failed: {e}"))),
            };
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await.map_err(|e| BridgeError::Transport(format!("AI provider close failed: {e}")))
    }
}
