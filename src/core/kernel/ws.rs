use crate::core::errors::HollaexError;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{instrument, trace, warn};

type TungsteniteStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open websocket connection - pure transport, no protocol knowledge
#[async_trait]
pub trait WsConnection: Send {
    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), HollaexError>;

    /// Receive the next raw message; `None` once the stream has ended
    ///
    /// Must be cancel-safe: the session polls it inside `select!`.
    async fn next_raw(&mut self) -> Option<Result<Message, HollaexError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), HollaexError>;
}

/// Opens websocket connections
///
/// Each call yields a fresh connection; connections are never reused.
#[async_trait]
pub trait WsConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn WsConnection>, HollaexError>;
}

/// Tungstenite-based connector
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    venue: String,
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    /// Create a new connector
    ///
    /// # Arguments
    /// * `venue` - Name of the venue for logging/tracing
    /// * `connect_timeout` - Upper bound on the websocket handshake
    pub fn new(venue: String, connect_timeout: Duration) -> Self {
        Self {
            venue,
            connect_timeout,
        }
    }
}

#[async_trait]
impl WsConnector for TungsteniteConnector {
    // The url may carry a signature, keep it out of the span
    #[instrument(skip(self, url), fields(venue = %self.venue))]
    async fn connect(&self, url: &str) -> Result<Box<dyn WsConnection>, HollaexError> {
        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                HollaexError::ConnectionTimeout("WebSocket connection timeout".to_string())
            })?
            .map_err(|e| {
                HollaexError::NetworkError(format!("WebSocket connection failed: {}", e))
            })?;

        let (write, read) = ws_stream.split();
        Ok(Box::new(TungsteniteWs {
            venue: self.venue.clone(),
            write,
            read,
            closed: false,
        }))
    }
}

/// Tungstenite-backed connection
pub struct TungsteniteWs {
    venue: String,
    write: SplitSink<TungsteniteStream, Message>,
    read: SplitStream<TungsteniteStream>,
    closed: bool,
}

#[async_trait]
impl WsConnection for TungsteniteWs {
    #[instrument(skip(self, msg), fields(venue = %self.venue))]
    async fn send_raw(&mut self, msg: Message) -> Result<(), HollaexError> {
        if self.closed {
            return Err(HollaexError::NetworkError(
                "WebSocket not connected".to_string(),
            ));
        }

        self.write.send(msg).await.map_err(|e| {
            self.closed = true;
            HollaexError::NetworkError(format!("Failed to send WebSocket message: {}", e))
        })
    }

    async fn next_raw(&mut self) -> Option<Result<Message, HollaexError>> {
        if self.closed {
            return None;
        }

        match self.read.next().await {
            Some(Ok(message)) => {
                match &message {
                    Message::Ping(data) => {
                        // Answer transport pings here; the frame is still returned
                        // so the session can count it as liveness.
                        let pong = Message::Pong(data.clone());
                        if let Err(e) = self.write.send(pong).await {
                            warn!(venue = %self.venue, "Failed to send pong response: {}", e);
                        }
                    }
                    Message::Close(frame) => {
                        trace!(venue = %self.venue, ?frame, "close frame received");
                        self.closed = true;
                    }
                    _ => {}
                }
                Some(Ok(message))
            }
            Some(Err(e)) => {
                self.closed = true;
                Some(Err(HollaexError::NetworkError(format!(
                    "WebSocket error: {}",
                    e
                ))))
            }
            None => {
                self.closed = true;
                None
            }
        }
    }

    #[instrument(skip(self), fields(venue = %self.venue))]
    async fn close(&mut self) -> Result<(), HollaexError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let _ = self.write.send(Message::Close(None)).await;
        self.write
            .close()
            .await
            .map_err(|e| HollaexError::NetworkError(format!("Failed to close WebSocket: {}", e)))
    }
}
