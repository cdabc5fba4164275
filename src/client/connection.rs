//! WebSocket client for connecting to a race server

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::network::protocol::{ClientMessage, ServerMessage};

/// Connection errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed")]
    Closed,
}

/// Open connection with background reader and writer tasks.
pub struct ServerConnection {
    outgoing: mpsc::Sender<ClientMessage>,
    incoming: mpsc::Receiver<ServerMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ServerConnection {
    /// Connect to `url` (e.g. `ws://127.0.0.1:2567`).
    pub async fn connect(url: &str) -> Result<Self, ConnectionError> {
        info!("Connecting to {}...", url);
        let (ws_stream, _) = connect_async(url).await?;
        info!("WebSocket connected");

        let (mut write, mut read) = ws_stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<ClientMessage>(100);
        let (incoming_tx, incoming_rx) = mpsc::channel::<ServerMessage>(100);

        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match ServerMessage::from_json(&text) {
                        Ok(message) => {
                            debug!(kind = message.kind(), "received");
                            if incoming_tx.send(message).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse server message: {} - {}", e, text);
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("Server closed connection");
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            debug!("Reader task ended");
        });

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    error!("Failed to send message: {}", e);
                    break;
                }
            }
            debug!("Writer task ended");
        });

        Ok(Self {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
            reader,
            writer,
        })
    }

    /// Queue a message for the server.
    pub async fn send(&self, message: ClientMessage) -> Result<(), ConnectionError> {
        self.outgoing.send(message).await.map_err(|_| ConnectionError::Closed)
    }

    /// Next server message, `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.incoming.recv().await
    }

    /// Next server message if one is already waiting.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        self.incoming.try_recv().ok()
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}
