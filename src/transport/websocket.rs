//! WebSocket client transport over `tokio-tungstenite`.
//!
//! OCPP-J travels as text frames over a websocket negotiated with the
//! `ocpp1.6` (or newer) subprotocol. The client splits the socket into a
//! writer task fed by an mpsc channel and a reader task that forwards every
//! Text/Binary frame to the registered message handler, one at a time.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::{MessageHandler, Transport, TransportError};

/// Default OCPP-J subprotocol offered during the websocket handshake.
pub const DEFAULT_SUBPROTOCOL: &str = "ocpp1.6";

struct ActiveConnection {
    sender: mpsc::UnboundedSender<WsMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Client-side websocket transport.
pub struct WebSocketClient {
    subprotocol: Option<String>,
    handler: Mutex<Option<Arc<MessageHandler>>>,
    connection: Mutex<Option<ActiveConnection>>,
}

impl WebSocketClient {
    pub fn new() -> Self {
        Self {
            subprotocol: Some(DEFAULT_SUBPROTOCOL.to_string()),
            handler: Mutex::new(None),
            connection: Mutex::new(None),
        }
    }

    /// Override the subprotocol offered on connect (`None` offers none).
    pub fn with_subprotocol(mut self, subprotocol: Option<String>) -> Self {
        self.subprotocol = subprotocol;
        self
    }
}

impl Default for WebSocketClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketClient {
    async fn start(&self, url: &str) -> Result<(), TransportError> {
        let handler = self
            .handler
            .lock()
            .expect("websocket handler lock poisoned")
            .clone()
            .ok_or_else(|| {
                TransportError::ConnectFailed("no message handler registered".into())
            })?;

        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        if let Some(subprotocol) = &self.subprotocol {
            let value = HeaderValue::from_str(subprotocol)
                .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
            request
                .headers_mut()
                .insert("Sec-WebSocket-Protocol", value);
        }

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        info!(url, status = %response.status(), "websocket connected");

        let (mut sink, mut source) = stream.split();
        let (sender, mut outgoing) = mpsc::unbounded_channel::<WsMessage>();

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing.recv().await {
                if let Err(e) = sink.send(message).await {
                    error!("websocket write failed: {}", e);
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => handler(text.into_bytes()).await,
                    Ok(WsMessage::Binary(data)) => handler(data).await,
                    Ok(WsMessage::Close(_)) => {
                        debug!("websocket closed by peer");
                        break;
                    }
                    Ok(_) => {} // ping/pong handled by tungstenite
                    Err(e) => {
                        warn!("websocket read error: {}", e);
                        break;
                    }
                }
            }
        });

        let mut connection = self
            .connection
            .lock()
            .expect("websocket connection lock poisoned");
        *connection = Some(ActiveConnection {
            sender,
            reader,
            writer,
        });
        Ok(())
    }

    async fn write(&self, data: Vec<u8>) -> Result<(), TransportError> {
        let message = match String::from_utf8(data) {
            Ok(text) => WsMessage::Text(text),
            Err(raw) => WsMessage::Binary(raw.into_bytes()),
        };
        let connection = self
            .connection
            .lock()
            .expect("websocket connection lock poisoned");
        let active = connection.as_ref().ok_or(TransportError::NotConnected)?;
        active
            .sender
            .send(message)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    fn set_message_handler(&self, handler: MessageHandler) {
        let mut slot = self
            .handler
            .lock()
            .expect("websocket handler lock poisoned");
        *slot = Some(Arc::new(handler));
    }

    async fn stop(&self) {
        let active = self
            .connection
            .lock()
            .expect("websocket connection lock poisoned")
            .take();
        if let Some(active) = active {
            let _ = active.sender.send(WsMessage::Close(None));
            // Give the writer a chance to flush the close frame.
            drop(active.sender);
            let _ = active.writer.await;
            active.reader.abort();
            info!("websocket disconnected");
        }
    }
}
