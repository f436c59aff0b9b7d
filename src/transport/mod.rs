//! Transport abstraction consumed by the dispatcher.
//!
//! The core never touches sockets directly. It drives a [`Transport`] through
//! `start` / `write` / `stop` and receives incoming bytes through the
//! handler registered with [`Transport::set_message_handler`]. The bundled
//! [`websocket::WebSocketClient`] is the production implementation; tests use
//! a mock.

pub mod websocket;

use futures_util::future::BoxFuture;
use thiserror::Error;

pub use websocket::WebSocketClient;

/// Callback invoked by the transport's read path for every incoming message.
///
/// The transport delivers messages one at a time per connection and awaits
/// the returned future before reading the next one, so the core sees a
/// serialized stream.
pub type MessageHandler = Box<dyn Fn(Vec<u8>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Errors surfaced by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    #[error("transport is not connected")]
    NotConnected,

    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// A persistent bidirectional connection capability.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the remote endpoint. An error leaves the transport
    /// stopped.
    async fn start(&self, url: &str) -> Result<(), TransportError>;

    /// Write one message. Fails when not connected or when the underlying
    /// connection refuses the frame.
    async fn write(&self, data: Vec<u8>) -> Result<(), TransportError>;

    /// Register the callback that receives incoming messages. Must be set
    /// before `start`.
    fn set_message_handler(&self, handler: MessageHandler);

    /// Tear the connection down. Idempotent.
    async fn stop(&self);
}
