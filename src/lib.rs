//! # OCPP-J message layer
//!
//! Version-agnostic implementation of the OCPP-J framing used between a
//! charging station and a central system: Call / CallResult / CallError
//! triples over a persistent bidirectional connection, with a bounded
//! outgoing-request queue and strict one-in-flight correlation.
//!
//! ## Architecture
//!
//! - **message**: wire codec for the three frame shapes; total over
//!   arbitrary input
//! - **feature** / **profile**: action registry resolving names to typed
//!   payload prototypes
//! - **pending**: correlation table for requests awaiting a reply
//! - **queue**: bounded FIFO driving serialized dispatch
//! - **client**: the dispatcher composing everything with a transport
//! - **transport**: connection capability trait plus the bundled
//!   `tokio-tungstenite` websocket client
//!
//! Concrete feature payloads (BootNotification, Authorize, ...) are not
//! defined here; callers register them as [`Feature`]s grouped in
//! [`Profile`]s.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod feature;
pub mod message;
pub mod pending;
pub mod profile;
pub mod queue;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::{Client, ErrorHandler, RequestHandler, ResponseHandler};
pub use config::ClientConfig;
pub use endpoint::Endpoint;
pub use error::{Error, ErrorCode, OcppError};
pub use feature::{Feature, Request, Response};
pub use message::{
    parse_raw_message, Call, CallError, CallResult, Message, RawMessage,
};
pub use profile::Profile;
pub use queue::{RequestBundle, RequestQueue};
pub use transport::{MessageHandler, Transport, TransportError, WebSocketClient};
