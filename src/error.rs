//! Error taxonomy for the OCPP-J message layer.
//!
//! Two layers of errors live here:
//!
//! - [`ErrorCode`] — the fixed, case-sensitive vocabulary of CallError codes
//!   defined by the protocol. Sending any other string is an encode-time
//!   error; receiving one is a decode-time error.
//! - [`OcppError`] — a wire-level error with an optional recoverable message
//!   id, used both for decode failures (answered with a CallError when the id
//!   could be salvaged) and for CallError messages delivered to the error
//!   handler.
//! - [`Error`] — everything the public API can return.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::TransportError;

// ── Error codes ────────────────────────────────────────────────────

/// CallError codes recognized on the wire.
///
/// The vocabulary is closed: extend only by adding new members. Note the
/// protocol's historical spelling of `OccurenceConstraintViolation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NotImplemented,
    NotSupported,
    InternalError,
    ProtocolError,
    SecurityError,
    FormationViolation,
    PropertyConstraintViolation,
    OccurenceConstraintViolation,
    TypeConstraintViolation,
    GenericError,
    MessageTypeNotSupported,
    RpcFrameworkError,
}

impl ErrorCode {
    /// The exact string sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::NotSupported => "NotSupported",
            Self::InternalError => "InternalError",
            Self::ProtocolError => "ProtocolError",
            Self::SecurityError => "SecurityError",
            Self::FormationViolation => "FormationViolation",
            Self::PropertyConstraintViolation => "PropertyConstraintViolation",
            Self::OccurenceConstraintViolation => "OccurenceConstraintViolation",
            Self::TypeConstraintViolation => "TypeConstraintViolation",
            Self::GenericError => "GenericError",
            Self::MessageTypeNotSupported => "MessageTypeNotSupported",
            Self::RpcFrameworkError => "RpcFrameworkError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not match any recognized error code.
#[derive(Debug, Clone, Error)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Case-sensitive by contract.
        match s {
            "NotImplemented" => Ok(Self::NotImplemented),
            "NotSupported" => Ok(Self::NotSupported),
            "InternalError" => Ok(Self::InternalError),
            "ProtocolError" => Ok(Self::ProtocolError),
            "SecurityError" => Ok(Self::SecurityError),
            "FormationViolation" => Ok(Self::FormationViolation),
            "PropertyConstraintViolation" => Ok(Self::PropertyConstraintViolation),
            "OccurenceConstraintViolation" => Ok(Self::OccurenceConstraintViolation),
            "TypeConstraintViolation" => Ok(Self::TypeConstraintViolation),
            "GenericError" => Ok(Self::GenericError),
            "MessageTypeNotSupported" => Ok(Self::MessageTypeNotSupported),
            "RpcFrameworkError" => Ok(Self::RpcFrameworkError),
            other => Err(UnknownErrorCode(other.to_string())),
        }
    }
}

// ── Wire-level protocol error ──────────────────────────────────────

/// A protocol-level error tied to a (possibly unknown) message id.
///
/// Produced by the codec when decoding fails, and by the dispatcher when a
/// CallError arrives for a pending request. `message_id` is `Some` whenever
/// the offending frame carried a salvageable unique id, which lets the
/// dispatcher answer the peer with a CallError instead of dropping silently.
#[derive(Debug, Clone, Error)]
#[error("{code}: {description}")]
pub struct OcppError {
    pub message_id: Option<String>,
    pub code: ErrorCode,
    pub description: String,
}

impl OcppError {
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            message_id: None,
            code,
            description: description.into(),
        }
    }

    pub fn with_id(
        message_id: impl Into<String>,
        code: ErrorCode,
        description: impl Into<String>,
    ) -> Self {
        Self {
            message_id: Some(message_id.into()),
            code,
            description: description.into(),
        }
    }
}

// ── API surface errors ─────────────────────────────────────────────

/// Everything the endpoint's public operations can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// `send_request` called before `start` (or after `stop`).
    #[error("ocppj client is not started, couldn't send request")]
    NotStarted,

    /// The outgoing request queue reached its configured capacity.
    #[error("request queue is full, cannot push new element")]
    QueueFull,

    /// A pending request with the same unique id already exists.
    #[error("request {0} is already pending")]
    DuplicatePendingRequest(String),

    /// The action is not registered in any profile of this endpoint.
    #[error("couldn't create Call for unsupported action {0}")]
    UnsupportedAction(String),

    /// Payload failed feature-specific validation.
    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// An error code string outside the recognized vocabulary.
    #[error(transparent)]
    UnknownErrorCode(#[from] UnknownErrorCode),

    /// Decode failure or received protocol error.
    #[error(transparent)]
    Ocpp(#[from] OcppError),

    /// Payload could not be serialized to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport refused or failed the operation.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
