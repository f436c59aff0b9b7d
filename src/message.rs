//! OCPP-J wire-message codec.
//!
//! The framing is a JSON array whose first element is a small integer
//! discriminator:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<description>", {<details>}]`
//!
//! [`parse_raw_message`] is total over arbitrary byte input: every malformed
//! frame becomes an [`OcppError`], never a panic. It keeps payloads as
//! [`serde_json::Value`]; typed decoding against a feature's prototypes
//! happens in [`Endpoint`](crate::endpoint::Endpoint), which owns the
//! profile registry.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ErrorCode, OcppError};
use crate::feature::{Request, Response};

// ── Message-type discriminators ────────────────────────────────────

pub const MESSAGE_TYPE_CALL: u64 = 2;
pub const MESSAGE_TYPE_CALL_RESULT: u64 = 3;
pub const MESSAGE_TYPE_CALL_ERROR: u64 = 4;

// ── Raw (untyped) frames ───────────────────────────────────────────

/// A structurally validated frame whose payload is still raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    CallResult {
        unique_id: String,
        payload: Value,
    },
    CallError {
        unique_id: String,
        code: ErrorCode,
        description: String,
        details: Option<Value>,
    },
}

impl RawMessage {
    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call { unique_id, .. }
            | Self::CallResult { unique_id, .. }
            | Self::CallError { unique_id, .. } => unique_id,
        }
    }
}

/// Parse raw bytes into a structurally valid [`RawMessage`].
///
/// This is the fuzz-tested boundary: any byte sequence either yields a frame
/// or a typed [`OcppError`]. Whenever the second array element is a
/// non-empty string the error carries it as `message_id`, so the dispatcher
/// can answer the peer with a CallError.
pub fn parse_raw_message(data: &[u8]) -> Result<RawMessage, OcppError> {
    let fields: Vec<Value> = serde_json::from_slice(data).map_err(|e| {
        OcppError::new(
            ErrorCode::FormationViolation,
            format!("invalid JSON frame: {}", e),
        )
    })?;

    // Salvage the unique id early so later failures stay answerable.
    let message_id = fields
        .get(1)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let fail = |code: ErrorCode, description: String| OcppError {
        message_id: message_id.clone(),
        code,
        description,
    };

    if fields.is_empty() {
        return Err(fail(
            ErrorCode::FormationViolation,
            "empty message array".into(),
        ));
    }

    let type_id = fields[0].as_u64().ok_or_else(|| {
        fail(
            ErrorCode::MessageTypeNotSupported,
            "message type is not an integer".into(),
        )
    })?;

    let unique_id = message_id.clone().ok_or_else(|| {
        fail(
            ErrorCode::FormationViolation,
            "uniqueId must be a non-empty string".into(),
        )
    })?;

    match type_id {
        MESSAGE_TYPE_CALL => {
            if fields.len() != 4 {
                return Err(fail(
                    ErrorCode::FormationViolation,
                    format!("Call frame must have 4 fields, got {}", fields.len()),
                ));
            }
            let action = fields[2]
                .as_str()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    fail(
                        ErrorCode::FormationViolation,
                        "action must be a non-empty string".into(),
                    )
                })?
                .to_string();
            Ok(RawMessage::Call {
                unique_id,
                action,
                payload: fields[3].clone(),
            })
        }
        MESSAGE_TYPE_CALL_RESULT => {
            if fields.len() != 3 {
                return Err(fail(
                    ErrorCode::FormationViolation,
                    format!("CallResult frame must have 3 fields, got {}", fields.len()),
                ));
            }
            Ok(RawMessage::CallResult {
                unique_id,
                payload: fields[2].clone(),
            })
        }
        MESSAGE_TYPE_CALL_ERROR => {
            if fields.len() < 4 || fields.len() > 5 {
                return Err(fail(
                    ErrorCode::FormationViolation,
                    format!(
                        "CallError frame must have 4 or 5 fields, got {}",
                        fields.len()
                    ),
                ));
            }
            let code_str = fields[2].as_str().ok_or_else(|| {
                fail(
                    ErrorCode::FormationViolation,
                    "errorCode must be a string".into(),
                )
            })?;
            let code: ErrorCode = code_str.parse().map_err(|_| {
                fail(
                    ErrorCode::PropertyConstraintViolation,
                    format!("unrecognized error code: {}", code_str),
                )
            })?;
            let description = fields[3]
                .as_str()
                .ok_or_else(|| {
                    fail(
                        ErrorCode::FormationViolation,
                        "errorDescription must be a string".into(),
                    )
                })?
                .to_string();
            Ok(RawMessage::CallError {
                unique_id,
                code,
                description,
                details: fields.get(4).filter(|d| !d.is_null()).cloned(),
            })
        }
        other => Err(fail(
            ErrorCode::MessageTypeNotSupported,
            format!("unsupported message type: {}", other),
        )),
    }
}

// ── Typed messages ─────────────────────────────────────────────────

/// An outgoing or incoming request with a decoded payload.
///
/// The payload is shared: the same request is owned by the pending request
/// table until the reply arrives.
#[derive(Debug, Clone)]
pub struct Call {
    pub unique_id: String,
    pub action: String,
    pub payload: Arc<dyn Request>,
}

impl Call {
    /// Canonical `[2, uniqueId, action, payload]` encoding.
    pub fn marshal(&self) -> Result<Vec<u8>, serde_json::Error> {
        let arr = Value::Array(vec![
            Value::from(MESSAGE_TYPE_CALL),
            Value::String(self.unique_id.clone()),
            Value::String(self.action.clone()),
            self.payload.to_payload()?,
        ]);
        serde_json::to_vec(&arr)
    }
}

/// A successful reply correlated to a Call by unique id.
#[derive(Debug)]
pub struct CallResult {
    pub unique_id: String,
    pub payload: Box<dyn Response>,
}

impl CallResult {
    /// Canonical `[3, uniqueId, payload]` encoding.
    pub fn marshal(&self) -> Result<Vec<u8>, serde_json::Error> {
        let arr = Value::Array(vec![
            Value::from(MESSAGE_TYPE_CALL_RESULT),
            Value::String(self.unique_id.clone()),
            self.payload.to_payload()?,
        ]);
        serde_json::to_vec(&arr)
    }
}

/// A failure reply correlated to a Call by unique id.
#[derive(Debug, Clone, PartialEq)]
pub struct CallError {
    pub unique_id: String,
    pub code: ErrorCode,
    pub description: String,
    pub details: Option<Value>,
}

impl CallError {
    /// Canonical `[4, uniqueId, errorCode, description, details]` encoding.
    /// The details slot is omitted entirely when absent, so parse∘marshal is
    /// the identity on valid messages.
    pub fn marshal(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut arr = vec![
            Value::from(MESSAGE_TYPE_CALL_ERROR),
            Value::String(self.unique_id.clone()),
            Value::String(self.code.as_str().to_string()),
            Value::String(self.description.clone()),
        ];
        if let Some(details) = &self.details {
            arr.push(details.clone());
        }
        serde_json::to_vec(&Value::Array(arr))
    }
}

/// A fully decoded wire message.
#[derive(Debug)]
pub enum Message {
    Call(Call),
    CallResult(CallResult),
    CallError(CallError),
}

impl Message {
    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call(m) => &m.unique_id,
            Self::CallResult(m) => &m.unique_id,
            Self::CallError(m) => &m.unique_id,
        }
    }

    pub fn marshal(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Call(m) => m.marshal(),
            Self::CallResult(m) => m.marshal(),
            Self::CallError(m) => m.marshal(),
        }
    }
}
