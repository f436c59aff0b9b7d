//! Endpoint base: profile registry, pending request table and typed
//! message parsing.
//!
//! [`Endpoint`] is the version-agnostic core shared by any OCPP-J party.
//! It owns the registered [`Profile`]s and the [`PendingRequests`] table and
//! turns structurally valid [`RawMessage`]s into fully typed [`Message`]s by
//! resolving payload prototypes through the registry.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, ErrorCode, OcppError};
use crate::feature::{Feature, Request};
use crate::message::{Call, CallError, CallResult, Message, RawMessage};
use crate::pending::PendingRequests;
use crate::profile::Profile;

/// Profile registry plus pending request bookkeeping.
#[derive(Debug, Default)]
pub struct Endpoint {
    profiles: Vec<Profile>,
    pending_requests: PendingRequests,
}

impl Endpoint {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            profiles,
            pending_requests: PendingRequests::new(),
        }
    }

    /// Register an additional profile. Registration happens at construction
    /// time only; the registry is read-only while messages flow.
    pub fn add_profile(&mut self, profile: Profile) {
        debug!(profile = profile.name(), "registering profile");
        self.profiles.push(profile);
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Find the profile that registers `action`.
    ///
    /// Profiles are scanned in registration order, so when two profiles
    /// register the same action the first-registered one wins. Arbitrary or
    /// empty strings simply yield `None`.
    pub fn get_profile(&self, action: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.supports(action))
    }

    /// Find the feature descriptor for `action` (same precedence as
    /// [`Endpoint::get_profile`]).
    pub fn get_profile_for_feature(&self, action: &str) -> Option<&Feature> {
        self.get_profile(action).and_then(|p| p.feature(action))
    }

    // ── Pending request table ──────────────────────────────────

    pub fn add_pending_request(
        &self,
        id: impl Into<String>,
        request: Arc<dyn Request>,
    ) -> Result<(), Error> {
        self.pending_requests.add(id, request)
    }

    pub fn get_pending_request(&self, id: &str) -> Option<Arc<dyn Request>> {
        self.pending_requests.get(id)
    }

    pub fn remove_pending_request(&self, id: &str) -> Option<Arc<dyn Request>> {
        self.pending_requests.remove(id)
    }

    pub fn clear_pending_requests(&self) {
        self.pending_requests.clear()
    }

    pub fn pending_request_count(&self) -> usize {
        self.pending_requests.len()
    }

    // ── Typed parsing ──────────────────────────────────────────

    /// Resolve a raw frame into a typed message.
    ///
    /// Calls resolve their action through the registry; results and errors
    /// resolve through the pending request originally sent under their
    /// unique id. Failures keep the offending id when it can still be
    /// answered with a CallError, and drop it when the error is purely
    /// local (unmatched correlation id).
    pub fn parse_message(&self, raw: RawMessage) -> Result<Message, OcppError> {
        match raw {
            RawMessage::Call {
                unique_id,
                action,
                payload,
            } => self.parse_call(unique_id, action, payload).map(Message::Call),
            RawMessage::CallResult { unique_id, payload } => self
                .parse_call_result(unique_id, payload)
                .map(Message::CallResult),
            RawMessage::CallError {
                unique_id,
                code,
                description,
                details,
            } => {
                // Same correlation rule as results: a miss is a local error.
                if self.pending_requests.get(&unique_id).is_none() {
                    return Err(OcppError::new(
                        ErrorCode::GenericError,
                        format!("no pending request found for error {}", unique_id),
                    ));
                }
                Ok(Message::CallError(CallError {
                    unique_id,
                    code,
                    description,
                    details,
                }))
            }
        }
    }

    fn parse_call(
        &self,
        unique_id: String,
        action: String,
        payload: serde_json::Value,
    ) -> Result<Call, OcppError> {
        let feature = self.get_profile_for_feature(&action).ok_or_else(|| {
            OcppError::with_id(
                unique_id.clone(),
                ErrorCode::NotSupported,
                format!("unsupported action: {}", action),
            )
        })?;
        let request = feature.decode_request(payload).map_err(|e| {
            OcppError::with_id(
                unique_id.clone(),
                ErrorCode::FormationViolation,
                format!("invalid payload for action {}: {}", action, e),
            )
        })?;
        request.validate_payload().map_err(|e| {
            OcppError::with_id(
                unique_id.clone(),
                ErrorCode::OccurenceConstraintViolation,
                format!("payload constraint violated for action {}: {}", action, e),
            )
        })?;
        Ok(Call {
            unique_id,
            action,
            payload: Arc::from(request),
        })
    }

    fn parse_call_result(
        &self,
        unique_id: String,
        payload: serde_json::Value,
    ) -> Result<CallResult, OcppError> {
        // Correlation miss is a local error, never answered to the peer.
        let original = self.pending_requests.get(&unique_id).ok_or_else(|| {
            OcppError::new(
                ErrorCode::GenericError,
                format!("no pending request found for response {}", unique_id),
            )
        })?;
        let action = original.feature_name();
        let feature = self.get_profile_for_feature(action).ok_or_else(|| {
            OcppError::new(
                ErrorCode::InternalError,
                format!("no feature registered for pending action {}", action),
            )
        })?;
        let response = feature.decode_response(payload).map_err(|e| {
            OcppError::with_id(
                unique_id.clone(),
                ErrorCode::FormationViolation,
                format!("invalid response payload for action {}: {}", action, e),
            )
        })?;
        response.validate_payload().map_err(|e| {
            OcppError::with_id(
                unique_id.clone(),
                ErrorCode::OccurenceConstraintViolation,
                format!("response constraint violated for action {}: {}", action, e),
            )
        })?;
        Ok(CallResult {
            unique_id,
            payload: response,
        })
    }
}
