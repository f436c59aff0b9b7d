//! Shared test fixtures: a mock feature with request/response payloads and
//! a scriptable in-memory transport.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use validator::Validate;

use crate::feature::{Feature, Request, Response};
use crate::message::Call;
use crate::profile::Profile;
use crate::queue::RequestBundle;
use crate::transport::{MessageHandler, Transport, TransportError};

pub const MOCK_FEATURE_NAME: &str = "Mock";

/// Install the env-filter test subscriber. Idempotent, so every test can
/// call it; traces show up on failure via the test writer.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Mock payloads ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MockRequest {
    #[validate(length(min = 1))]
    pub mock_value: String,
}

impl MockRequest {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            mock_value: value.into(),
        }
    }
}

impl Request for MockRequest {
    fn feature_name(&self) -> &'static str {
        MOCK_FEATURE_NAME
    }

    fn to_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn validate_payload(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MockResponse {
    #[validate(length(min = 1))]
    pub mock_value: String,
}

impl MockResponse {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            mock_value: value.into(),
        }
    }
}

impl Response for MockResponse {
    fn feature_name(&self) -> &'static str {
        MOCK_FEATURE_NAME
    }

    fn to_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn validate_payload(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Fixtures ───────────────────────────────────────────────────────

pub fn mock_profile() -> Profile {
    mock_profile_named("mock")
}

pub fn mock_profile_named(name: &str) -> Profile {
    Profile::new(
        name,
        vec![Feature::new::<MockRequest, MockResponse>(MOCK_FEATURE_NAME)],
    )
}

pub fn mock_bundle(unique_id: &str) -> RequestBundle {
    let call = Call {
        unique_id: unique_id.to_string(),
        action: MOCK_FEATURE_NAME.to_string(),
        payload: Arc::new(MockRequest::new("mockValue")),
    };
    let data = call.marshal().expect("mock call marshals");
    RequestBundle { call, data }
}

// ── Mock transport ─────────────────────────────────────────────────

/// In-memory transport: records every write on a channel the test owns and
/// lets the test inject incoming messages through the registered handler.
pub struct MockTransport {
    handler: Mutex<Option<Arc<MessageHandler>>>,
    writes: mpsc::UnboundedSender<Vec<u8>>,
    fail_start: AtomicBool,
    fail_write: AtomicBool,
}

impl MockTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            handler: Mutex::new(None),
            writes: tx,
            fail_start: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
        });
        (transport, rx)
    }

    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::SeqCst);
    }

    /// Deliver bytes to the endpoint as if the peer had sent them.
    pub async fn inject(&self, data: &[u8]) {
        let handler = self
            .handler
            .lock()
            .expect("mock handler lock poisoned")
            .clone()
            .expect("no message handler registered");
        handler(data.to_vec()).await;
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn start(&self, _url: &str) -> Result<(), TransportError> {
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed("startError".into()));
        }
        Ok(())
    }

    async fn write(&self, data: Vec<u8>) -> Result<(), TransportError> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(TransportError::WriteFailed("networkError".into()));
        }
        self.writes.send(data).expect("test write receiver dropped");
        Ok(())
    }

    fn set_message_handler(&self, handler: MessageHandler) {
        let mut slot = self.handler.lock().expect("mock handler lock poisoned");
        *slot = Some(Arc::new(handler));
    }

    async fn stop(&self) {}
}

/// Transport whose first write blocks until released and then fails,
/// simulating a slow connection that errors after partial delivery.
/// Subsequent writes succeed and are recorded like [`MockTransport`].
pub struct StallingTransport {
    handler: Mutex<Option<Arc<MessageHandler>>>,
    writes: mpsc::UnboundedSender<Vec<u8>>,
    stall_entered: mpsc::UnboundedSender<()>,
    release: Notify,
    first_write: AtomicBool,
}

impl StallingTransport {
    pub fn new() -> (
        Arc<Self>,
        mpsc::UnboundedReceiver<Vec<u8>>,
        mpsc::UnboundedReceiver<()>,
    ) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            handler: Mutex::new(None),
            writes: write_tx,
            stall_entered: entered_tx,
            release: Notify::new(),
            first_write: AtomicBool::new(true),
        });
        (transport, write_rx, entered_rx)
    }

    /// Let the stalled first write return its failure.
    pub fn release_stalled_write(&self) {
        self.release.notify_one();
    }

    /// Deliver bytes to the endpoint as if the peer had sent them.
    pub async fn inject(&self, data: &[u8]) {
        let handler = self
            .handler
            .lock()
            .expect("stalling handler lock poisoned")
            .clone()
            .expect("no message handler registered");
        handler(data.to_vec()).await;
    }
}

#[async_trait::async_trait]
impl Transport for StallingTransport {
    async fn start(&self, _url: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn write(&self, data: Vec<u8>) -> Result<(), TransportError> {
        if self.first_write.swap(false, Ordering::SeqCst) {
            let _ = self.stall_entered.send(());
            self.release.notified().await;
            return Err(TransportError::WriteFailed("networkError".into()));
        }
        self.writes.send(data).expect("test write receiver dropped");
        Ok(())
    }

    fn set_message_handler(&self, handler: MessageHandler) {
        let mut slot = self
            .handler
            .lock()
            .expect("stalling handler lock poisoned");
        *slot = Some(Arc::new(handler));
    }

    async fn stop(&self) {}
}
