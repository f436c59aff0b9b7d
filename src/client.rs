//! Client endpoint: composes codec, registry, pending table, request queue
//! and transport into the OCPP-J dispatcher.
//!
//! Outgoing requests are serialized through a bounded queue with strict
//! one-in-flight ordering: the drain task writes the head bundle and leaves
//! it queued until the matching CallResult/CallError arrives (or the write
//! fails), which keeps response correlation unambiguous without windowed
//! bookkeeping.
//!
//! Note the deliberate asymmetry inherited from the protocol stack this
//! mirrors: a network write failure for a *request* is not surfaced to the
//! `send_request` caller (the call already returned success); it is logged
//! and the pending entry is evicted so late replies are rejected. A write
//! failure for a *response* or *error* is returned to the caller unchanged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::{Error, OcppError};
use crate::feature::{Feature, Request, Response};
use crate::message::{parse_raw_message, Call, CallError, CallResult, Message};
use crate::profile::Profile;
use crate::queue::{RequestBundle, RequestQueue};
use crate::transport::Transport;

/// Invoked for every incoming Call: `(request, request_id, action)`.
pub type RequestHandler = Box<dyn Fn(Arc<dyn Request>, &str, &str) + Send + Sync>;
/// Invoked for every CallResult matching a pending request: `(response, request_id)`.
pub type ResponseHandler = Box<dyn Fn(Box<dyn Response>, &str) + Send + Sync>;
/// Invoked for every CallError matching a pending request.
pub type ErrorHandler = Box<dyn Fn(OcppError, Option<Value>) + Send + Sync>;

type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

struct ClientInner {
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    queue: RequestQueue,
    /// True while the head bundle has been written but not yet resolved.
    in_flight: Mutex<bool>,
    started: AtomicBool,
    drain_tx: Mutex<Option<mpsc::UnboundedSender<()>>>,
    request_handler: RwLock<Option<RequestHandler>>,
    response_handler: RwLock<Option<ResponseHandler>>,
    error_handler: RwLock<Option<ErrorHandler>>,
    unique_id_generator: RwLock<IdGenerator>,
}

/// OCPP-J client endpoint over a single connection.
///
/// Cheap to clone; clones share the same connection state.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        profiles: Vec<Profile>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                endpoint: Endpoint::new(profiles),
                transport,
                queue: RequestQueue::new(config.request_queue_capacity),
                in_flight: Mutex::new(false),
                started: AtomicBool::new(false),
                drain_tx: Mutex::new(None),
                request_handler: RwLock::new(None),
                response_handler: RwLock::new(None),
                error_handler: RwLock::new(None),
                unique_id_generator: RwLock::new(Box::new(|| Uuid::new_v4().to_string())),
            }),
        }
    }

    // ── Handlers & hooks ───────────────────────────────────────

    pub fn set_request_handler(
        &self,
        handler: impl Fn(Arc<dyn Request>, &str, &str) + Send + Sync + 'static,
    ) {
        *self.inner.request_handler.write().expect("handler lock poisoned") =
            Some(Box::new(handler));
    }

    pub fn set_response_handler(
        &self,
        handler: impl Fn(Box<dyn Response>, &str) + Send + Sync + 'static,
    ) {
        *self.inner.response_handler.write().expect("handler lock poisoned") =
            Some(Box::new(handler));
    }

    pub fn set_error_handler(
        &self,
        handler: impl Fn(OcppError, Option<Value>) + Send + Sync + 'static,
    ) {
        *self.inner.error_handler.write().expect("handler lock poisoned") =
            Some(Box::new(handler));
    }

    /// Replace the unique-id source (uuid v4 by default).
    pub fn set_unique_id_generator(&self, generator: impl Fn() -> String + Send + Sync + 'static) {
        *self
            .inner
            .unique_id_generator
            .write()
            .expect("generator lock poisoned") = Box::new(generator);
    }

    // ── Introspection ──────────────────────────────────────────

    pub fn get_profile(&self, action: &str) -> Option<&Profile> {
        self.inner.endpoint.get_profile(action)
    }

    pub fn get_profile_for_feature(&self, action: &str) -> Option<&Feature> {
        self.inner.endpoint.get_profile_for_feature(action)
    }

    pub fn get_pending_request(&self, id: &str) -> Option<Arc<dyn Request>> {
        self.inner.endpoint.get_pending_request(id)
    }

    /// Track a request manually. Recovery/test hook; normal traffic goes
    /// through [`Client::send_request`].
    pub fn add_pending_request(
        &self,
        id: &str,
        request: impl Request + 'static,
    ) -> Result<(), Error> {
        self.inner.endpoint.add_pending_request(id, Arc::new(request))
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Connect to `url` and begin dispatching. A transport failure is
    /// returned as-is and leaves the client stopped.
    pub async fn start(&self, url: &str) -> Result<(), Error> {
        let handler_inner = Arc::clone(&self.inner);
        self.inner
            .transport
            .set_message_handler(Box::new(move |data| {
                let inner = Arc::clone(&handler_inner);
                Box::pin(async move { inner.handle_incoming(data).await })
            }));

        self.inner.transport.start(url).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.drain_tx.lock().expect("drain lock poisoned") = Some(tx);
        self.inner.started.store(true, Ordering::SeqCst);

        let drain_inner = Arc::clone(&self.inner);
        tokio::spawn(async move { drain_inner.drain_loop(rx).await });

        info!(url, "ocppj client started");
        Ok(())
    }

    /// Disconnect and abandon all queued and pending requests.
    pub async fn stop(&self) {
        self.inner.started.store(false, Ordering::SeqCst);
        // Dropping the sender ends the drain task.
        *self.inner.drain_tx.lock().expect("drain lock poisoned") = None;
        self.inner.transport.stop().await;
        self.inner.queue.clear();
        self.inner.endpoint.clear_pending_requests();
        *self.inner.in_flight.lock().expect("in-flight lock poisoned") = false;
        info!("ocppj client stopped");
    }

    // ── Outgoing messages ──────────────────────────────────────

    /// Validate and enqueue a request. Returns as soon as the request is
    /// accepted; the actual write happens asynchronously on the drain task.
    pub fn send_request(&self, request: impl Request + 'static) -> Result<(), Error> {
        let inner = &self.inner;
        if !inner.started.load(Ordering::SeqCst) {
            return Err(Error::NotStarted);
        }
        let call = self.create_call(Arc::new(request))?;
        let unique_id = call.unique_id.clone();
        let request = Arc::clone(&call.payload);
        let data = call.marshal()?;

        // The pending entry is added before the bundle is even queued for
        // write, so a reply can never race an absent entry.
        inner.endpoint.add_pending_request(unique_id.as_str(), request)?;
        if let Err(e) = inner.queue.push(RequestBundle { call, data }) {
            inner.endpoint.remove_pending_request(&unique_id);
            return Err(e);
        }
        debug!(unique_id = %unique_id, "request enqueued");
        inner.signal_drain();
        Ok(())
    }

    /// Build a validated Call with a fresh unique id.
    pub fn create_call(&self, request: Arc<dyn Request>) -> Result<Call, Error> {
        request.validate_payload()?;
        let action = request.feature_name();
        if self.inner.endpoint.get_profile_for_feature(action).is_none() {
            return Err(Error::UnsupportedAction(action.to_string()));
        }
        let unique_id = (self
            .inner
            .unique_id_generator
            .read()
            .expect("generator lock poisoned"))();
        Ok(Call {
            unique_id,
            action: action.to_string(),
            payload: request,
        })
    }

    /// Build a validated CallResult for a received request id.
    pub fn create_call_result(
        &self,
        unique_id: &str,
        response: Box<dyn Response>,
    ) -> Result<CallResult, Error> {
        response.validate_payload()?;
        let action = response.feature_name();
        if self.inner.endpoint.get_profile_for_feature(action).is_none() {
            return Err(Error::UnsupportedAction(action.to_string()));
        }
        Ok(CallResult {
            unique_id: unique_id.to_string(),
            payload: response,
        })
    }

    /// Build a CallError, validating `code` against the recognized
    /// vocabulary.
    pub fn create_call_error(
        &self,
        unique_id: &str,
        code: &str,
        description: &str,
        details: Option<Value>,
    ) -> Result<CallError, Error> {
        Ok(CallError {
            unique_id: unique_id.to_string(),
            code: code.parse()?,
            description: description.to_string(),
            details,
        })
    }

    /// Reply to a received Call. The endpoint keeps no record of incoming
    /// requests, so any id is accepted; a transport failure is returned to
    /// the caller unchanged.
    pub async fn send_response(
        &self,
        unique_id: &str,
        response: impl Response + 'static,
    ) -> Result<(), Error> {
        let result = self.create_call_result(unique_id, Box::new(response))?;
        let data = result.marshal()?;
        self.inner.transport.write(data).await?;
        debug!(unique_id, "response sent");
        Ok(())
    }

    /// Reply to a received Call with a CallError. Nothing is written when
    /// `code` is not a recognized error code.
    pub async fn send_error(
        &self,
        unique_id: &str,
        code: &str,
        description: &str,
        details: Option<Value>,
    ) -> Result<(), Error> {
        let error = self.create_call_error(unique_id, code, description, details)?;
        let data = error.marshal()?;
        self.inner.transport.write(data).await?;
        debug!(unique_id, code, "call error sent");
        Ok(())
    }
}

impl ClientInner {
    fn signal_drain(&self) {
        if let Some(tx) = &*self.drain_tx.lock().expect("drain lock poisoned") {
            let _ = tx.send(());
        }
    }

    /// Single writer: transmits the head bundle when nothing is in flight.
    /// The head stays queued until its reply arrives; see
    /// [`ClientInner::complete_pending_request`].
    async fn drain_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<()>) {
        while rx.recv().await.is_some() {
            let bundle = {
                let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
                if *in_flight {
                    None
                } else {
                    match self.queue.peek() {
                        Some(bundle) => {
                            *in_flight = true;
                            Some(bundle)
                        }
                        None => None,
                    }
                }
            };
            let Some(bundle) = bundle else { continue };

            debug!(
                unique_id = %bundle.call.unique_id,
                action = %bundle.call.action,
                "transmitting request"
            );
            if let Err(e) = self.transport.write(bundle.data.clone()).await {
                // Swallowed on purpose: the send_request caller already got
                // success. Evicting the pending entry makes late replies to
                // this id rejectable.
                error!(
                    unique_id = %bundle.call.unique_id,
                    "request transmission failed, discarding: {}", e
                );
                self.endpoint.remove_pending_request(&bundle.call.unique_id);
                {
                    let mut in_flight =
                        self.in_flight.lock().expect("in-flight lock poisoned");
                    // A reply may have resolved this id while the write was
                    // still failing; pop only when the failed bundle is
                    // still the head.
                    if let Some(head) = self.queue.peek() {
                        if head.call.unique_id == bundle.call.unique_id {
                            self.queue.pop();
                        }
                    }
                    *in_flight = false;
                }
                self.signal_drain();
            }
        }
    }

    /// Entry point for the transport's read path.
    async fn handle_incoming(&self, data: Vec<u8>) {
        let raw = match parse_raw_message(&data) {
            Ok(raw) => raw,
            Err(e) => return self.report_decode_error(e).await,
        };
        let message = match self.endpoint.parse_message(raw) {
            Ok(message) => message,
            Err(e) => return self.report_decode_error(e).await,
        };

        match message {
            Message::Call(call) => {
                debug!(unique_id = %call.unique_id, action = %call.action, "call received");
                let guard = self.request_handler.read().expect("handler lock poisoned");
                match guard.as_ref() {
                    Some(handler) => handler(Arc::clone(&call.payload), &call.unique_id, &call.action),
                    None => warn!(
                        action = %call.action,
                        "no request handler registered, dropping incoming call"
                    ),
                }
            }
            Message::CallResult(result) => {
                debug!(unique_id = %result.unique_id, "call result received");
                self.complete_pending_request(&result.unique_id);
                let guard = self.response_handler.read().expect("handler lock poisoned");
                if let Some(handler) = guard.as_ref() {
                    handler(result.payload, &result.unique_id);
                }
            }
            Message::CallError(call_error) => {
                debug!(unique_id = %call_error.unique_id, code = %call_error.code, "call error received");
                self.complete_pending_request(&call_error.unique_id);
                let guard = self.error_handler.read().expect("handler lock poisoned");
                if let Some(handler) = guard.as_ref() {
                    let error = OcppError::with_id(
                        call_error.unique_id.clone(),
                        call_error.code,
                        call_error.description.clone(),
                    );
                    handler(error, call_error.details);
                }
            }
        }
    }

    /// Answer a decode failure with a CallError when the peer's message id
    /// could be salvaged; otherwise only report locally.
    async fn report_decode_error(&self, error: OcppError) {
        match &error.message_id {
            Some(id) => {
                warn!(message_id = %id, "received malformed message: {}", error);
                let reply = CallError {
                    unique_id: id.clone(),
                    code: error.code,
                    description: error.description.clone(),
                    details: None,
                };
                match reply.marshal() {
                    Ok(data) => {
                        if let Err(e) = self.transport.write(data).await {
                            error!("failed to send CallError reply: {}", e);
                        }
                    }
                    Err(e) => error!("failed to marshal CallError reply: {}", e),
                }
            }
            None => warn!("discarding malformed message: {}", error),
        }
    }

    /// Resolve the pending entry for `unique_id` and, when it is the queue
    /// head, pop it and wake the drain task for the next request.
    fn complete_pending_request(&self, unique_id: &str) {
        self.endpoint.remove_pending_request(unique_id);
        {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            if let Some(head) = self.queue.peek() {
                if head.call.unique_id == unique_id {
                    self.queue.pop();
                    *in_flight = false;
                }
            }
        }
        self.signal_drain();
    }
}
