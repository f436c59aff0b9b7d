//! Pending request table: unique id → the request awaiting its reply.
//!
//! Only requests *this* endpoint originated are tracked. Entries are removed
//! when a matching CallResult/CallError is processed, when the send fails
//! locally, or when the connection stops. There is no timer-based expiry:
//! timeout policy belongs to the layer above, this table only guarantees
//! that late replies to an evicted id can be rejected.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Error;
use crate::feature::Request;

/// Thread-safe map of in-flight requests, keyed by unique message id.
#[derive(Debug, Default)]
pub struct PendingRequests {
    requests: DashMap<String, Arc<dyn Request>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
        }
    }

    /// Track a request under `id`. Exactly one entry may exist per id;
    /// a duplicate add is refused and leaves the existing entry untouched.
    pub fn add(&self, id: impl Into<String>, request: Arc<dyn Request>) -> Result<(), Error> {
        let id = id.into();
        match self.requests.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(Error::DuplicatePendingRequest(id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(request);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Request>> {
        self.requests.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<dyn Request>> {
        self.requests.remove(id).map(|(_, request)| request)
    }

    /// Discard all entries (connection stop).
    pub fn clear(&self) {
        self.requests.clear();
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
