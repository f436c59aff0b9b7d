//! Bounded FIFO of outgoing requests that were accepted but not yet
//! fully acknowledged.
//!
//! Only the head element is ever in flight; everything behind it is queued
//! but unsent. The dispatcher pops the head strictly after the matching
//! CallResult/CallError arrived (or the write failed), which is what keeps
//! response correlation trivial without windowed bookkeeping.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::message::Call;

/// A queued request together with its bytes.
///
/// The wire encoding is computed once at enqueue time, so a retransmission
/// never re-derives it from mutable request state.
#[derive(Debug, Clone)]
pub struct RequestBundle {
    pub call: Call,
    pub data: Vec<u8>,
}

/// Fixed-capacity FIFO shared between request producers and the drain loop.
#[derive(Debug)]
pub struct RequestQueue {
    inner: Mutex<VecDeque<Arc<RequestBundle>>>,
    capacity: usize,
}

impl RequestQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a bundle, failing when the queue already holds `capacity`
    /// elements. Concurrent pushes serialize on the internal lock and are
    /// never dropped or reordered against each other.
    pub fn push(&self, bundle: RequestBundle) -> Result<(), Error> {
        let mut queue = self.inner.lock().expect("request queue lock poisoned");
        if queue.len() >= self.capacity {
            return Err(Error::QueueFull);
        }
        queue.push_back(Arc::new(bundle));
        Ok(())
    }

    /// Inspect the head without consuming it.
    pub fn peek(&self) -> Option<Arc<RequestBundle>> {
        self.inner
            .lock()
            .expect("request queue lock poisoned")
            .front()
            .cloned()
    }

    /// Remove and return the head.
    pub fn pop(&self) -> Option<Arc<RequestBundle>> {
        self.inner
            .lock()
            .expect("request queue lock poisoned")
            .pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .expect("request queue lock poisoned")
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("request queue lock poisoned").len()
    }

    /// Drop all queued elements (connection stop).
    pub fn clear(&self) {
        self.inner
            .lock()
            .expect("request queue lock poisoned")
            .clear();
    }
}
