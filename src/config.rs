//! Endpoint configuration.

/// Construction-time configuration for a client endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum number of outgoing requests held by the request queue,
    /// including the one currently in flight.
    pub request_queue_capacity: usize,
}

impl ClientConfig {
    pub fn new(request_queue_capacity: usize) -> Self {
        Self {
            request_queue_capacity,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_queue_capacity: 10,
        }
    }
}
