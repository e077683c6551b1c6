//! Request-scoped context threaded explicitly through resolver, driver and streamer.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one inbound request in logs and events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: u64,
    /// Client address or other caller label, if known.
    pub client: Option<String>,
}

impl RequestContext {
    /// New context with a process-unique request id.
    pub fn new(client: Option<String>) -> Self {
        Self {
            request_id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            client,
        }
    }

    /// Tracing span carrying the request id; enter it around work for this request.
    pub fn span(&self, operation: &'static str) -> tracing::Span {
        tracing::info_span!(
            "request",
            id = self.request_id,
            op = operation,
            client = self.client.as_deref().unwrap_or("-")
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.request_id)
    }
}
