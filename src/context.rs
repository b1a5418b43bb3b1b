//! Request-scoped context.
//!
//! One `RequestContext` per inbound request, built at dispatch and owned by
//! the pipeline invocation. It carries the raw path parameter (the cache key
//! before any parsing) and the correlation id the tag stage binds at pipeline
//! entry. After that binding the context is never mutated again.

use tracing::warn;

/// Request-scoped values threaded through every pipeline stage.
#[derive(Debug, Clone)]
pub struct RequestContext {
    input: String,
    correlation_id: Option<String>,
}

impl RequestContext {
    /// Context for a fresh request; no correlation id is bound yet.
    pub fn new(input: impl Into<String>) -> Self {
        Self { input: input.into(), correlation_id: None }
    }

    /// Binds the correlation id. Called exactly once, by the tag stage.
    pub fn with_correlation_id(mut self, id: String) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// The raw path parameter as received on the wire, before parsing.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The correlation id bound at pipeline entry.
    ///
    /// Every request passes the tag stage before anything reads this, so the
    /// id is normally always present. If a caller ever reaches it unbound the
    /// request still proceeds: the accessor warns and yields an empty id.
    pub fn correlation_id(&self) -> &str {
        match &self.correlation_id {
            Some(id) => id,
            None => {
                warn!("correlation id was not bound on the request context");
                ""
            }
        }
    }
}
