//! Wire model and outcome rendering.
//!
//! Every request resolves to exactly one [`Outcome`]; [`render`] turns it
//! into a buffered response. The body shape is the original service's:
//!
//! ```json
//! { "response": { "max": 112, "number": 27 },
//!   "messages": [ { "type": "INFO", "message": "returning cached value" } ] }
//! ```
//!
//! Two bodies are fixed for the life of the process and reused verbatim: the
//! fallback used when serializing a normal reply itself fails, and the
//! deadline-exceeded body the timeout stage resolves to. Both are forced at
//! startup so no request pays for (or can fail at) building them.

use std::sync::LazyLock;

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::capture::ResponseBuffer;

/// Severity of a [`Message`], serialized in the original's uppercase form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "ERROR")]
    Error,
}

/// One entry of the reply's message list.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: String,
}

/// The JSON reply body: an optional payload plus accumulated messages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<Message>,
}

impl Reply {
    /// Reply carrying a computed payload and no messages.
    pub fn with_payload(payload: Value) -> Self {
        Self { response: Some(payload), messages: Vec::new() }
    }

    /// Reply for a cache hit: the cached payload plus the INFO marker the
    /// original service attached.
    pub fn cached(payload: Value) -> Self {
        let mut reply = Self::with_payload(payload);
        reply.add_info("returning cached value");
        reply
    }

    /// Reply holding a single error message and no payload.
    pub fn error(message: impl Into<String>) -> Self {
        let mut reply = Self::default();
        reply.add_error(message);
        reply
    }

    pub fn add_info(&mut self, message: impl Into<String>) {
        self.messages.push(Message { kind: MessageKind::Info, message: message.into() });
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.messages.push(Message { kind: MessageKind::Error, message: message.into() });
    }

    pub fn payload(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// The single terminal result of a pipeline run.
///
/// Panics are deliberately absent from this type: an abnormal termination is
/// re-raised by the timeout stage, never reinterpreted as an outcome.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The computation (or the cache) produced a payload.
    Success(Reply),
    /// The request itself was at fault; the message echoes what was wrong.
    ClientError(String),
    /// The service failed to produce an answer (e.g. overflow).
    ServerError(String),
    /// The deadline elapsed before the inner pipeline finished.
    Timeout,
}

impl Outcome {
    /// The HTTP status this outcome resolves to.
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Success(_) => StatusCode::OK,
            Outcome::ClientError(_) => StatusCode::BAD_REQUEST,
            Outcome::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Outcome::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

static FATAL_BODY: LazyLock<Vec<u8>> = LazyLock::new(|| {
    serde_json::to_vec(&Reply::error("could not process response"))
        .unwrap_or_else(|_| br#"{"messages":[{"type":"ERROR","message":"could not process response"}]}"#.to_vec())
});

static TIMEOUT_BODY: LazyLock<Vec<u8>> = LazyLock::new(|| {
    serde_json::to_vec(&Reply::error("deadline exceeded"))
        .unwrap_or_else(|_| br#"{"messages":[{"type":"ERROR","message":"deadline exceeded"}]}"#.to_vec())
});

/// Forces the fixed bodies so they exist before the first request.
pub fn init_fixed_bodies() {
    LazyLock::force(&FATAL_BODY);
    LazyLock::force(&TIMEOUT_BODY);
}

/// Renders an outcome into a buffered response.
///
/// A serialization failure replaces the body with the precomputed fallback
/// and downgrades the status to 500; it is logged, not surfaced — there is
/// nothing better to tell the client at that point.
pub fn render(outcome: Outcome) -> ResponseBuffer {
    let mut buf = ResponseBuffer::new();
    buf.set_status(outcome.status());
    let reply = match outcome {
        Outcome::Timeout => {
            buf.write(&TIMEOUT_BODY);
            return buf;
        }
        Outcome::Success(reply) => reply,
        Outcome::ClientError(message) | Outcome::ServerError(message) => Reply::error(message),
    };
    // normal replies are indented for readability, as the original service
    // emitted them; the fixed bodies above stay compact, also as original
    match serde_json::to_vec_pretty(&reply) {
        Ok(body) => buf.write(&body),
        Err(err) => {
            error!(error = %err, "could not serialize response body");
            buf.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            buf.write(&FATAL_BODY);
        }
    }
    buf
}
