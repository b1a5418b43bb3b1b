//! Buffered response assembly.
//!
//! Handlers never touch the network. The pipeline produces an
//! [`Outcome`](crate::reply::Outcome), rendering accumulates it into a
//! `ResponseBuffer`, and dispatch flushes that buffer into the connection
//! exactly once, after the whole chain has unwound. Until the flush, no byte
//! reaches the client — a stage running later (the timeout stage) can still
//! decide the buffered work is irrelevant and it is simply dropped.
//!
//! The flush consumes the buffer, so "exactly once" is enforced by the type
//! system rather than by a runtime flag.

use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http_body_util::Full;

/// A response being assembled: status, headers and body, all in memory.
#[derive(Debug)]
pub struct ResponseBuffer {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Vec<u8>,
}

impl ResponseBuffer {
    /// Empty buffer; defaults to `200 OK`, like a writer nobody set a status on.
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: Vec::new(), body: Vec::new() }
    }

    /// Records the status code. The last call before the flush wins.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.push((name, value));
    }

    /// Appends to the buffered body. Nothing is transmitted.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The one-shot flush: consumes the buffer and produces the hyper
    /// response that actually goes out on the wire. The content type defaults
    /// to `application/json` unless a header already set it — every body this
    /// service produces is JSON.
    pub fn into_http(mut self) -> http::Response<Full<Bytes>> {
        if !self.headers.iter().any(|(name, _)| *name == CONTENT_TYPE) {
            self.headers.push((CONTENT_TYPE, HeaderValue::from_static("application/json")));
        }
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        // the only builder failure modes are invalid status/header values,
        // which this type never holds
        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::new())))
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_accumulate_until_flush() {
        let mut buf = ResponseBuffer::new();
        buf.write(b"{\"a\":");
        buf.write(b"1}");
        assert_eq!(buf.body(), b"{\"a\":1}");
    }

    #[test]
    fn last_status_wins() {
        let mut buf = ResponseBuffer::new();
        assert_eq!(buf.status(), StatusCode::OK);
        buf.set_status(StatusCode::BAD_REQUEST);
        buf.set_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(buf.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn flush_sets_json_content_type() {
        let mut buf = ResponseBuffer::new();
        buf.write(b"{}");
        let resp = buf.into_http();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "application/json");
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let mut buf = ResponseBuffer::new();
        buf.header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let resp = buf.into_http();
        assert_eq!(resp.headers()["content-type"], "text/plain");
    }
}
