//! Unified infrastructure error type.
//!
//! Request-level failures (bad parameter, overflow, timeout) are expressed as
//! [`Outcome`](crate::reply::Outcome) values and rendered into HTTP responses,
//! not as `Error`s. This type surfaces the failures the server itself can hit:
//! binding to a port or accepting a connection.

/// The error type returned by hailstone's fallible startup operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
