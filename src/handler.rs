//! The terminal handler: parameter parsing and the Collatz scan.
//!
//! Only reached on a cache miss. Parsing and validation failures resolve to
//! client errors whose messages echo the offending value; overflow during the
//! scan is the service's fault and resolves to a server error.

use std::num::IntErrorKind;

use serde_json::json;
use tracing::info;

use crate::compute::{self, ComputeError};
use crate::context::RequestContext;
use crate::reply::{Outcome, Reply};

/// `GET /minmaxcollatz/{number}` — longest chain over `1..=number`.
pub async fn longest_chain_handler(req: RequestContext) -> Outcome {
    let raw = req.input();
    let n: i64 = match raw.parse() {
        Ok(n) => n,
        Err(err) => {
            let message = match err.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    format!("got out of range error while processing input '{raw}'")
                }
                _ => format!("parameter '{raw}' is not a number"),
            };
            return Outcome::ClientError(message);
        }
    };
    info!(n, "computing longest collatz chain");
    match compute::longest_chain(n) {
        Ok(peak) => Outcome::Success(Reply::with_payload(json!({
            "max": peak.max,
            "number": peak.number,
        }))),
        Err(err @ ComputeError::NotPositive) => Outcome::ClientError(err.to_string()),
        Err(err @ ComputeError::Overflow) => Outcome::ServerError(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn valid_input_yields_payload() {
        match longest_chain_handler(RequestContext::new("5")).await {
            Outcome::Success(reply) => {
                let payload = reply.payload().unwrap();
                assert_eq!(payload["max"], 8);
                assert_eq!(payload["number"], 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_numeric_input_is_a_client_error() {
        match longest_chain_handler(RequestContext::new("abc")).await {
            Outcome::ClientError(m) => assert_eq!(m, "parameter 'abc' is not a number"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn out_of_range_input_echoes_the_value() {
        let big = "99999999999999999999999";
        match longest_chain_handler(RequestContext::new(big)).await {
            Outcome::ClientError(m) => {
                assert!(m.contains("out of range"));
                assert!(m.contains(big));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn negative_input_is_rejected() {
        match longest_chain_handler(RequestContext::new("-1")).await {
            Outcome::ClientError(m) => assert!(m.contains("greater than zero")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
