//! Deadline enforcement and panic isolation.
//!
//! The downstream pipeline runs on its own tokio task; this stage waits on
//! the invoking task for whichever comes first:
//!
//! - normal completion — the inner outcome is returned unmodified;
//! - a panic caught by the task boundary — logged, then re-raised here with
//!   [`resume_unwind`](std::panic::resume_unwind). An abnormal termination is
//!   never converted into an HTTP response; it only changes *where* it
//!   surfaces, so the process keeps its ordinary crash semantics;
//! - the deadline — the request resolves to [`Outcome::Timeout`] and the
//!   fixed 503 body, no matter what the inner task eventually produces.
//!
//! Cancellation is cooperative only. On timeout the inner task is abandoned,
//! not aborted: the computation may run to completion and its outcome is
//! dropped. The invoking task itself never waits past the deadline.

use std::time::Duration;

use tracing::{Instrument, warn};

use crate::context::RequestContext;
use crate::pipeline::{Next, Stage, StageFuture};
use crate::reply::Outcome;

pub struct TimeoutStage {
    deadline: Duration,
}

impl TimeoutStage {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }
}

impl Stage for TimeoutStage {
    fn handle(&self, req: RequestContext, next: Next) -> StageFuture {
        let deadline = self.deadline;
        Box::pin(async move {
            // in_current_span keeps the correlation id on logs emitted from
            // the spawned task
            let inner = tokio::spawn(next.run(req).in_current_span());
            tokio::select! {
                res = inner => match res {
                    Ok(outcome) => outcome,
                    Err(err) if err.is_panic() => {
                        warn!("panic caught in request task");
                        std::panic::resume_unwind(err.into_panic());
                    }
                    Err(_) => {
                        // runtime shutdown cancelled the task under us
                        warn!("request task cancelled");
                        Outcome::ServerError("request was cancelled".into())
                    }
                },
                () = tokio::time::sleep(deadline) => {
                    warn!("deadline exceeded");
                    Outcome::Timeout
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Chain, terminal};
    use crate::reply::Reply;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Instant;

    fn chain_with_deadline(deadline: Duration, t: crate::pipeline::TerminalHandler) -> Chain {
        Chain::new(vec![Arc::new(TimeoutStage::new(deadline))], t)
    }

    #[tokio::test]
    async fn fast_completion_passes_through() {
        let chain = chain_with_deadline(
            Duration::from_secs(1),
            terminal(|_req| async { Outcome::Success(Reply::with_payload(json!(1))) }),
        );
        assert!(matches!(
            chain.run(RequestContext::new("1")).await,
            Outcome::Success(_)
        ));
    }

    #[tokio::test]
    async fn slow_completion_times_out_with_fixed_outcome() {
        let chain = chain_with_deadline(
            Duration::from_millis(30),
            terminal(|_req| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Outcome::Success(Reply::with_payload(json!("too late")))
            }),
        );
        let start = Instant::now();
        let outcome = chain.run(RequestContext::new("1")).await;
        assert!(matches!(outcome, Outcome::Timeout));
        // the invoking task must not have waited for the slow terminal
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn panic_is_reraised_not_converted() {
        let chain = chain_with_deadline(
            Duration::from_secs(1),
            terminal(|_req| async { panic!("terminal blew up") }),
        );
        let joined = tokio::spawn(async move { chain.run(RequestContext::new("1")).await }).await;
        let err = joined.expect_err("panic must propagate out of the pipeline");
        assert!(err.is_panic());
    }
}
