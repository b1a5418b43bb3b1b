//! Request/response logging stage.
//!
//! Logs the request on the way in and the resolved status on the way out.
//! The response bytes themselves are buffered elsewhere
//! ([`capture`](crate::capture)) and flushed once by dispatch, so by the time
//! this stage sees the outcome nothing has reached the client yet.

use tracing::info;

use crate::context::RequestContext;
use crate::pipeline::{Next, Stage, StageFuture};

pub struct LogStage;

impl Stage for LogStage {
    fn handle(&self, req: RequestContext, next: Next) -> StageFuture {
        Box::pin(async move {
            info!(input = %req.input(), "logging request");
            let outcome = next.run(req).await;
            info!(status = %outcome.status(), "logging response");
            outcome
        })
    }
}
