//! Timing stage.
//!
//! Sits directly inside the tagger so the measured window covers the whole
//! pipeline: logging, the timeout wait, cache lookups and the terminal
//! computation. Emits one debug event per request; no export beyond the log.

use std::time::Instant;

use tracing::debug;

use crate::context::RequestContext;
use crate::pipeline::{Next, Stage, StageFuture};

pub struct MetricsStage;

impl Stage for MetricsStage {
    fn handle(&self, req: RequestContext, next: Next) -> StageFuture {
        Box::pin(async move {
            let start = Instant::now();
            let outcome = next.run(req).await;
            debug!(elapsed = ?start.elapsed(), "processing took");
            outcome
        })
    }
}
