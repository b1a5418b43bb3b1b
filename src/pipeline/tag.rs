//! Correlation tagger, the outermost stage.
//!
//! Generates a fresh UUID v4 per request, binds it into the context, and
//! opens a `request` span around everything inward so every later stage's
//! logs carry the id. Generation never blocks and never fails.

use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::pipeline::{Next, Stage, StageFuture};

pub struct TagStage;

impl Stage for TagStage {
    fn handle(&self, req: RequestContext, next: Next) -> StageFuture {
        let req = req.with_correlation_id(Uuid::new_v4().to_string());
        let span = info_span!("request", guid = %req.correlation_id());
        Box::pin(next.run(req).instrument(span))
    }
}
