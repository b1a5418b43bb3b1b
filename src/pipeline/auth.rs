//! Authentication stage, currently a pass-through stub.
//!
//! It sits between the timeout and the cache so that, once real checks land,
//! even cached answers require authorization. For now it only logs that the
//! request passed this point.

use tracing::info;

use crate::context::RequestContext;
use crate::pipeline::{Next, Stage, StageFuture};

pub struct AuthStage;

impl Stage for AuthStage {
    fn handle(&self, req: RequestContext, next: Next) -> StageFuture {
        Box::pin(async move {
            info!("authenticate");
            next.run(req).await
        })
    }
}
