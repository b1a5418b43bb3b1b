//! The staged request pipeline.
//!
//! A [`Chain`] is an ordered list of [`Stage`] objects wrapped around a
//! terminal handler. It is composed once at startup, is immutable afterwards,
//! and is shared read-only across every concurrent request — nothing is
//! re-derived per request except the lightweight [`Next`] cursor.
//!
//! Each stage receives the request and a `Next` handle; it may short-circuit
//! (the cache stage on a hit, the timeout stage on deadline) or delegate
//! inward with `next.run(req)`. Outcomes flow back outward unwinding the same
//! stages in reverse.
//!
//! The standard composition, outermost first:
//!
//! ```text
//! tag → metrics → log → timeout → auth → cache → terminal
//! ```
//!
//! The order is a contract, not an accident:
//! - `tag` is outermost so every later stage's logs carry the correlation id;
//! - `metrics` times everything it should, cache lookups included;
//! - `timeout` bounds everything that can be slow;
//! - `cache` sits innermost-but-auth, so a hit short-circuits before any
//!   computation but authorization still runs for cached answers.
//!
//! # How stages and the terminal are stored
//!
//! The chain must hold stages of different concrete types in one slice, so
//! both levels are trait objects: `Arc<dyn Stage>` for the list and an
//! `Arc<dyn Fn(..) -> StageFuture>` for the terminal. The per-request cost is
//! a handful of `Arc` clones and one vtable call per stage — noise next to
//! the network I/O.

mod auth;
mod cache;
mod log;
mod metrics;
mod tag;
mod timeout;

pub use auth::AuthStage;
pub use cache::CacheStage;
pub use log::LogStage;
pub use metrics::MetricsStage;
pub use tag::TagStage;
pub use timeout::TimeoutStage;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::context::RequestContext;
use crate::handler;
use crate::reply::Outcome;

/// A heap-allocated, type-erased future resolving to the request's outcome.
///
/// `Send + 'static` because the timeout stage moves the downstream pipeline
/// onto its own tokio task.
pub type StageFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// One link of the pipeline.
///
/// Implementations must be cheap to call and free of interior blocking; the
/// only intentional wait in the request path lives in [`TimeoutStage`].
pub trait Stage: Send + Sync + 'static {
    fn handle(&self, req: RequestContext, next: Next) -> StageFuture;
}

/// Type-erased terminal handler at the innermost end of the chain.
pub type TerminalHandler = Arc<dyn Fn(RequestContext) -> StageFuture + Send + Sync>;

/// Erases a concrete `async fn(RequestContext) -> Outcome` into a
/// [`TerminalHandler`].
pub fn terminal<F, Fut>(f: F) -> TerminalHandler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Cursor over the remaining stages of a chain.
///
/// Consumed by `run`, so a stage can delegate inward at most once; dropping
/// it without running is how a stage short-circuits.
pub struct Next {
    stages: Arc<[Arc<dyn Stage>]>,
    index: usize,
    terminal: TerminalHandler,
}

impl Next {
    /// Runs the rest of the pipeline: the next stage if one remains,
    /// otherwise the terminal handler.
    pub fn run(mut self, req: RequestContext) -> StageFuture {
        match self.stages.get(self.index).cloned() {
            Some(stage) => {
                self.index += 1;
                stage.handle(req, self)
            }
            None => (self.terminal)(req),
        }
    }
}

/// The composed, immutable pipeline.
#[derive(Clone)]
pub struct Chain {
    stages: Arc<[Arc<dyn Stage>]>,
    terminal: TerminalHandler,
}

impl Chain {
    /// Composes `stages` (outermost first) around `terminal`. Called once at
    /// startup; the result is shared across requests via cheap clones.
    pub fn new(stages: Vec<Arc<dyn Stage>>, terminal: TerminalHandler) -> Self {
        Self { stages: stages.into(), terminal }
    }

    /// Runs one request through every stage. Exactly one [`Outcome`] comes
    /// back; a panic in the pipeline is re-raised here, not returned.
    pub async fn run(&self, req: RequestContext) -> Outcome {
        Next {
            stages: Arc::clone(&self.stages),
            index: 0,
            terminal: Arc::clone(&self.terminal),
        }
        .run(req)
        .await
    }
}

/// The service's standard chain: the fixed stage order around the Collatz
/// terminal handler, with `cache` injected rather than ambient.
pub fn standard(cache: TtlCache, deadline: Duration) -> Chain {
    Chain::new(
        vec![
            Arc::new(TagStage),
            Arc::new(MetricsStage),
            Arc::new(LogStage),
            Arc::new(TimeoutStage::new(deadline)),
            Arc::new(AuthStage),
            Arc::new(CacheStage::new(cache)),
        ],
        terminal(handler::longest_chain_handler),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::Reply;
    use serde_json::json;

    #[tokio::test]
    async fn empty_chain_reaches_terminal() {
        let chain = Chain::new(Vec::new(), terminal(|req: RequestContext| async move {
            Outcome::Success(Reply::with_payload(json!(req.input())))
        }));
        match chain.run(RequestContext::new("7")).await {
            Outcome::Success(reply) => assert_eq!(reply.payload(), Some(&json!("7"))),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stages_run_outermost_first() {
        struct Tracer(&'static str);
        impl Stage for Tracer {
            fn handle(&self, req: RequestContext, next: Next) -> StageFuture {
                let label = self.0;
                Box::pin(async move {
                    let req = RequestContext::new(format!("{}{}", req.input(), label));
                    next.run(req).await
                })
            }
        }
        let chain = Chain::new(
            vec![Arc::new(Tracer("a")), Arc::new(Tracer("b"))],
            terminal(|req: RequestContext| async move {
                Outcome::ClientError(req.input().to_owned())
            }),
        );
        match chain.run(RequestContext::new("")).await {
            Outcome::ClientError(trace) => assert_eq!(trace, "ab"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_stages() {
        struct Block;
        impl Stage for Block {
            fn handle(&self, _req: RequestContext, _next: Next) -> StageFuture {
                Box::pin(async { Outcome::ClientError("blocked".into()) })
            }
        }
        let chain = Chain::new(
            vec![Arc::new(Block)],
            terminal(|_req| async { panic!("terminal must not run") }),
        );
        match chain.run(RequestContext::new("x")).await {
            Outcome::ClientError(m) => assert_eq!(m, "blocked"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
