//! Cache stage, innermost before the terminal handler.
//!
//! The cache key is the raw path parameter exactly as received — stable for
//! identical inputs, distinct for distinct ones, and derivable before any
//! parsing. A hit short-circuits with the cached payload; a miss delegates
//! inward and stores the payload of a successful outcome on the way back.
//!
//! Two concurrent misses on the same key may both compute; the second put
//! wins. See [`TtlCache`] for why that stampede is accepted.

use tracing::info;

use crate::cache::TtlCache;
use crate::context::RequestContext;
use crate::pipeline::{Next, Stage, StageFuture};
use crate::reply::{Outcome, Reply};

pub struct CacheStage {
    cache: TtlCache,
}

impl CacheStage {
    pub fn new(cache: TtlCache) -> Self {
        Self { cache }
    }
}

impl Stage for CacheStage {
    fn handle(&self, req: RequestContext, next: Next) -> StageFuture {
        let cache = self.cache.clone();
        Box::pin(async move {
            let key = req.input().to_owned();
            if let Some(value) = cache.get(&key) {
                info!(%key, "returning cached value");
                return Outcome::Success(Reply::cached(value));
            }
            let outcome = next.run(req).await;
            if let Outcome::Success(reply) = &outcome
                && let Some(payload) = reply.payload()
            {
                cache.put(key, payload.clone());
            }
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Chain, terminal};
    use crate::reply::MessageKind;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_chain(cache: TtlCache, calls: Arc<AtomicUsize>) -> Chain {
        Chain::new(
            vec![Arc::new(CacheStage::new(cache))],
            terminal(move |req: RequestContext| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Outcome::Success(Reply::with_payload(json!(req.input())))
                }
            }),
        )
    }

    #[tokio::test]
    async fn hit_short_circuits_and_marks_reply() {
        let cache = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = counting_chain(cache, Arc::clone(&calls));

        let first = chain.run(RequestContext::new("5")).await;
        assert!(matches!(first, Outcome::Success(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        match chain.run(RequestContext::new("5")).await {
            Outcome::Success(reply) => {
                assert_eq!(reply.payload(), Some(&json!("5")));
                assert_eq!(reply.messages()[0].kind, MessageKind::Info);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // terminal did not run again
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_compute_separately() {
        let cache = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = counting_chain(cache, Arc::clone(&calls));
        chain.run(RequestContext::new("5")).await;
        chain.run(RequestContext::new("6")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn error_outcomes_are_not_cached() {
        let cache = TtlCache::new();
        let chain = Chain::new(
            vec![Arc::new(CacheStage::new(cache.clone()))],
            terminal(|_req| async { Outcome::ClientError("bad".into()) }),
        );
        chain.run(RequestContext::new("x")).await;
        assert!(cache.is_empty());
    }
}
