//! # hailstone
//!
//! An HTTP service that answers one question — over `1..=N`, which starting
//! value has the longest Collatz (hailstone) chain — and wraps that answer in
//! a staged request pipeline providing the guarantees the computation alone
//! cannot:
//!
//! - **Correlation** — every request gets a UUID at entry; every log line in
//!   its dynamic extent carries it.
//! - **Buffered responses** — handlers produce values, never socket writes;
//!   one flush happens after the whole pipeline has unwound.
//! - **Result caching** — a shared TTL cache with sliding expiration and a
//!   background janitor; hot keys never expire, cold ones are reclaimed.
//! - **Bounded execution** — a per-request deadline on an isolated task. A
//!   slow computation yields a fixed 503; a panicking one is re-raised, never
//!   disguised as a response.
//!
//! The pipeline order is fixed and composed once at startup:
//!
//! ```text
//! tag → metrics → log → timeout → auth → cache → terminal
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use hailstone::{App, Config, Server, TtlCache, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hailstone::Error> {
//!     let config = Config::from_env();
//!     let cache = TtlCache::new();
//!     let janitor = cache.spawn_janitor(config.sweep_period, config.max_age);
//!
//!     let chain = pipeline::standard(cache, config.deadline);
//!     let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
//!     Server::bind(addr).serve(App::new(chain)).await?;
//!
//!     janitor.abort();
//!     Ok(())
//! }
//! ```

mod cache;
mod capture;
mod compute;
mod config;
mod context;
mod error;
mod handler;
mod server;

pub mod pipeline;
pub mod reply;

pub use cache::TtlCache;
pub use capture::ResponseBuffer;
pub use compute::{ComputeError, Peak, chain_length, longest_chain};
pub use config::Config;
pub use context::RequestContext;
pub use error::Error;
pub use handler::longest_chain_handler;
pub use server::{App, Server};
