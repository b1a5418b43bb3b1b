use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use hailstone::{App, Config, Server, TtlCache, pipeline, reply};

#[tokio::main]
async fn main() -> Result<(), hailstone::Error> {
    // the original service logged at debug; RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    info!("starting server");

    let config = Config::from_env();
    info!(port = config.port, "server port");

    // fixed error bodies exist before the first request can need them
    reply::init_fixed_bodies();

    let cache = TtlCache::new();
    let janitor = cache.spawn_janitor(config.sweep_period, config.max_age);

    let chain = pipeline::standard(cache, config.deadline);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    Server::bind(addr).serve(App::new(chain)).await?;

    janitor.abort();
    Ok(())
}
