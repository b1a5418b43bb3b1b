//! HTTP server: listener loop, dispatch, graceful shutdown.
//!
//! The listener stops accepting on the first SIGTERM / Ctrl-C and drains
//! every in-flight connection before returning, so a supervisor (Kubernetes,
//! systemd) can roll the process without cutting requests off mid-flight.
//!
//! Dispatch is where the response buffer is flushed — exactly once, after the
//! whole pipeline has unwound. If copying the buffered response to the socket
//! fails (client gone), the connection driver logs it and that is the end of
//! it; there is nobody left to tell.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::capture::ResponseBuffer;
use crate::context::RequestContext;
use crate::error::Error;
use crate::pipeline::Chain;
use crate::reply;

/// Routes the service answers. Everything else is a 404.
#[derive(Clone, Copy)]
enum Route {
    /// `/minmaxcollatz/{number}` through the full pipeline.
    Collatz,
    /// `/healthz` liveness probe, answered directly.
    Health,
}

/// The composed application: route table plus the shared pipeline.
pub struct App {
    routes: matchit::Router<Route>,
    chain: Chain,
}

impl App {
    pub fn new(chain: Chain) -> Self {
        let mut routes = matchit::Router::new();
        // the table is fixed; insertion can only fail on a malformed pattern
        routes
            .insert("/minmaxcollatz/{number}", Route::Collatz)
            .expect("invalid collatz route");
        routes.insert("/healthz", Route::Health).expect("invalid health route");
        Self { routes, chain }
    }
}

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind `addr` when [`serve`](Server::serve) is
    /// called.
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Starts accepting connections and dispatching them through `app`.
    ///
    /// Returns only after a full graceful shutdown: a signal followed by all
    /// in-flight connections completing.
    pub async fn serve(self, app: App) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let app = Arc::new(app);

        info!(addr = %self.addr, "hailstone listening");

        // JoinSet tracks every connection task so shutdown can drain them
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // check shutdown first so a signal stops accepting even if
                // more connections are queued
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req).await }
                        });

                        // auto::Builder speaks HTTP/1.1 and HTTP/2, whichever
                        // the client negotiates
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // reap finished connection tasks; a panicked request task
                // surfaces here as a crash, never as an HTTP response
                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res
                        && e.is_panic()
                    {
                        error!("connection task panicked: {e}");
                    }
                }
            }
        }

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res
                && e.is_panic()
            {
                error!("connection task panicked: {e}");
            }
        }

        info!("hailstone stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request, runs the pipeline, flushes the buffered response.
///
/// The error type is [`Infallible`]: every failure the pipeline can resolve
/// becomes a status code, and the one it cannot (a panic) is re-raised, not
/// returned.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();
    let response = match app.routes.at(path) {
        Ok(matched) => match matched.value {
            Route::Collatz => {
                let input = matched.params.get("number").unwrap_or_default().to_owned();
                let outcome = app.chain.run(RequestContext::new(input)).await;
                reply::render(outcome).into_http()
            }
            Route::Health => {
                let mut buf = ResponseBuffer::new();
                buf.write(br#"{"status":"ok"}"#);
                buf.into_http()
            }
        },
        Err(_) => {
            let mut buf = ResponseBuffer::new();
            buf.set_status(StatusCode::NOT_FOUND);
            buf.into_http()
        }
    };
    Ok(response)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives: SIGTERM or
/// SIGINT on Unix, Ctrl-C elsewhere.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
