//! Exposition Server
//!
//! Serves the registry in the text exposition format, plus liveness and
//! readiness probes, on a single port. Every scrape renders a fresh snapshot
//! and never writes to the registry.
//!
//! | path       | response                           |
//! |------------|------------------------------------|
//! | `/metrics` | current snapshot, text format      |
//! | `/healthz` | `ok`                               |
//! | `/readyz`  | `ok`                               |
//! | other      | 404                                |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::metrics::{render, Registry};

/// Upper bound on waiting for open connections after shutdown
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed accept, so descriptor exhaustion does not spin
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Route one request
fn respond(registry: &Registry, path: &str) -> Response<Full<Bytes>> {
    match path {
        "/metrics" => {
            let encoder = TextEncoder::new();
            let snapshot = registry.snapshot();
            match render(&encoder, &snapshot) {
                Ok(body) => {
                    debug!("Encoded {} series", snapshot.series_count());
                    build(StatusCode::OK, encoder.format_type(), body)
                }
                Err(e) => {
                    error!("Failed to encode metrics: {}", e);
                    build(StatusCode::INTERNAL_SERVER_ERROR, PLAIN_TEXT, "encoding failed")
                }
            }
        }
        "/healthz" | "/readyz" => build(StatusCode::OK, PLAIN_TEXT, "ok"),
        _ => build(StatusCode::NOT_FOUND, PLAIN_TEXT, "not found"),
    }
}

fn build(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    match HeaderValue::from_str(content_type) {
        Ok(value) => {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        Err(e) => warn!("Invalid content type {:?}: {}", content_type, e),
    }
    response
}

/// A bound, not yet serving, exposition server
#[derive(Debug)]
pub struct MetricsServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl MetricsServer {
    /// Bind the listening socket. Failure here is fatal at startup.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Actual bound address (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` is cancelled, then drain open connections.
    pub async fn serve(self, registry: Arc<Registry>, shutdown: CancellationToken) -> Result<()> {
        info!("Exposition server listening on {}", self.local_addr);
        let graceful = GracefulShutdown::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };

                    let registry = Arc::clone(&registry);
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        debug!("{} {} from {}", req.method(), req.uri().path(), peer);
                        let response = respond(&registry, req.uri().path());
                        async move { Ok::<_, Infallible>(response) }
                    });

                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    let conn = graceful.watch(conn);
                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            debug!("Connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
            }
        }

        drop(self.listener);
        info!("Exposition server stopping, draining connections");
        tokio::select! {
            _ = graceful.shutdown() => info!("Exposition server stopped"),
            _ = tokio::time::sleep(DRAIN_TIMEOUT) => {
                warn!("Connections still open after {:?}; closing", DRAIN_TIMEOUT)
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
