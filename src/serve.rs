//! HTTP service: listener lifecycle, the capture handler and the
//! response scheduler.
//!
//! The transport constraint driving the scheduler: the status line must
//! be committed before any body byte and can never change afterwards,
//! while the capture's true outcome arrives asynchronously after an
//! unbounded navigation. The scheduler therefore races a fixed grace
//! timer against the orchestrator and only ever fixes the status once.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::engine::EngineFactory;
use crate::error::{Error, Result};
use crate::lifecycle::{self, RenderOutcome};
use crate::request::CaptureRequest;
use crate::ServiceConfig;

/// Window the navigation gets to resolve before the scheduler considers
/// committing a status line on its own.
const GRACE_PERIOD: Duration = Duration::from_millis(500);

#[derive(Clone)]
struct AppState {
    config: Arc<ServiceConfig>,
    factory: EngineFactory,
}

/// The screenshot service: explicit construction, explicit start/stop.
///
/// Every inbound request other than `/healthCheck` is treated as a
/// capture request; method and path are ignored.
pub struct RasterService {
    config: ServiceConfig,
    factory: EngineFactory,
}

impl RasterService {
    /// Service over the default engine backend.
    #[cfg(any(feature = "fetch", feature = "cdp"))]
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_engine_factory(config, Arc::new(|| crate::new_engine()))
    }

    /// Service over a caller-supplied engine factory. Tests use this to
    /// inject scripted engines behind the full HTTP surface.
    pub fn with_engine_factory(config: ServiceConfig, factory: EngineFactory) -> Self {
        Self { config, factory }
    }

    /// Bind the listener and start serving. Returns a handle carrying the
    /// bound address and the stop switch.
    pub async fn start(self) -> Result<ServiceHandle> {
        let port = self.config.port;
        let state = AppState {
            config: Arc::new(self.config),
            factory: self.factory,
        };

        let app = Router::new()
            .route("/healthCheck", any(health_check))
            .fallback(capture)
            .with_state(state);

        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| Error::Other(format!("failed to bind port {}: {}", port, e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| Error::Other(e.to_string()))?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.changed().await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!("listener error: {}", e);
            }
        });

        info!("rasterd listening on {}", addr);
        Ok(ServiceHandle {
            addr,
            shutdown_tx,
            task,
        })
    }
}

/// Handle to a running service.
pub struct ServiceHandle {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    /// The address the listener actually bound (useful with port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the listener to wind down.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
        info!("rasterd stopped");
    }
}

async fn health_check() -> &'static str {
    "up"
}

async fn capture(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request = match CaptureRequest::from_headers(&headers, &state.config) {
        Ok(request) => request,
        Err(Error::MissingUrlHeader) => {
            return (
                StatusCode::BAD_REQUEST,
                "Error: Request must contain an url header\n",
            )
                .into_response();
        }
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error while parsing headers: {}", err),
            )
                .into_response();
        }
    };

    debug!("capture {} -> {}", request.url, request.resolved_path);

    let (status_tx, status_rx) = watch::channel(None);
    let (outcome_tx, outcome_rx) = oneshot::channel();
    tokio::spawn(lifecycle::run(
        state.factory.clone(),
        request,
        status_tx,
        outcome_tx,
    ));

    respond(status_rx, outcome_rx).await
}

/// The response scheduler.
///
/// Waits on the orchestrator's outcome and the grace timer at once. If
/// the outcome lands first, it is written as a normal response. If the
/// grace period elapses first there are two cases: the open has already
/// resolved, so the decided status is committed now with an empty first
/// fragment and the body streams in when the orchestrator completes; or
/// the open is still pending, and the connection simply stays open so no
/// default status ever gets locked in. Either way the status is fixed at
/// most once and exactly one close happens.
async fn respond(
    status_rx: watch::Receiver<Option<u16>>,
    mut outcome_rx: oneshot::Receiver<RenderOutcome>,
) -> Response {
    tokio::select! {
        biased;

        outcome = &mut outcome_rx => finished(outcome),

        _ = tokio::time::sleep(GRACE_PERIOD) => {
            let decided = *status_rx.borrow();
            match decided {
                Some(status) => committed(status, outcome_rx),
                None => finished(outcome_rx.await),
            }
        }
    }
}

/// Full response: the outcome is known before anything was written.
fn finished(outcome: std::result::Result<RenderOutcome, oneshot::error::RecvError>) -> Response {
    let outcome = outcome.unwrap_or_else(|_| {
        RenderOutcome::failure(&Error::Other(
            "capture task dropped before completing".to_string(),
        ))
    });
    let status =
        StatusCode::from_u16(outcome.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, outcome.message).into_response()
}

/// Commit the already-decided status now and stream the body later.
fn committed(status: u16, outcome_rx: oneshot::Receiver<RenderOutcome>) -> Response {
    let (body_tx, body_rx) = mpsc::channel::<std::result::Result<Bytes, std::convert::Infallible>>(2);

    tokio::spawn(async move {
        // the empty fragment commits the status line and keeps the
        // connection alive without settling the body
        let _ = body_tx.send(Ok(Bytes::new())).await;
        let message = match outcome_rx.await {
            Ok(outcome) => outcome.message,
            Err(_) => String::new(),
        };
        let _ = body_tx.send(Ok(Bytes::from(message))).await;
        // dropping the sender ends the stream and closes the response
    });

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match Response::builder()
        .status(status)
        .body(Body::from_stream(ReceiverStream::new(body_rx)))
    {
        Ok(response) => response,
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to build response: {}", e),
        )
            .into_response(),
    }
}
