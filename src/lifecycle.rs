//! Page lifecycle orchestration
//!
//! Drives one capture attempt end to end: allocate a surface, configure
//! it, open the URL, wait out the requested delay, render, release. The
//! lifecycle is single-attempt; nothing here retries. Two signals leave
//! it: the open-resolution status (set exactly once, the moment the
//! terminal HTTP status is known) and the terminal [`RenderOutcome`].

use std::time::Duration;

use log::warn;
use tokio::sync::{oneshot, watch};

use crate::engine::EngineFactory;
use crate::error::Error;
use crate::request::CaptureRequest;
use crate::surface::Surface;

/// Terminal outcome of one capture attempt.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub succeeded: bool,
    pub http_status: u16,
    pub message: String,
}

impl RenderOutcome {
    pub fn success(path: &str) -> Self {
        Self {
            succeeded: true,
            http_status: 200,
            message: format!("Success: Screenshot saved to {}\n", path),
        }
    }

    pub fn failure(err: &Error) -> Self {
        Self {
            succeeded: false,
            http_status: err.http_status(),
            message: err.to_string(),
        }
    }
}

/// Run the full lifecycle for one request.
///
/// `status_tx` is set exactly once, as soon as the status code is
/// decided; `outcome_tx` fires once at the very end, after the surface
/// has been released. Release happens on every branch that allocated a
/// surface.
pub async fn run(
    factory: EngineFactory,
    request: CaptureRequest,
    status_tx: watch::Sender<Option<u16>>,
    outcome_tx: oneshot::Sender<RenderOutcome>,
) {
    let outcome = match Surface::spawn(factory).await {
        Ok(surface) => {
            let outcome = drive(&surface, &request, &status_tx).await;
            surface.release().await;
            outcome
        }
        Err(err) => {
            let _ = status_tx.send(Some(err.http_status()));
            RenderOutcome::failure(&err)
        }
    };

    let _ = outcome_tx.send(outcome);
}

async fn drive(
    surface: &Surface,
    request: &CaptureRequest,
    status_tx: &watch::Sender<Option<u16>>,
) -> RenderOutcome {
    if let Err(err) = surface.configure(request).await {
        let _ = status_tx.send(Some(err.http_status()));
        return RenderOutcome::failure(&err);
    }

    let report = match surface.open(&request.url).await {
        Ok(report) => report,
        Err(err) => {
            let _ = status_tx.send(Some(err.http_status()));
            return RenderOutcome::failure(&err);
        }
    };

    if !report.status.is_success() {
        let reason = report
            .resource_error
            .map(|e| e.reason)
            .unwrap_or_else(|| "unknown".to_string());
        let err = Error::Navigation {
            engine: surface.engine_name().to_string(),
            url: request.url.clone(),
            reason,
        };
        warn!("{}", err);
        let _ = status_tx.send(Some(err.http_status()));
        return RenderOutcome::failure(&err);
    }

    // The status is decided the moment the open resolves, before the
    // render delay has run.
    let _ = status_tx.send(Some(200));

    if request.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(request.delay_ms)).await;
    }

    match surface.render(&request.resolved_path).await {
        Ok(()) => RenderOutcome::success(&request.resolved_path),
        Err(err) => RenderOutcome::failure(&err),
    }
}
