//! Per-request render surface
//!
//! Every capture request owns exactly one engine instance. The engine is
//! created and driven on a dedicated worker thread (engines block on
//! network and pixel work and need not be `Send`); async callers talk to
//! it through a command channel with oneshot replies.

use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

use crate::engine::{EngineFactory, OpenStatus, PageEngine, ResourceError};
use crate::error::{Error, Result};
use crate::request::CaptureRequest;

/// Result of an open: the navigation status plus whatever resource-error
/// context the engine recorded while loading.
#[derive(Debug, Clone)]
pub struct OpenReport {
    pub status: OpenStatus,
    pub resource_error: Option<ResourceError>,
}

enum Command {
    Configure(Box<CaptureRequest>, oneshot::Sender<Result<()>>),
    Open(String, oneshot::Sender<OpenReport>),
    Render(String, oneshot::Sender<Result<()>>),
    Release(oneshot::Sender<()>),
}

/// Apply a request's capture parameters to a fresh engine: viewport, clip
/// rectangle when present, then each supplied setting from the enumerated
/// set. Side effects stay on the engine; nothing here touches network or
/// filesystem.
pub fn configure_engine(engine: &mut dyn PageEngine, request: &CaptureRequest) -> Result<()> {
    engine.set_viewport(request.viewport)?;
    if let Some(clip) = request.clip_rect {
        engine.set_clip_rect(clip)?;
    }
    for (key, value) in request.settings.entries() {
        engine.apply_setting(key, value)?;
    }
    Ok(())
}

/// Handle to one request's render surface, backed by a worker thread that
/// owns the engine. The worker exits after `release`.
#[derive(Debug)]
pub struct Surface {
    cmd_tx: Sender<Command>,
    engine_name: &'static str,
}

impl Surface {
    /// Create the engine on a fresh worker thread and wait for it to
    /// report readiness.
    pub async fn spawn(factory: EngineFactory) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<&'static str>>();

        thread::spawn(move || {
            // Initialize the engine on the worker thread
            let mut engine = match factory() {
                Ok(engine) => engine,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(engine.name()));

            // Command loop
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Configure(request, resp) => {
                        let res = configure_engine(engine.as_mut(), &request);
                        let _ = resp.send(res);
                    }
                    Command::Open(url, resp) => {
                        let status = engine.open(&url);
                        let _ = resp.send(OpenReport {
                            status,
                            resource_error: engine.last_resource_error(),
                        });
                    }
                    Command::Render(path, resp) => {
                        let _ = resp.send(engine.render(&path));
                    }
                    Command::Release(resp) => {
                        engine.release();
                        let _ = resp.send(());
                        break;
                    }
                }
            }
        });

        let engine_name = init_rx
            .await
            .map_err(|e| Error::SurfaceInit(format!("worker init canceled: {}", e)))??;

        Ok(Self {
            cmd_tx,
            engine_name,
        })
    }

    /// Backend name, for failure messages.
    pub fn engine_name(&self) -> &'static str {
        self.engine_name
    }

    pub async fn configure(&self, request: &CaptureRequest) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(Command::Configure(Box::new(request.clone()), tx));
        rx.await
            .map_err(|e| Error::WorkerGone(format!("configure canceled: {}", e)))?
    }

    /// Drive the engine's open and collect the report. Engine-internal
    /// failures surface as a failed report, not as an `Err`.
    pub async fn open(&self, url: &str) -> Result<OpenReport> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Open(url.to_string(), tx));
        rx.await
            .map_err(|e| Error::WorkerGone(format!("open canceled: {}", e)))
    }

    pub async fn render(&self, path: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Render(path.to_string(), tx));
        rx.await
            .map_err(|e| Error::WorkerGone(format!("render canceled: {}", e)))?
    }

    /// Release engine resources and stop the worker. Safe to call exactly
    /// once; the command loop ends here.
    pub async fn release(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Release(tx));
        let _ = rx.await;
    }
}
