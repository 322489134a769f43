//! Page engine abstraction
//!
//! The browser engine is an opaque collaborator: it can open a URL
//! (reporting success or failure plus any resource-load errors observed
//! along the way) and rasterize the opened page to a file. Backends plug
//! in behind the [`PageEngine`] trait; the service never assumes more
//! than this surface.

use std::sync::Arc;

use crate::error::Result;
use crate::request::{ClipRect, SettingKey, SettingValue};
use crate::Viewport;

#[cfg(feature = "fetch")]
pub mod fetch;

#[cfg(feature = "cdp")]
pub mod chrome;

/// Terminal status of an open attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    Success,
    Failure,
}

impl OpenStatus {
    pub fn is_success(self) -> bool {
        matches!(self, OpenStatus::Success)
    }
}

/// A resource-load failure observed while a page was opening.
///
/// Recording one does not terminate the open; it only supplies the
/// diagnostic context reported when the navigation itself fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceError {
    pub reason: String,
    pub url: String,
}

/// One in-process page load: viewport, settings, clip rectangle, and the
/// open/render operations over it.
///
/// Implementations are created fresh per request and released exactly
/// once; they are driven from a single worker thread and need not be
/// thread-safe themselves.
pub trait PageEngine {
    /// Backend name used in operator-facing failure messages.
    fn name(&self) -> &'static str;

    /// Set the viewport the page lays out against.
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Restrict the captured image to a sub-region of the page.
    fn set_clip_rect(&mut self, clip: ClipRect) -> Result<()>;

    /// Apply one of the enumerated surface settings.
    fn apply_setting(&mut self, key: SettingKey, value: &SettingValue) -> Result<()>;

    /// Load `url`, blocking until the navigation resolves. Resource-load
    /// failures observed during the load are recorded for
    /// [`last_resource_error`](Self::last_resource_error) rather than
    /// surfaced here.
    fn open(&mut self, url: &str) -> OpenStatus;

    /// The most recent resource-load failure observed, if any.
    fn last_resource_error(&self) -> Option<ResourceError>;

    /// Rasterize the opened page to an image file at `path`.
    fn render(&mut self, path: &str) -> Result<()>;

    /// Release engine resources. Idempotent; called exactly once by the
    /// lifecycle regardless of which branch terminated it.
    fn release(&mut self);
}

/// Factory producing a fresh engine per request.
///
/// The factory runs on the request's worker thread, so the engine itself
/// does not have to be `Send`.
pub type EngineFactory = Arc<dyn Fn() -> Result<Box<dyn PageEngine>> + Send + Sync>;
