//! Rasterd
//!
//! An HTTP screenshot service: it waits for capture requests, opens the
//! requested URL in a headless page engine and rasterizes the result to a
//! PNG file under a base directory, reporting the outcome over HTTP.
//!
//! # Features
//!
//! - **Fetch Backend** (default): Pure-Rust page fetch + wireframe raster
//! - **CDP Backend**: Screenshots via Chrome DevTools Protocol
//! - **Per-Request Surfaces**: Every request gets a fresh engine instance,
//!   never shared and never pooled
//!
//! # Example
//!
//! ```no_run
//! use rasterd::{RasterService, ServiceConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rasterd::Result<()> {
//! let config = ServiceConfig {
//!     base_path: "/tmp/shots/".to_string(),
//!     port: 3001,
//!     ..Default::default()
//! };
//!
//! let handle = RasterService::new(config).start().await?;
//! println!("listening on {}", handle.addr());
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod engine;

pub mod request;

pub mod surface;

pub mod lifecycle;

pub mod serve;

// Wireframe rasterization pipeline backing the fetch engine
#[cfg(feature = "fetch")]
pub mod rendering;

// Re-export the service types at the crate root for ergonomic use
pub use serve::{RasterService, ServiceHandle};

/// Process-wide configuration for the service
///
/// The defaults mirror the service's historical command line: screenshots
/// land under `/tmp/`, the listener binds port 3001 and pages render into
/// a 1024x600 viewport unless the request says otherwise.
///
/// # Examples
///
/// ```
/// let cfg = rasterd::ServiceConfig::default();
/// assert_eq!(cfg.port, 3001);
/// assert_eq!(cfg.base_path, "/tmp/");
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory prefix for resolved output paths (used verbatim)
    pub base_path: String,
    /// TCP port the listener binds
    pub port: u16,
    /// Viewport applied when a request omits width/height
    pub default_viewport: Viewport,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_path: "/tmp/".to_string(),
            port: 3001,
            default_viewport: Viewport::default(),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 600,
        }
    }
}

/// Parse a `"WxH"` viewport argument.
///
/// Each component falls back to its default independently when missing,
/// zero or unparsable, so `"800x"` yields 800x600 and `"abc"` yields the
/// full default viewport.
pub fn parse_viewport_size(raw: &str) -> Viewport {
    let defaults = Viewport::default();
    let mut parts = raw.split('x');
    let width = parts
        .next()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|w| *w != 0)
        .unwrap_or(defaults.width);
    let height = parts
        .next()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|h| *h != 0)
        .unwrap_or(defaults.height);
    Viewport { width, height }
}

/// Create a new engine instance with the default backend
///
/// This prefers the pure-Rust fetch backend when the `fetch` feature is
/// enabled (default). If `fetch` is not enabled but `cdp` is, a Chrome
/// DevTools engine is created instead.
#[cfg(feature = "fetch")]
pub fn new_engine() -> Result<Box<dyn engine::PageEngine>> {
    Ok(Box::new(engine::fetch::FetchEngine::new()?))
}

// Fallback to CDP when the fetch backend is not enabled.
#[cfg(all(not(feature = "fetch"), feature = "cdp"))]
pub fn new_engine() -> Result<Box<dyn engine::PageEngine>> {
    Ok(Box::new(engine::chrome::ChromeEngine::new()?))
}
