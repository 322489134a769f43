//! Error types for the rasterization service

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a capture request
#[derive(Error, Debug)]
pub enum Error {
    /// The inbound request carried no `url` header
    #[error("Request must contain an url header")]
    MissingUrlHeader,

    /// A header value could not be parsed (malformed clipRect JSON etc.)
    #[error("{0}")]
    HeaderParse(String),

    /// Failed to allocate a render surface
    #[error("Surface allocation failed: {0}")]
    SurfaceInit(String),

    /// Failed to apply viewport/clip/settings to the render surface
    #[error("Surface configuration failed: {0}")]
    Configure(String),

    /// The engine reported a non-success open status
    #[error("{engine} could not open the WebPage [{url}] because: {reason}")]
    Navigation {
        engine: String,
        url: String,
        reason: String,
    },

    /// Failed to rasterize the page to the output path
    #[error("Rendering failed: {0}")]
    Render(String),

    /// The per-request worker went away before replying
    #[error("Surface worker terminated: {0}")]
    WorkerGone(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status the error maps onto: missing required field is the
    /// caller's fault, navigation failures are a bad gateway, everything
    /// else is an internal failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::MissingUrlHeader => 400,
            Error::Navigation { .. } => 502,
            _ => 500,
        }
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
