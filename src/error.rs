//! Error types for discovery, rendering and merging

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a blog into a PDF
#[derive(Error, Debug)]
pub enum Error {
    /// An HTTP request failed or returned an error status
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered but not with what the REST API promises
    #[error("Unexpected API response: {0}")]
    Protocol(String),

    /// The server rejected the request as a bot (406 Not Acceptable)
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The PDF engine failed on one URL
    #[error("Rendering {url} failed: {reason}")]
    Render { url: String, reason: String },

    /// Merging the rendered PDFs failed
    #[error("Merge failed: {0}")]
    Merge(String),

    /// Filesystem error on a specific path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Network {
            url: url.into(),
            source,
        }
    }
}
