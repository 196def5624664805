//! Error types for the download module.
//!
//! A rejection by the resource server is not an error; it is reported through
//! [`DownloadOutcome::Rejected`](super::DownloadOutcome::Rejected). The
//! variants here cover failures that prevent a request or a write.

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::AuthError;

/// Errors that can occur during a flight download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No token could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// File system error while writing the NetCDF file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configured service URL cannot carry a flight path segment.
    #[error("invalid service URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The flight identifier cannot name a file inside the output directory.
    #[error("invalid flight identifier: {flight:?}")]
    InvalidFlight {
        /// The rejected identifier.
        flight: String,
    },

    /// The token contains bytes that cannot be sent in an HTTP header.
    #[error("bearer token contains characters not allowed in an HTTP header")]
    InvalidToken,
}

impl DownloadError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid flight error.
    pub fn invalid_flight(flight: impl Into<String>) -> Self {
        Self::InvalidFlight {
            flight: flight.into(),
        }
    }
}
