//! HTTP client shared by the identity-provider and download requests.

use std::time::Duration;

use reqwest::Client;
use tracing::instrument;

use super::error::DownloadError;
use crate::config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS};
use crate::user_agent;

/// Thin wrapper around a configured `reqwest::Client`.
///
/// Create once and clone freely; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default timeouts (30s connect, 5min read).
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] when the TLS backend or system
    /// configuration prevents building a client.
    pub fn new() -> Result<Self, DownloadError> {
        Self::new_with_timeouts(DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS)
    }

    /// Creates a client with the timeouts from `config`.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn from_config(config: &ClientConfig) -> Result<Self, DownloadError> {
        Self::new_with_timeouts(config.connect_timeout_secs, config.read_timeout_secs)
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    #[instrument(level = "debug")]
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}
