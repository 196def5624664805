//! Error types for token acquisition.

use thiserror::Error;

/// Errors that end token acquisition.
///
/// Server payloads are carried verbatim so the operator sees what the
/// identity provider answered. None of the variants ever holds the token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Reading a manually entered token failed (closed stdin, EOF, ...).
    #[error("failed to read ENVRI-ID token from input: {source}")]
    Input {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Network-level error talking to the identity provider.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// The endpoint that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The device authorization endpoint answered with a non-200 status.
    #[error("Device authorization request failed (HTTP {status}): {body}")]
    DeviceAuthorizationFailed {
        /// The HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A response could not be decoded.
    #[error("invalid response from {url}: {detail}")]
    InvalidResponse {
        /// The endpoint that answered.
        url: String,
        /// What was wrong with the payload.
        detail: String,
    },

    /// The identity provider reported `expired_token`.
    #[error("Device code expired. Please restart the authentication process.")]
    Expired,

    /// The identity provider reported `access_denied`.
    #[error("Access denied by user.")]
    AccessDenied,

    /// The token endpoint answered 400 with an error code outside RFC 8628 polling.
    #[error("Authentication error: {body}")]
    Authorization {
        /// The OAuth2 `error` code, when present.
        error: Option<String>,
        /// Raw response body.
        body: String,
    },

    /// The token endpoint answered with a status other than 200 or 400.
    #[error("Token request failed: {status} - {body}")]
    TokenRequestFailed {
        /// The HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Polling would outlive the device code lifetime declared by the server.
    #[error("device authorization not completed within {expires_in} seconds")]
    DeadlineExceeded {
        /// Lifetime declared by the device authorization response.
        expires_in: u64,
    },
}

impl AuthError {
    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            detail: detail.into(),
        }
    }
}
