//! Bearer token, request headers and the token-source seam.

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};

use super::AuthError;

/// Media type requested from the download service.
pub const ACCEPT_OCTET_STREAM: &str = "application/octet-stream";

/// Opaque ENVRI-ID bearer credential.
///
/// `Debug` output is redacted; use [`BearerToken::secret`] to read the value.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token string. No format validation is applied.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// The `Authorization` and `Accept` headers for one download request.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    authorization: String,
    accept: &'static str,
}

impl AuthHeaders {
    /// Builds `Authorization: Bearer <token>` and `Accept: application/octet-stream`.
    #[must_use]
    pub fn from_token(token: &BearerToken) -> Self {
        Self {
            authorization: format!("Bearer {}", token.secret()),
            accept: ACCEPT_OCTET_STREAM,
        }
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// Value of the `Accept` header.
    #[must_use]
    pub fn accept(&self) -> &str {
        self.accept
    }

    /// Converts into a header map, marking the credential as sensitive.
    ///
    /// # Errors
    ///
    /// Fails when the token contains bytes that are not allowed in an HTTP
    /// header value (control characters, for instance).
    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut authorization = HeaderValue::from_str(&self.authorization)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));
        Ok(headers)
    }
}

impl fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("authorization", &"Bearer <redacted>")
            .field("accept", &self.accept)
            .finish()
    }
}

/// Anything able to hand out one bearer token on demand.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtains a fresh token for a single request.
    async fn obtain_token(&self) -> Result<BearerToken, AuthError>;
}

/// An already known token is its own source.
#[async_trait]
impl TokenSource for BearerToken {
    async fn obtain_token(&self) -> Result<BearerToken, AuthError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_headers_wrap_token_as_bearer() {
        let headers = AuthHeaders::from_token(&BearerToken::new("tok123"));
        assert_eq!(headers.authorization(), "Bearer tok123");
        assert_eq!(headers.accept(), "application/octet-stream");
    }

    #[test]
    fn test_auth_headers_accept_any_token_text() {
        let headers = AuthHeaders::from_token(&BearerToken::new(""));
        assert_eq!(headers.authorization(), "Bearer ");
    }

    #[test]
    fn test_header_map_contains_exactly_two_headers() {
        let map = AuthHeaders::from_token(&BearerToken::new("abc.def.ghi"))
            .to_header_map()
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[AUTHORIZATION], "Bearer abc.def.ghi");
        assert!(map[AUTHORIZATION].is_sensitive());
        assert_eq!(map[ACCEPT], "application/octet-stream");
    }

    #[test]
    fn test_header_map_rejects_control_characters() {
        let headers = AuthHeaders::from_token(&BearerToken::new("bad\ntoken"));
        assert!(headers.to_header_map().is_err());
    }

    #[test]
    fn test_debug_output_redacts_token() {
        let token = BearerToken::new("super-secret-value");
        let headers = AuthHeaders::from_token(&token);
        let rendered = format!("{token:?} {headers:?}");
        assert!(!rendered.contains("super-secret-value"), "leaked: {rendered}");
        assert!(rendered.contains("redacted"));
    }

    #[tokio::test]
    async fn test_bearer_token_is_its_own_source() {
        let token = BearerToken::new("static");
        let obtained = token.obtain_token().await.unwrap();
        assert_eq!(obtained.secret(), "static");
    }
}
