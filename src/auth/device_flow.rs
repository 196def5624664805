//! OAuth2 Device Authorization Grant (RFC 8628).
//!
//! The flow has two steps. [`DeviceFlow::request_authorization`] asks the
//! identity provider for a device code and a verification URI for the
//! operator. [`DeviceFlow::wait_for_token`] then polls the token endpoint
//! until the operator approves, denies, or the device code expires.
//!
//! Polling honours the server-provided `interval`, adds
//! [`SLOW_DOWN_INCREMENT_SECS`] on every `slow_down`, and stops once the
//! accumulated wait would exceed `expires_in`. The interval never drops below
//! [`MIN_POLL_INTERVAL_SECS`], so the bound holds even for `"interval": 0`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{AuthError, BearerToken, TokenSource};
use crate::config::ClientConfig;
use crate::download::HttpClient;

/// Grant type sent to the token endpoint while polling.
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Polling interval when the server omits one (RFC 8628 §3.2).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Interval increase mandated for each `slow_down` answer (RFC 8628 §3.5).
pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

/// Lower bound on the polling interval; a server-sent `0` is raised to this.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

fn default_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Device authorization response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceAuthorization {
    /// Opaque code identifying this authorization on the token endpoint.
    pub device_code: String,
    /// Short code the operator types at `verification_uri`.
    #[serde(default)]
    pub user_code: Option<String>,
    /// Page where the operator enters `user_code`.
    #[serde(default)]
    pub verification_uri: Option<String>,
    /// Page with the user code already embedded.
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Lifetime of the device code in seconds.
    pub expires_in: u64,
    /// Minimum seconds between token requests.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl DeviceAuthorization {
    /// Human-readable instructions for the operator.
    #[must_use]
    pub fn instructions(&self) -> String {
        let target = match (
            &self.verification_uri_complete,
            &self.verification_uri,
            &self.user_code,
        ) {
            (Some(complete), _, _) => format!("Please open this URL in your browser:\n{complete}"),
            (None, Some(uri), Some(code)) => {
                format!("Please open this URL in your browser:\n{uri}\nand enter the code: {code}")
            }
            (None, Some(uri), None) => format!("Please open this URL in your browser:\n{uri}"),
            (None, None, _) => "The identity provider did not return a verification URL.".into(),
        };
        format!(
            "{target}\n\nWaiting for authentication... (expires in {} seconds)",
            self.expires_in
        )
    }
}

/// Outcome of one token request that does not end the flow with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPoll {
    /// The operator approved; the access token is ready.
    Authorized(BearerToken),
    /// `authorization_pending`: ask again after `interval`.
    Pending,
    /// `slow_down`: ask again after `interval + 5`.
    SlowDown,
    /// `expired_token`.
    Expired,
    /// `access_denied`.
    AccessDenied,
}

#[derive(Deserialize)]
struct TokenSuccess {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenFailure {
    #[serde(default)]
    error: Option<String>,
}

/// Classifies a token endpoint response.
///
/// # Errors
///
/// Returns an error for every answer that is neither a token nor one of the
/// four RFC 8628 polling codes. A 400 with another or missing `error` code,
/// including an undecodable body, is [`AuthError::Authorization`] carrying
/// the raw payload. Other statuses are [`AuthError::TokenRequestFailed`].
pub fn classify_token_response(
    url: &str,
    status: StatusCode,
    body: &str,
) -> Result<TokenPoll, AuthError> {
    match status.as_u16() {
        200 => {
            let success: TokenSuccess = serde_json::from_str(body).map_err(|e| {
                AuthError::invalid_response(url, format!("token response without access_token: {e}"))
            })?;
            Ok(TokenPoll::Authorized(BearerToken::new(success.access_token)))
        }
        400 => {
            let error = serde_json::from_str::<TokenFailure>(body)
                .ok()
                .and_then(|failure| failure.error);
            match error.as_deref() {
                Some("authorization_pending") => Ok(TokenPoll::Pending),
                Some("slow_down") => Ok(TokenPoll::SlowDown),
                Some("expired_token") => Ok(TokenPoll::Expired),
                Some("access_denied") => Ok(TokenPoll::AccessDenied),
                _ => Err(AuthError::Authorization {
                    error,
                    body: body.to_string(),
                }),
            }
        }
        other => Err(AuthError::TokenRequestFailed {
            status: other,
            body: body.to_string(),
        }),
    }
}

/// Suspends the polling loop between token requests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

type VerificationNotice = Arc<dyn Fn(&DeviceAuthorization) + Send + Sync>;

/// Device Authorization Grant client.
#[derive(Clone)]
pub struct DeviceFlow {
    client: HttpClient,
    device_authorization_url: String,
    token_url: String,
    client_id: String,
    scope: String,
    sleeper: Arc<dyn Sleeper>,
    notice: VerificationNotice,
}

impl fmt::Debug for DeviceFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceFlow")
            .field("device_authorization_url", &self.device_authorization_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl DeviceFlow {
    /// Creates a flow against the endpoints and client identity in `config`.
    ///
    /// Operator instructions are logged at info level until
    /// [`with_notice`](Self::with_notice) replaces them.
    #[must_use]
    pub fn new(client: HttpClient, config: &ClientConfig) -> Self {
        Self {
            client,
            device_authorization_url: config.device_authorization_url(),
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            scope: config.scope.clone(),
            sleeper: Arc::new(TokioSleeper),
            notice: Arc::new(|authorization: &DeviceAuthorization| {
                info!("{}", authorization.instructions());
            }),
        }
    }

    /// Replaces the sleeper used between polls.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces how the verification URI is shown to the operator.
    #[must_use]
    pub fn with_notice(
        mut self,
        notice: impl Fn(&DeviceAuthorization) + Send + Sync + 'static,
    ) -> Self {
        self.notice = Arc::new(notice);
        self
    }

    /// Runs the whole flow and returns the access token.
    ///
    /// # Errors
    ///
    /// See [`request_authorization`](Self::request_authorization) and
    /// [`wait_for_token`](Self::wait_for_token).
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    pub async fn authorize(&self) -> Result<BearerToken, AuthError> {
        info!("initiating OAuth2 device flow");
        let authorization = self.request_authorization().await?;
        (self.notice)(&authorization);
        self.wait_for_token(&authorization).await
    }

    /// Requests a device code.
    ///
    /// # Errors
    ///
    /// Any status other than 200 yields
    /// [`AuthError::DeviceAuthorizationFailed`] immediately, without retry.
    pub async fn request_authorization(&self) -> Result<DeviceAuthorization, AuthError> {
        let url = &self.device_authorization_url;
        debug!(%url, scope = %self.scope, "requesting device authorization");

        let response = self
            .client
            .inner()
            .post(url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::network(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::network(url, e))?;

        if status != StatusCode::OK {
            return Err(AuthError::DeviceAuthorizationFailed {
                status: status.as_u16(),
                body,
            });
        }

        let authorization: DeviceAuthorization = serde_json::from_str(&body)
            .map_err(|e| AuthError::invalid_response(url, e.to_string()))?;
        debug!(
            expires_in = authorization.expires_in,
            interval = authorization.interval,
            "device authorization granted"
        );
        Ok(authorization)
    }

    /// Sends one token request for `device_code`.
    ///
    /// # Errors
    ///
    /// Transport failures and every terminal answer other than the RFC 8628
    /// polling codes; see [`classify_token_response`].
    pub async fn poll_once(&self, device_code: &str) -> Result<TokenPoll, AuthError> {
        let url = &self.token_url;
        let response = self
            .client
            .inner()
            .post(url)
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
                ("device_code", device_code),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::network(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::network(url, e))?;
        classify_token_response(url, status, &body)
    }

    /// Polls the token endpoint until the flow reaches a terminal state.
    ///
    /// # Errors
    ///
    /// [`AuthError::Expired`], [`AuthError::AccessDenied`],
    /// [`AuthError::DeadlineExceeded`], or any error from
    /// [`poll_once`](Self::poll_once).
    pub async fn wait_for_token(
        &self,
        authorization: &DeviceAuthorization,
    ) -> Result<BearerToken, AuthError> {
        let mut interval = authorization.interval.max(MIN_POLL_INTERVAL_SECS);
        let mut waited: u64 = 0;

        loop {
            match self.poll_once(&authorization.device_code).await? {
                TokenPoll::Authorized(token) => {
                    info!("authentication successful");
                    return Ok(token);
                }
                TokenPoll::Pending => {
                    info!(interval, "still waiting for authorization");
                }
                TokenPoll::SlowDown => {
                    interval = interval.saturating_add(SLOW_DOWN_INCREMENT_SECS);
                    warn!(interval, "slowing down polling");
                }
                TokenPoll::Expired => return Err(AuthError::Expired),
                TokenPoll::AccessDenied => return Err(AuthError::AccessDenied),
            }

            waited = waited.saturating_add(interval);
            if waited > authorization.expires_in {
                return Err(AuthError::DeadlineExceeded {
                    expires_in: authorization.expires_in,
                });
            }
            self.sleeper.sleep(Duration::from_secs(interval)).await;
        }
    }
}

#[async_trait]
impl TokenSource for DeviceFlow {
    async fn obtain_token(&self) -> Result<BearerToken, AuthError> {
        self.authorize().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const URL: &str = "https://idp.example/token";

    #[test]
    fn test_decode_device_authorization_with_defaults() {
        let payload = r#"{
            "device_code":"abc",
            "verification_uri_complete":"https://x",
            "expires_in":600
        }"#;
        let authorization: DeviceAuthorization = serde_json::from_str(payload).unwrap();
        assert_eq!(authorization.device_code, "abc");
        assert_eq!(authorization.interval, DEFAULT_POLL_INTERVAL_SECS);
        assert!(authorization.user_code.is_none());
    }

    #[test]
    fn test_instructions_prefer_complete_uri() {
        let authorization = DeviceAuthorization {
            device_code: "abc".into(),
            user_code: Some("WXYZ-1234".into()),
            verification_uri: Some("https://idp/device".into()),
            verification_uri_complete: Some("https://idp/device?user_code=WXYZ-1234".into()),
            expires_in: 600,
            interval: 5,
        };
        let text = authorization.instructions();
        assert!(text.contains("https://idp/device?user_code=WXYZ-1234"));
        assert!(text.contains("expires in 600 seconds"));
        assert!(!text.contains("enter the code"));
    }

    #[test]
    fn test_instructions_fall_back_to_user_code() {
        let authorization = DeviceAuthorization {
            device_code: "abc".into(),
            user_code: Some("WXYZ-1234".into()),
            verification_uri: Some("https://idp/device".into()),
            verification_uri_complete: None,
            expires_in: 300,
            interval: 5,
        };
        let text = authorization.instructions();
        assert!(text.contains("https://idp/device"));
        assert!(text.contains("enter the code: WXYZ-1234"));
    }

    #[test]
    fn test_classify_success() {
        let poll =
            classify_token_response(URL, StatusCode::OK, r#"{"access_token":"tok123"}"#).unwrap();
        assert_eq!(poll, TokenPoll::Authorized(BearerToken::new("tok123")));
    }

    #[test]
    fn test_classify_polling_codes() {
        let cases = [
            ("authorization_pending", TokenPoll::Pending),
            ("slow_down", TokenPoll::SlowDown),
            ("expired_token", TokenPoll::Expired),
            ("access_denied", TokenPoll::AccessDenied),
        ];
        for (code, expected) in cases {
            let body = format!(r#"{{"error":"{code}"}}"#);
            let poll = classify_token_response(URL, StatusCode::BAD_REQUEST, &body).unwrap();
            assert_eq!(poll, expected, "code {code}");
        }
    }

    #[test]
    fn test_classify_other_oauth_error_surfaces_payload() {
        let body = r#"{"error":"invalid_grant","error_description":"bad code"}"#;
        let err = classify_token_response(URL, StatusCode::BAD_REQUEST, body).unwrap_err();
        match err {
            AuthError::Authorization { error, body: raw } => {
                assert_eq!(error.as_deref(), Some("invalid_grant"));
                assert_eq!(raw, body);
            }
            other => panic!("expected Authorization, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_400_without_error_field() {
        let err = classify_token_response(URL, StatusCode::BAD_REQUEST, "{}").unwrap_err();
        assert!(matches!(err, AuthError::Authorization { error: None, .. }));
    }

    #[test]
    fn test_classify_undecodable_400_surfaces_raw_body() {
        let err =
            classify_token_response(URL, StatusCode::BAD_REQUEST, "<html>bad</html>").unwrap_err();
        match err {
            AuthError::Authorization { error, body } => {
                assert!(error.is_none());
                assert_eq!(body, "<html>bad</html>");
            }
            other => panic!("expected Authorization, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_unexpected_status() {
        let err =
            classify_token_response(URL, StatusCode::INTERNAL_SERVER_ERROR, "boom").unwrap_err();
        match err {
            AuthError::TokenRequestFailed { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected TokenRequestFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_success_without_token_is_invalid() {
        let err = classify_token_response(URL, StatusCode::OK, r#"{"token_type":"Bearer"}"#)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse { .. }));
    }
}
