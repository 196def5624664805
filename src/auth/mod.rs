//! Bearer token acquisition.
//!
//! A [`TokenSource`] yields one ENVRI-ID [`BearerToken`] per download. Two
//! sources exist: [`ManualTokenSource`] reads a pasted token, and
//! [`DeviceFlow`] runs the OAuth2 Device Authorization Grant (RFC 8628)
//! against the identity provider. Tokens are never cached, refreshed or
//! persisted.

mod device_flow;
mod error;
mod manual;
mod token;

pub use device_flow::{
    DEFAULT_POLL_INTERVAL_SECS, DEVICE_CODE_GRANT_TYPE, DeviceAuthorization, DeviceFlow,
    SLOW_DOWN_INCREMENT_SECS, Sleeper, TokenPoll, TokioSleeper, classify_token_response,
};
pub use error::AuthError;
pub use manual::{MANUAL_TOKEN_PROMPT, ManualTokenSource};
pub use token::{ACCEPT_OCTET_STREAM, AuthHeaders, BearerToken, TokenSource};
