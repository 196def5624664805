//! IAGOS ENVRI Client Library
//!
//! Downloads IAGOS flight data as NetCDF from the AERIS-protected IAGOS API.
//! Access requires an ENVRI-ID bearer token, which the resource server
//! introspects before serving the file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Token sources: manual entry and the OAuth2 device flow
//! - [`config`] - Endpoint, client and timeout configuration
//! - [`download`] - Authenticated streaming download of one flight
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use iagos_envri::{ClientConfig, DeviceFlow, FlightDownloader, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let client = HttpClient::from_config(&config)?;
//! let flow = DeviceFlow::new(client.clone(), &config);
//! let downloader = FlightDownloader::new(client, &config);
//! let outcome = downloader
//!     .download("2023050203041714", Path::new("/tmp"), &flow)
//!     .await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod download;
mod user_agent;

// Re-export commonly used types
pub use auth::{
    AuthError, AuthHeaders, BearerToken, DeviceAuthorization, DeviceFlow, ManualTokenSource,
    Sleeper, TokenPoll, TokenSource, TokioSleeper,
};
pub use config::{ClientConfig, FileConfig, LoadedConfig, load_default_file_config};
pub use download::{DownloadError, DownloadOutcome, FlightDownloader, HttpClient};
