//! Authenticated NetCDF download.
//!
//! [`FlightDownloader`] asks a [`TokenSource`](crate::auth::TokenSource) for
//! one bearer token, issues a single GET for the flight and streams the body
//! to `{output_dir}/{flight}.nc`.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use iagos_envri::{BearerToken, ClientConfig, FlightDownloader, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let downloader = FlightDownloader::new(HttpClient::from_config(&config)?, &config);
//! let token = BearerToken::new(std::env::var("ENVRI_TOKEN")?);
//! let outcome = downloader
//!     .download("2022010112355202", Path::new("/tmp"), &token)
//!     .await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod flight;

pub use client::HttpClient;
pub use constants::{NETCDF_EXTENSION, WRITE_CHUNK_BYTES};
pub use error::DownloadError;
pub use flight::{DownloadOutcome, FlightDownloader};
