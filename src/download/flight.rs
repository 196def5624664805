//! Authenticated download of one IAGOS flight.

use std::fmt;
use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::HttpClient;
use super::constants::{NETCDF_EXTENSION, WRITE_CHUNK_BYTES};
use super::error::DownloadError;
use crate::auth::{AuthHeaders, TokenSource};
use crate::config::ClientConfig;

/// Result of a download attempt that reached the resource server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The body was written to `path`.
    Saved {
        /// Output file, `{output_dir}/{flight}.nc`.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// The server answered with a status other than 200. Nothing was written.
    Rejected {
        /// The HTTP status code.
        status: u16,
        /// Response body as text.
        body: String,
    },
}

impl DownloadOutcome {
    /// Whether the file was written.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { path, .. } => write!(f, "File downloaded : {}", path.display()),
            Self::Rejected { status, body } => write!(f, "Error {status}: {body}"),
        }
    }
}

/// Downloads flights from the IAGOS service.
#[derive(Debug, Clone)]
pub struct FlightDownloader {
    client: HttpClient,
    service_url: String,
    query: Vec<(String, String)>,
}

impl FlightDownloader {
    /// Creates a downloader for the service URL and query in `config`.
    #[must_use]
    pub fn new(client: HttpClient, config: &ClientConfig) -> Self {
        Self {
            client,
            service_url: config.service_url.clone(),
            query: config.download_query.clone(),
        }
    }

    /// Builds `{service_url}/{flight}?level=2&format=netcdf&type=timeseries`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] when the service URL is not a
    /// hierarchical URL.
    pub fn flight_url(&self, flight: &str) -> Result<Url, DownloadError> {
        let mut url = Url::parse(&self.service_url)
            .map_err(|_| DownloadError::invalid_url(&self.service_url))?;
        url.path_segments_mut()
            .map_err(|()| DownloadError::invalid_url(&self.service_url))?
            .pop_if_empty()
            .push(flight);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }

    /// Output file for `flight` inside `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidFlight`] for identifiers that would
    /// resolve outside `output_dir` (empty, `.`, `..`, or containing a path
    /// separator).
    pub fn output_path(flight: &str, output_dir: &Path) -> Result<PathBuf, DownloadError> {
        let escapes = flight.is_empty()
            || flight == "."
            || flight == ".."
            || flight.contains(['/', '\\', '\0']);
        if escapes {
            return Err(DownloadError::invalid_flight(flight));
        }
        Ok(output_dir.join(format!("{flight}.{NETCDF_EXTENSION}")))
    }

    /// Obtains a token from `token_source` and downloads one flight.
    ///
    /// On HTTP 200 the body is streamed into `{output_dir}/{flight}.nc`,
    /// replacing any previous file. Any other status is returned as
    /// [`DownloadOutcome::Rejected`] without touching the file system.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - the token source fails
    /// - the flight id or service URL is unusable
    /// - the request fails (network error, timeout)
    /// - writing to disk fails (the partial file is removed)
    #[instrument(skip(self, output_dir, token_source), fields(flight = %flight))]
    pub async fn download(
        &self,
        flight: &str,
        output_dir: &Path,
        token_source: &dyn TokenSource,
    ) -> Result<DownloadOutcome, DownloadError> {
        let file_path = Self::output_path(flight, output_dir)?;
        let url = self.flight_url(flight)?;

        let token = token_source.obtain_token().await?;
        let headers = AuthHeaders::from_token(&token)
            .to_header_map()
            .map_err(|_| DownloadError::InvalidToken)?;
        drop(token);

        debug!(%url, "requesting flight");
        let response = self
            .client
            .inner()
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .map_err(|e| DownloadError::network(url.as_str(), e))?;
            warn!(status = status.as_u16(), "download rejected by resource server");
            return Ok(DownloadOutcome::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let file = File::create(&file_path)
            .await
            .map_err(|e| DownloadError::io(file_path.clone(), e))?;

        let stream_result =
            stream_to_file(file, response.bytes_stream(), url.as_str(), &file_path).await;
        if stream_result.is_err() {
            debug!(path = %file_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&file_path).await;
        }
        let bytes = stream_result?;

        info!(path = %file_path.display(), bytes, "download complete");
        Ok(DownloadOutcome::Saved {
            path: file_path,
            bytes,
        })
    }
}

/// Streams body chunks to `file`, skipping empty chunks.
async fn stream_to_file<S, B>(
    file: File,
    stream: S,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, reqwest::Error>>,
    B: AsRef<[u8]>,
{
    let mut writer = BufWriter::with_capacity(WRITE_CHUNK_BYTES, file);
    let mut stream = std::pin::pin!(stream);
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        let chunk = chunk.as_ref();
        if chunk.is_empty() {
            continue;
        }

        writer
            .write_all(chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn downloader(service_url: &str) -> FlightDownloader {
        let config = ClientConfig {
            service_url: service_url.to_string(),
            ..ClientConfig::default()
        };
        FlightDownloader::new(HttpClient::new().unwrap(), &config)
    }

    #[test]
    fn test_flight_url_appends_segment_and_query() {
        let url = downloader("https://api.sedoo.fr/iagos-backend-test/v2.0/downloads")
            .flight_url("2023050203041714")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.sedoo.fr/iagos-backend-test/v2.0/downloads/2023050203041714?level=2&format=netcdf&type=timeseries"
        );
    }

    #[test]
    fn test_flight_url_ignores_trailing_slash() {
        let url = downloader("http://localhost:8080/downloads/")
            .flight_url("F1")
            .unwrap();
        assert_eq!(url.path(), "/downloads/F1");
    }

    #[test]
    fn test_flight_url_encodes_reserved_characters() {
        let url = downloader("http://localhost/downloads")
            .flight_url("a?b#c")
            .unwrap();
        assert_eq!(url.path(), "/downloads/a%3Fb%23c");
        assert_eq!(url.query(), Some("level=2&format=netcdf&type=timeseries"));
    }

    #[test]
    fn test_flight_url_rejects_non_hierarchical_service() {
        let result = downloader("mailto:ops@example.org").flight_url("F1");
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[test]
    fn test_output_path_is_flight_dot_nc() {
        let path = FlightDownloader::output_path("F1", Path::new("/tmp")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/F1.nc"));
    }

    #[test]
    fn test_output_path_rejects_escaping_ids() {
        for flight in ["", ".", "..", "../F1", "a/b", "a\\b"] {
            assert!(
                matches!(
                    FlightDownloader::output_path(flight, Path::new("/tmp")),
                    Err(DownloadError::InvalidFlight { .. })
                ),
                "{flight:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_stream_to_file_skips_empty_chunks() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("F1.nc");
        let file = File::create(&path).await.unwrap();
        let chunks = futures_util::stream::iter(vec![
            Ok::<Vec<u8>, reqwest::Error>(b"NC".to_vec()),
            Ok(Vec::new()),
            Ok(b"DATA".to_vec()),
            Ok(Vec::new()),
        ]);

        let bytes = stream_to_file(file, chunks, "http://localhost/F1", &path)
            .await
            .unwrap();

        assert_eq!(bytes, 6);
        assert_eq!(std::fs::read(&path).unwrap(), b"NCDATA");
    }

    #[test]
    fn test_outcome_messages() {
        let saved = DownloadOutcome::Saved {
            path: PathBuf::from("/tmp/F1.nc"),
            bytes: 6,
        };
        assert_eq!(saved.to_string(), "File downloaded : /tmp/F1.nc");
        let rejected = DownloadOutcome::Rejected {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(rejected.to_string(), "Error 404: not found");
        assert!(saved.is_saved());
        assert!(!rejected.is_saved());
    }
}
