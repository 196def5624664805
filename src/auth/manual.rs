//! Manual token entry.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{AuthError, BearerToken, TokenSource};

/// Prompt shown before reading a pasted token.
pub const MANUAL_TOKEN_PROMPT: &str = "Please fill your ENVRI-ID token :";

/// Reads one pasted token per request from a line-oriented input.
///
/// The token is taken verbatim minus its line terminator; the resource server
/// decides whether it is valid. As a [`TokenSource`] the blocking read runs on
/// the tokio blocking pool.
pub struct ManualTokenSource {
    streams: Arc<Streams>,
}

struct Streams {
    input: Mutex<Box<dyn BufRead + Send>>,
    prompt: Mutex<Box<dyn Write + Send>>,
}

impl ManualTokenSource {
    /// Prompts on stderr and reads from stdin.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stderr())
    }

    /// Uses arbitrary input and prompt streams.
    pub fn new(input: impl BufRead + Send + 'static, prompt: impl Write + Send + 'static) -> Self {
        Self {
            streams: Arc::new(Streams {
                input: Mutex::new(Box::new(input)),
                prompt: Mutex::new(Box::new(prompt)),
            }),
        }
    }

    /// Prompts and reads a single line, blocking the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Input`] when the input is closed before a line is
    /// read or the streams fail.
    pub fn read_token(&self) -> Result<BearerToken, AuthError> {
        self.streams.read_token()
    }
}

impl Streams {
    fn read_token(&self) -> Result<BearerToken, AuthError> {
        {
            let mut prompt = self.prompt.lock().unwrap_or_else(PoisonError::into_inner);
            prompt
                .write_all(MANUAL_TOKEN_PROMPT.as_bytes())
                .and_then(|()| prompt.flush())
                .map_err(|source| AuthError::Input { source })?;
        }

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_line(&mut line)
            .map_err(|source| AuthError::Input { source })?;
        if read == 0 {
            return Err(AuthError::Input {
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "no token entered"),
            });
        }

        let token = line.trim_end_matches(['\r', '\n']);
        debug!(length = token.len(), "read manual token");
        Ok(BearerToken::new(token))
    }
}

#[async_trait]
impl TokenSource for ManualTokenSource {
    async fn obtain_token(&self) -> Result<BearerToken, AuthError> {
        let streams = Arc::clone(&self.streams);
        tokio::task::spawn_blocking(move || streams.read_token())
            .await
            .map_err(|e| AuthError::Input {
                source: io::Error::other(e),
            })?
    }
}
