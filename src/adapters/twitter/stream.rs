//! Twitter filtered stream connection.
//!
//! Opens the long-lived `GET /2/tweets/search/stream` request and splits
//! the chunked NDJSON body into lines. Reconnection is the caller's
//! business (`usecases::stream_adapter`); this module only ever holds
//! one connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, info, instrument};

use super::auth::BearerAuth;
use super::client::error_from_response;
use crate::error::ApiError;
use crate::ports::tweet_source::{LineStream, StreamConnector};

const STREAM_PATH: &str = "/2/tweets/search/stream";

/// Fields requested for every streamed tweet.
const STREAM_QUERY: [(&str, &str); 3] = [
    ("tweet.fields", "created_at,public_metrics,entities,in_reply_to_user_id"),
    ("expansions", "author_id"),
    ("user.fields", "public_metrics"),
];

/// Twitter sends a keep-alive every 20s; three missed ones means the
/// connection is dead.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(90);

/// Opens filtered-stream connections.
pub struct HttpStreamConnector {
    http: Client,
    auth: Arc<BearerAuth>,
    url: String,
}

impl HttpStreamConnector {
    /// Create a connector for the API at `base_url`.
    ///
    /// # Errors
    /// Fails only if the TLS backend cannot be initialised.
    pub fn new(auth: Arc<BearerAuth>, base_url: &str) -> Result<Self, ApiError> {
        Self::with_read_timeout(auth, base_url, DEFAULT_READ_TIMEOUT)
    }

    /// Like `new`, with a custom idle read timeout.
    ///
    /// # Errors
    /// Fails only if the TLS backend cannot be initialised.
    pub fn with_read_timeout(
        auth: Arc<BearerAuth>,
        base_url: &str,
        read_timeout: Duration,
    ) -> Result<Self, ApiError> {
        // No total timeout: the response body never ends on its own.
        let http = Client::builder()
            .read_timeout(read_timeout)
            .user_agent(format!("twiver/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            auth,
            url: format!("{}{STREAM_PATH}", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl StreamConnector for HttpStreamConnector {
    type Lines = HttpLineStream;

    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&self) -> Result<HttpLineStream, ApiError> {
        info!("Connecting to Twitter filtered stream");

        let response = self
            .http
            .get(&self.url)
            .query(&STREAM_QUERY)
            .header("Authorization", self.auth.header_value())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(HttpLineStream {
            body: response.bytes_stream().boxed(),
            buffer: LineBuffer::default(),
        })
    }
}

/// One open filtered-stream response.
///
/// Dropping it drops the response and closes the connection.
pub struct HttpLineStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: LineBuffer,
}

#[async_trait]
impl LineStream for HttpLineStream {
    async fn next_line(&mut self) -> Result<Option<String>, ApiError> {
        loop {
            if let Some(line) = self.buffer.next_line() {
                return Ok(Some(line));
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.buffer.push(&chunk),
                Some(Err(e)) => return Err(e.into()),
                None => {
                    debug!("Stream body ended");
                    return Ok(self.buffer.take_rest());
                }
            }
        }
    }
}

/// Reassembles newline-delimited lines from arbitrary chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Next complete line, without `\n` or a trailing `\r`.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Unterminated remainder at end of body, if any.
    pub fn take_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_split_across_chunks() {
        let mut buffer = LineBuffer::default();
        buffer.push(b"{\"data\":");
        assert_eq!(buffer.next_line(), None);

        buffer.push(b"1}\r\n{\"da");
        assert_eq!(buffer.next_line().as_deref(), Some("{\"data\":1}"));
        assert_eq!(buffer.next_line(), None);

        buffer.push(b"ta\":2}\n");
        assert_eq!(buffer.next_line().as_deref(), Some("{\"data\":2}"));
    }

    #[test]
    fn test_keepalive_yields_empty_line() {
        let mut buffer = LineBuffer::default();
        buffer.push(b"\r\n\r\n");
        assert_eq!(buffer.next_line().as_deref(), Some(""));
        assert_eq!(buffer.next_line().as_deref(), Some(""));
        assert_eq!(buffer.next_line(), None);
    }

    #[test]
    fn test_multibyte_char_split_between_chunks() {
        let text = "café\n".as_bytes();
        let mut buffer = LineBuffer::default();
        buffer.push(&text[..4]);
        buffer.push(&text[4..]);
        assert_eq!(buffer.next_line().as_deref(), Some("café"));
    }

    #[test]
    fn test_take_rest() {
        let mut buffer = LineBuffer::default();
        assert_eq!(buffer.take_rest(), None);
        buffer.push(b"tail\r");
        assert_eq!(buffer.take_rest().as_deref(), Some("tail"));
        assert_eq!(buffer.take_rest(), None);
    }

    #[test]
    fn test_stream_url() {
        let auth = Arc::new(BearerAuth::new("token").unwrap());
        let connector = HttpStreamConnector::new(auth, "https://api.twitter.com/").unwrap();
        assert_eq!(connector.url, "https://api.twitter.com/2/tweets/search/stream");
    }
}
