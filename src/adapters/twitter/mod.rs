//! Twitter v2 API Adapter
//!
//! Implements the ports against the real API:
//!
//! Sub-modules:
//! - `auth`: Bearer credential handling
//! - `client`: REST client for rules and tweet lookup, with retries
//! - `stream`: Filtered-stream connection and NDJSON line splitting
//! - `types`: Request/response type definitions

pub mod auth;
pub mod client;
pub mod stream;
pub mod types;

use std::sync::Arc;

pub use auth::{BearerAuth, DEFAULT_TOKEN_ENV};
pub use client::{TwitterClient, TwitterClientConfig};
pub use stream::{HttpLineStream, HttpStreamConnector, LineBuffer};

use crate::error::AdapterError;
use crate::usecases::stream_adapter::{StreamSettings, TweetStream};

/// Stream adapter wired to the live Twitter API.
pub type TwitterStream = TweetStream<HttpStreamConnector, TwitterClient>;

/// Everything needed to open a live stream.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Bearer credential, as passed by the caller.
    pub bearer_token: String,
    /// Rules, delay and target.
    pub settings: StreamSettings,
    /// REST client settings; its `base_url` is used for the stream too.
    pub client: TwitterClientConfig,
}

/// Build a `TwitterStream` and the client it shares its credential with.
///
/// Validates the credential, rules and target; makes no network call.
/// The returned client also serves tweet lookups for label reveal.
///
/// # Errors
/// `AdapterError::AuthConfiguration` for a blank credential,
/// `AdapterError::Configuration` for invalid settings or a TLS backend
/// that cannot be initialised.
pub fn open_stream(options: StreamOptions) -> Result<(TwitterStream, Arc<TwitterClient>), AdapterError> {
    let auth = Arc::new(BearerAuth::new(options.bearer_token)?);

    let client = TwitterClient::new(Arc::clone(&auth), options.client.clone())
        .map(Arc::new)
        .map_err(|e| AdapterError::Configuration(format!("HTTP client: {e}")))?;
    let connector = HttpStreamConnector::new(auth, &options.client.base_url)
        .map_err(|e| AdapterError::Configuration(format!("HTTP client: {e}")))?;

    let stream = TweetStream::new(connector, Arc::clone(&client), options.settings)?;
    Ok((stream, client))
}
