//! Twitter HTTP Client - Bearer-authenticated REST Client
//!
//! Wraps reqwest with the bearer header, retries with exponential
//! backoff on 429/5xx/transport errors, and the problem-document error
//! mapping of the v2 API. Implements the `RuleApi` and `TweetLookup`
//! ports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::auth::BearerAuth;
use super::types::{
  AddRulesRequest, ApiProblem, DeleteIds, DeleteRulesRequest, LookupResponse, RulesResponse,
};
use crate::domain::record::Engagement;
use crate::domain::rule::MatchRule;
use crate::error::ApiError;
use crate::ports::rules_api::{RemoteRule, RuleApi};
use crate::ports::tweet_lookup::TweetLookup;

const RULES_PATH: &str = "/2/tweets/search/stream/rules";
const TWEETS_PATH: &str = "/2/tweets";

/// Configuration for the Twitter HTTP client.
#[derive(Debug, Clone)]
pub struct TwitterClientConfig {
  /// Base URL for the v2 API.
  pub base_url: String,
  /// Request timeout for non-streaming calls.
  pub timeout: Duration,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for TwitterClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.twitter.com".to_string(),
      timeout: Duration::from_secs(30),
      max_retries: 3,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

/// REST client for the rule and lookup endpoints.
pub struct TwitterClient {
  /// Underlying HTTP client.
  http: Client,
  /// Bearer credential.
  auth: Arc<BearerAuth>,
  /// Client configuration.
  config: TwitterClientConfig,
}

impl TwitterClient {
  /// Create a new client.
  ///
  /// # Errors
  /// Fails only if the TLS backend cannot be initialised.
  pub fn new(auth: Arc<BearerAuth>, mut config: TwitterClientConfig) -> Result<Self, ApiError> {
    let http = Client::builder()
      .timeout(config.timeout)
      .user_agent(format!("twiver/{}", env!("CARGO_PKG_VERSION")))
      .pool_max_idle_per_host(2)
      .build()?;

    config.base_url = config.base_url.trim_end_matches('/').to_string();

    Ok(Self { http, auth, config })
  }

  /// GET `path` with query parameters and decode the JSON body.
  pub async fn get<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, &str)],
  ) -> Result<T, ApiError> {
    let url = format!("{}{}", self.config.base_url, path);
    let request = self.http.get(&url).query(query);
    let response = self.execute_with_retry(request, "GET", path).await?;
    Ok(response.json().await?)
  }

  /// POST a JSON body to `path` and decode the JSON response.
  pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    let url = format!("{}{}", self.config.base_url, path);
    let request = self.http.post(&url).json(body);
    let response = self.execute_with_retry(request, "POST", path).await?;
    Ok(response.json().await?)
  }

  /// Execute request with authentication and retries.
  async fn execute_with_retry(
    &self,
    request: RequestBuilder,
    method: &str,
    path: &str,
  ) -> Result<Response, ApiError> {
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = backoff_delay(self.config.retry_base_delay, attempt);
        debug!(attempt, delay_ms = delay.as_millis(), method, path, "Retrying request");
        sleep(delay).await;
      }

      let Some(req) = request.try_clone() else {
        break;
      };
      let req = req.header("Authorization", self.auth.header_value());

      match req.send().await {
        Ok(response) if response.status().is_success() => return Ok(response),
        Ok(response) => {
          let err = error_from_response(response).await;
          if !err.is_retryable() {
            return Err(err);
          }
          if err.status() == Some(StatusCode::TOO_MANY_REQUESTS.as_u16()) {
            warn!(method, path, "Rate limited by Twitter API, backing off");
          } else {
            warn!(error = %err, method, path, "Server error, retrying");
          }
          last_error = Some(err);
        }
        Err(e) => {
          warn!(error = %e, attempt, method, path, "Request failed");
          last_error = Some(e.into());
        }
      }
    }

    Err(last_error.unwrap_or_else(|| ApiError::Rejected("request body cannot be retried".into())))
  }
}

/// Exponential backoff before retry `attempt` (1-based), saturating.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Turn a non-success response into `ApiError::Status`.
pub(crate) async fn error_from_response(response: Response) -> ApiError {
  let status = response.status().as_u16();
  let body = response.text().await.unwrap_or_default();

  let message = serde_json::from_str::<ApiProblem>(&body)
    .ok()
    .filter(|p| p.title.is_some() || p.detail.is_some() || p.message.is_some())
    .map_or_else(
      || {
        if body.is_empty() {
          StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown error")
            .to_string()
        } else {
          body.clone()
        }
      },
      |p| p.describe(),
    );

  ApiError::Status { status, message }
}

fn rejected(errors: &[ApiProblem]) -> Option<ApiError> {
  if errors.is_empty() {
    return None;
  }
  let joined = errors
    .iter()
    .map(ApiProblem::describe)
    .collect::<Vec<_>>()
    .join("; ");
  Some(ApiError::Rejected(joined))
}

#[async_trait]
impl RuleApi for TwitterClient {
  #[instrument(skip(self))]
  async fn list_rules(&self) -> Result<Vec<RemoteRule>, ApiError> {
    let response: RulesResponse = self.get(RULES_PATH, &[]).await?;
    Ok(response.data.into_iter().map(RemoteRule::from).collect())
  }

  #[instrument(skip(self, ids), fields(count = ids.len()))]
  async fn delete_rules(&self, ids: &[String]) -> Result<usize, ApiError> {
    let body = DeleteRulesRequest {
      delete: DeleteIds { ids },
    };
    let response: RulesResponse = self.post(RULES_PATH, &body).await?;

    let summary = response
      .meta
      .and_then(|m| m.summary)
      .unwrap_or_default();
    if summary.deleted == 0 && !ids.is_empty() {
      if let Some(err) = rejected(&response.errors) {
        return Err(err);
      }
    }
    Ok(summary.deleted)
  }

  #[instrument(skip(self, rules), fields(count = rules.len()))]
  async fn add_rules(&self, rules: &[MatchRule]) -> Result<Vec<RemoteRule>, ApiError> {
    let response: RulesResponse = self.post(RULES_PATH, &AddRulesRequest { add: rules }).await?;

    if response.data.len() < rules.len() {
      if let Some(err) = rejected(&response.errors) {
        return Err(err);
      }
    }
    Ok(response.data.into_iter().map(RemoteRule::from).collect())
  }
}

#[async_trait]
impl TweetLookup for TwitterClient {
  #[instrument(skip(self, ids), fields(count = ids.len()))]
  async fn engagement(&self, ids: &[String]) -> Result<HashMap<String, Engagement>, ApiError> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }

    let joined = ids.join(",");
    let response: LookupResponse = self
      .get(
        TWEETS_PATH,
        &[("ids", joined.as_str()), ("tweet.fields", "public_metrics")],
      )
      .await?;

    Ok(response
      .data
      .into_iter()
      .map(|tweet| (tweet.id, tweet.public_metrics))
      .collect())
  }
}
