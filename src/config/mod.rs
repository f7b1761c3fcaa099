//! Configuration Module - TOML-based Stream Configuration
//!
//! Loads and validates configuration from `config.toml`. The bearer
//! token itself never lives in the file: only the name of the
//! environment variable that holds it.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::adapters::twitter::TwitterClientConfig;
use crate::domain::rule::MatchRule;
use crate::usecases::stream_adapter::StreamSettings;

/// Top-level configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the stream is opened.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Stream behaviour: credential source, delay, target.
  #[serde(default)]
  pub stream: StreamConfig,
  /// Match rules installed on the filtered stream.
  pub rules: Vec<RuleConfig>,
  /// Twitter API endpoint and client settings.
  #[serde(default)]
  pub api: ApiConfig,
  /// Delayed ground-truth label lookups.
  #[serde(default)]
  pub reveal: RevealConfig,
  /// Log output.
  #[serde(default)]
  pub logging: LoggingConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Stream behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
  /// Environment variable holding the bearer token.
  #[serde(default = "default_token_env")]
  pub bearer_token_env: String,
  /// Wait after a disconnect before reconnecting (seconds).
  #[serde(default = "default_delay")]
  pub delay_seconds: u64,
  /// Engagement metric used as label.
  #[serde(default = "default_target")]
  pub target: String,
}

/// One match rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
  /// Query expression.
  pub value: String,
  /// Tag copied onto matching records.
  pub tag: String,
}

/// API endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// v2 API base URL.
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Request timeout for rule and lookup calls (seconds).
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// Maximum retries on transient errors.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay between retries (milliseconds).
  #[serde(default = "default_retry_base_delay")]
  pub retry_base_delay_ms: u64,
  /// Remote limit on a rule's length (512 essential, 1024 elevated).
  #[serde(default = "default_max_rule_length")]
  pub max_rule_length: usize,
}

/// Delayed label reveal configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RevealConfig {
  /// Look tweets up again after `delay_seconds`.
  #[serde(default)]
  pub enabled: bool,
  /// Age (stream clock) at which a tweet's label is read (seconds).
  #[serde(default = "default_reveal_delay")]
  pub delay_seconds: u64,
  /// Tweets per lookup request (max 100).
  #[serde(default = "default_batch_size")]
  pub batch_size: usize,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub level: String,
  /// JSON lines (true) or human-readable text (false).
  #[serde(default = "default_true")]
  pub json: bool,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve /metrics, /live and /ready.
  #[serde(default)]
  pub enabled: bool,
  /// Server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl AppConfig {
  /// Rules in the order they appear in the file.
  pub fn match_rules(&self) -> Vec<MatchRule> {
    self
      .rules
      .iter()
      .map(|r| MatchRule::new(r.value.clone(), r.tag.clone()))
      .collect()
  }

  /// Settings for the stream adapter.
  pub fn stream_settings(&self) -> StreamSettings {
    StreamSettings {
      sample_rules: self.match_rules(),
      delay: Duration::from_secs(self.stream.delay_seconds),
      target: self.stream.target.clone(),
      max_rule_length: self.api.max_rule_length,
    }
  }

  /// Settings for the REST client.
  pub fn client_config(&self) -> TwitterClientConfig {
    TwitterClientConfig {
      base_url: self.api.base_url.clone(),
      timeout: Duration::from_secs(self.api.timeout_seconds),
      max_retries: self.api.max_retries,
      retry_base_delay: Duration::from_millis(self.api.retry_base_delay_ms),
    }
  }
}

impl Default for StreamConfig {
  fn default() -> Self {
    Self {
      bearer_token_env: default_token_env(),
      delay_seconds: default_delay(),
      target: default_target(),
    }
  }
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_seconds: default_timeout(),
      max_retries: default_max_retries(),
      retry_base_delay_ms: default_retry_base_delay(),
      max_rule_length: default_max_rule_length(),
    }
  }
}

impl Default for RevealConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      delay_seconds: default_reveal_delay(),
      batch_size: default_batch_size(),
    }
  }
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      json: default_true(),
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_token_env() -> String {
  crate::adapters::twitter::DEFAULT_TOKEN_ENV.to_string()
}

fn default_delay() -> u64 {
  20
}

fn default_target() -> String {
  "retweet_count".to_string()
}

fn default_base_url() -> String {
  "https://api.twitter.com".to_string()
}

fn default_timeout() -> u64 {
  30
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_base_delay() -> u64 {
  200
}

fn default_max_rule_length() -> usize {
  crate::domain::rule::MAX_RULE_LENGTH
}

fn default_reveal_delay() -> u64 {
  3600
}

fn default_batch_size() -> usize {
  100
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
