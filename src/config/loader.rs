//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};

use super::AppConfig;
use crate::domain::record::Target;
use crate::domain::rule::RuleSet;
use crate::ports::tweet_lookup::MAX_LOOKUP_IDS;

/// Upper bound on `api.max_retries`.
const MAX_RETRIES: u32 = 10;

/// Upper bound on `stream.delay_seconds` (one day).
const MAX_STREAM_DELAY_SECS: u64 = 86_400;

/// Upper bound on `reveal.delay_seconds` (30 days).
const MAX_REVEAL_DELAY_SECS: u64 = 30 * 86_400;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  parse_config(&content)
}

/// Parse and validate configuration from TOML text.
///
/// # Errors
/// Fails on invalid TOML or any validation rule.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A non-empty, valid rule set
/// - A known target metric
/// - Sensible API and reveal settings
fn validate_config(config: &AppConfig) -> Result<()> {
  // Stream validation
  anyhow::ensure!(
    !config.stream.bearer_token_env.trim().is_empty(),
    "stream.bearer_token_env must name an environment variable"
  );
  config
    .stream
    .target
    .parse::<Target>()
    .context("Invalid stream.target")?;
  anyhow::ensure!(
    config.stream.delay_seconds <= MAX_STREAM_DELAY_SECS,
    "stream.delay_seconds must be at most {}, got {}",
    MAX_STREAM_DELAY_SECS,
    config.stream.delay_seconds
  );

  // Rule validation
  RuleSet::new(config.match_rules(), config.api.max_rule_length)
    .context("Invalid [[rules]]")?;

  // API validation
  anyhow::ensure!(
    !config.api.base_url.is_empty(),
    "api.base_url must not be empty"
  );
  anyhow::ensure!(
    config.api.timeout_seconds > 0,
    "api.timeout_seconds must be positive"
  );
  anyhow::ensure!(
    config.api.max_rule_length > 0,
    "api.max_rule_length must be positive"
  );
  anyhow::ensure!(
    config.api.max_retries <= MAX_RETRIES,
    "api.max_retries must be at most {}, got {}",
    MAX_RETRIES,
    config.api.max_retries
  );

  // Reveal validation
  if config.reveal.enabled {
    anyhow::ensure!(
      config.reveal.batch_size > 0 && config.reveal.batch_size <= MAX_LOOKUP_IDS,
      "reveal.batch_size must be in (0, {}], got {}",
      MAX_LOOKUP_IDS,
      config.reveal.batch_size
    );
    anyhow::ensure!(
      config.reveal.delay_seconds <= MAX_REVEAL_DELAY_SECS,
      "reveal.delay_seconds must be at most {}, got {}",
      MAX_REVEAL_DELAY_SECS,
      config.reveal.delay_seconds
    );
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINIMAL: &str = r#"
[[rules]]
value = "paris lang:fr"
tag = "Paris fr"
"#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = parse_config(MINIMAL).unwrap();
    assert_eq!(config.stream.bearer_token_env, "BEARER_TOKEN");
    assert_eq!(config.stream.delay_seconds, 20);
    assert_eq!(config.stream.target, "retweet_count");
    assert_eq!(config.api.base_url, "https://api.twitter.com");
    assert!(!config.reveal.enabled);
    assert!(config.logging.json);

    let settings = config.stream_settings();
    assert_eq!(settings.sample_rules.len(), 1);
    assert_eq!(settings.delay.as_secs(), 20);
  }

  #[test]
  fn test_unknown_target_rejected() {
    let content = format!("[stream]\ntarget = \"impression_count\"\n{MINIMAL}");
    assert!(parse_config(&content).is_err());
  }

  #[test]
  fn test_empty_rules_rejected() {
    assert!(parse_config("rules = []").is_err());
  }

  #[test]
  fn test_reveal_batch_size_bounded() {
    let content = format!("[reveal]\nenabled = true\nbatch_size = 500\n{MINIMAL}");
    assert!(parse_config(&content).is_err());
  }

  #[test]
  fn test_out_of_range_durations_rejected() {
    let reveal = format!("[reveal]\nenabled = true\ndelay_seconds = 10000000000000\n{MINIMAL}");
    assert!(parse_config(&reveal).is_err());

    let retries = format!("[api]\nmax_retries = 33\n{MINIMAL}");
    assert!(parse_config(&retries).is_err());

    let delay = format!("[stream]\ndelay_seconds = 100000\n{MINIMAL}");
    assert!(parse_config(&delay).is_err());

    let ok = format!("[api]\nmax_retries = 10\n[reveal]\nenabled = true\ndelay_seconds = 86400\n{MINIMAL}");
    assert!(parse_config(&ok).is_ok());
  }

  #[test]
  fn test_load_reads_file_without_subscriber() {
    // Runs before any tracing subscriber exists, as in main.
    let config = load_config("config.example.toml").unwrap();
    assert_eq!(config.stream.target, "retweet_count");
  }

  #[test]
  fn test_example_config_is_valid() {
    let config = parse_config(include_str!("../../config.example.toml")).unwrap();
    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.rules[0].tag, "Paris fr");
    assert_eq!(config.client_config().max_retries, 3);
  }
}
