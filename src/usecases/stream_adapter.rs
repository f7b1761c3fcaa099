//! Stream Adapter - Labelled Observations from the Filtered Stream
//!
//! Pull-driven: each call to `next_observation` reads lines from the
//! open connection until one parses into a record, reconnecting after
//! the configured delay whenever the connection drops. The sequence
//! index never resets across reconnects.
//!
//! Suspension points:
//! - awaiting the next line on the open connection
//! - sleeping out the reconnect delay after a disconnect

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::StreamMetrics;
use crate::domain::event::RawEvent;
use crate::domain::record::{Observation, Target};
use crate::domain::rule::{MatchRule, RuleSet, MAX_RULE_LENGTH};
use crate::error::{AdapterError, ApiError};
use crate::ports::rules_api::RuleApi;
use crate::ports::tweet_source::{LineStream, StreamConnector};
use crate::usecases::rule_sync::{tags_by_id, RuleSynchronizer};

/// Default spacing between a disconnect and the next connect attempt.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(20);

/// Everything the adapter needs besides its ports.
#[derive(Debug, Clone)]
pub struct StreamSettings {
  /// Rules to install on first use.
  pub sample_rules: Vec<MatchRule>,
  /// Minimum wait after a disconnect before reconnecting.
  pub delay: Duration,
  /// Name of the engagement metric used as label.
  pub target: String,
  /// Remote limit on a rule's query length.
  pub max_rule_length: usize,
}

impl StreamSettings {
  pub fn new(sample_rules: Vec<MatchRule>, target: impl Into<String>) -> Self {
    Self {
      sample_rules,
      delay: DEFAULT_DELAY,
      target: target.into(),
      max_rule_length: MAX_RULE_LENGTH,
    }
  }

  #[must_use]
  pub const fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }
}

/// Unbounded, non-restartable producer of `Observation`s.
///
/// Not meant for concurrent consumers; every pull takes `&mut self`.
pub struct TweetStream<C: StreamConnector, R: RuleApi> {
  connector: C,
  synchronizer: RuleSynchronizer<R>,
  rules: RuleSet,
  target: Target,
  delay: Duration,
  /// Remote rule ID → tag; `None` until rules are installed.
  installed: Option<HashMap<String, String>>,
  connection: Option<C::Lines>,
  disconnected_at: Option<Instant>,
  next_index: u64,
  parse_warnings: u64,
  reconnects: u64,
  /// Set once the credential is rejected; replayed on every pull.
  terminated: Option<(u16, String)>,
  metrics: Option<Arc<StreamMetrics>>,
}

impl<C: StreamConnector, R: RuleApi> TweetStream<C, R> {
  /// Validate settings and assemble the adapter. No network I/O.
  ///
  /// # Errors
  /// `AdapterError::Configuration` for an unknown target or an
  /// invalid rule set.
  pub fn new(connector: C, rule_api: Arc<R>, settings: StreamSettings) -> Result<Self, AdapterError> {
    let target: Target = settings.target.parse()?;
    let rules = RuleSet::new(settings.sample_rules, settings.max_rule_length)?;

    Ok(Self {
      connector,
      synchronizer: RuleSynchronizer::new(rule_api),
      rules,
      target,
      delay: settings.delay,
      installed: None,
      connection: None,
      disconnected_at: None,
      next_index: 0,
      parse_warnings: 0,
      reconnects: 0,
      terminated: None,
      metrics: None,
    })
  }

  /// Report counters into a Prometheus registry.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<StreamMetrics>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub const fn target(&self) -> Target {
    self.target
  }

  pub const fn rules(&self) -> &RuleSet {
    &self.rules
  }

  /// Index the next observation will carry.
  pub const fn next_index(&self) -> u64 {
    self.next_index
  }

  /// Lines skipped because they did not parse.
  pub const fn parse_warnings(&self) -> u64 {
    self.parse_warnings
  }

  /// Connections re-opened after a disconnect.
  pub const fn reconnects(&self) -> u64 {
    self.reconnects
  }

  pub const fn is_connected(&self) -> bool {
    self.connection.is_some()
  }

  /// Install the rule set remotely. Runs automatically on first pull.
  ///
  /// Safe to call again after a `RuleSync` error.
  ///
  /// # Errors
  /// `AdapterError::RuleSync` if any of the rule calls fail.
  pub async fn install_rules(&mut self) -> Result<usize, AdapterError> {
    let created = self.synchronizer.sync(&self.rules).await?;
    let tags = tags_by_id(&created, &self.rules);
    self.installed = Some(tags);
    Ok(created.len())
  }

  /// Pull the next observation, waiting and reconnecting as needed.
  ///
  /// # Errors
  /// - `AdapterError::RuleSync` if rules are not installed yet and
  ///   installing them fails; the next pull retries.
  /// - `AdapterError::Auth` once the endpoint rejects the credential;
  ///   the sequence is over and every later pull returns it again.
  #[instrument(skip(self), fields(index = self.next_index))]
  pub async fn next_observation(&mut self) -> Result<Observation, AdapterError> {
    if let Some((status, message)) = &self.terminated {
      return Err(AdapterError::Auth {
        status: *status,
        message: message.clone(),
      });
    }

    if self.installed.is_none() {
      self.install_rules().await?;
    }

    loop {
      let Some(connection) = self.connection.as_mut() else {
        self.open_connection().await?;
        continue;
      };

      let next = connection.next_line().await;
      match next {
        Ok(Some(line)) => {
          if line.trim().is_empty() {
            debug!("Keep-alive received");
            continue;
          }
          if let Some(observation) = self.observe_line(&line) {
            return Ok(observation);
          }
        }
        Ok(None) => {
          info!("Stream closed by remote");
          self.drop_connection();
        }
        Err(e) if e.is_auth_failure() => return Err(self.terminate(&e)),
        Err(e) => {
          warn!(error = %e, "Stream read failed");
          self.drop_connection();
        }
      }
    }
  }

  /// Consume the adapter as a `Stream`. Ends after the first error.
  pub fn into_stream(self) -> impl Stream<Item = Result<Observation, AdapterError>> {
    stream::unfold(Some(self), |state| async move {
      let mut adapter = state?;
      match adapter.next_observation().await {
        Ok(observation) => Some((Ok(observation), Some(adapter))),
        Err(e) => Some((Err(e), None)),
      }
    })
  }

  /// Connect once, honouring the reconnect delay.
  ///
  /// Transient failures are absorbed (the caller loops); only an auth
  /// failure escapes.
  async fn open_connection(&mut self) -> Result<(), AdapterError> {
    if let Some(at) = self.disconnected_at {
      match at.checked_add(self.delay) {
        Some(ready) if ready <= Instant::now() => {}
        Some(ready) => {
          info!(delay_secs = self.delay.as_secs_f64(), "Reconnecting after delay");
          sleep_until(ready).await;
        }
        // Past the clock's range; `sleep` saturates instead.
        None => {
          info!(delay_secs = self.delay.as_secs_f64(), "Reconnecting after delay");
          sleep(self.delay).await;
        }
      }
    }

    match self.connector.connect().await {
      Ok(lines) => {
        if self.disconnected_at.is_some() {
          self.reconnects += 1;
          if let Some(m) = &self.metrics {
            m.reconnects.inc();
          }
        }
        self.disconnected_at = None;
        self.connection = Some(lines);
        if let Some(m) = &self.metrics {
          m.set_connected(true);
        }
        info!(next_index = self.next_index, "Connected to filtered stream");
        Ok(())
      }
      Err(e) if e.is_auth_failure() => Err(self.terminate(&e)),
      Err(e) => {
        warn!(error = %e, retryable = e.is_retryable(), "Failed to connect to stream");
        self.drop_connection();
        Ok(())
      }
    }
  }

  fn observe_line(&mut self, line: &str) -> Option<Observation> {
    let installed = self.installed.as_ref()?;
    match RawEvent::parse(line) {
      Ok(event) => {
        let record = event.into_record(installed);
        let observation = Observation::new(self.next_index, record, self.target);
        self.next_index += 1;
        if let Some(m) = &self.metrics {
          m.observed(&observation.tag);
        }
        debug!(
          index = observation.index,
          tweet_id = %observation.features.id,
          tag = %observation.tag,
          "Observation ready"
        );
        Some(observation)
      }
      Err(warning) => {
        self.parse_warnings += 1;
        if let Some(m) = &self.metrics {
          m.parse_warnings.inc();
        }
        warn!(reason = %warning.reason, line = %warning.line, "Skipping stream line");
        None
      }
    }
  }

  fn drop_connection(&mut self) {
    self.connection = None;
    self.disconnected_at = Some(Instant::now());
    if let Some(m) = &self.metrics {
      m.set_connected(false);
    }
  }

  fn terminate(&mut self, error: &ApiError) -> AdapterError {
    let status = error.status().unwrap_or(401);
    let message = match error {
      ApiError::Status { message, .. } => message.clone(),
      other => other.to_string(),
    };
    warn!(status, message = %message, "Credential rejected, stream terminated");

    self.connection = None;
    if let Some(m) = &self.metrics {
      m.set_connected(false);
    }
    self.terminated = Some((status, message.clone()));
    AdapterError::Auth { status, message }
  }
}
