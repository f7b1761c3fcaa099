//! Rule API Port - Filtered Stream Rule Management
//!
//! The remote side keeps one rule set per credential. Reconciling it
//! takes three calls: list what is there, delete it, add ours.

use async_trait::async_trait;

use crate::domain::rule::MatchRule;
use crate::error::ApiError;

/// A rule as registered on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRule {
  /// Server-assigned rule ID, echoed in `matching_rules`.
  pub id: String,
  /// Query expression.
  pub value: String,
  /// Tag, if one was set when the rule was created.
  pub tag: Option<String>,
}

/// Trait for the filtered-stream rule endpoint.
#[async_trait]
pub trait RuleApi: Send + Sync + 'static {
  /// List every rule currently registered for the credential.
  async fn list_rules(&self) -> Result<Vec<RemoteRule>, ApiError>;

  /// Delete rules by ID in one request. Returns the number deleted.
  async fn delete_rules(&self, ids: &[String]) -> Result<usize, ApiError>;

  /// Create `rules` in one request. Returns the rules the API created.
  async fn add_rules(&self, rules: &[MatchRule]) -> Result<Vec<RemoteRule>, ApiError>;
}
