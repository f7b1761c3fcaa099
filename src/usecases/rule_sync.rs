//! Rule Synchronizer - Reconcile Remote Stream Rules
//!
//! Makes the remote rule set equal to ours: list, delete everything,
//! add ours in one batch. Idempotent, not atomic. A failure after the
//! delete leaves the remote side empty and the next call recreates it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::rule::RuleSet;
use crate::error::{AdapterError, ApiError, RuleSyncStage};
use crate::ports::rules_api::{RemoteRule, RuleApi};

/// Installs a `RuleSet` through the `RuleApi` port.
pub struct RuleSynchronizer<R: RuleApi> {
  api: Arc<R>,
}

impl<R: RuleApi> RuleSynchronizer<R> {
  pub fn new(api: Arc<R>) -> Self {
    Self { api }
  }

  /// Replace whatever is registered remotely with `rules`.
  ///
  /// Returns the remote rules as created, in request order.
  ///
  /// # Errors
  /// `AdapterError::RuleSync` naming the stage that failed. A create
  /// call that reports fewer rules than requested also fails here.
  #[instrument(skip(self, rules), fields(requested = rules.len()))]
  pub async fn sync(&self, rules: &RuleSet) -> Result<Vec<RemoteRule>, AdapterError> {
    let existing = self.api.list_rules().await.map_err(|source| AdapterError::RuleSync {
      stage: RuleSyncStage::Listing,
      source,
    })?;

    let mut deleted = 0;
    if !existing.is_empty() {
      let ids: Vec<String> = existing.iter().map(|r| r.id.clone()).collect();
      deleted = self.api.delete_rules(&ids).await.map_err(|source| {
        AdapterError::RuleSync {
          stage: RuleSyncStage::Deleting {
            existing: existing.len(),
          },
          source,
        }
      })?;

      if deleted < existing.len() {
        warn!(
          existing = existing.len(),
          deleted, "Not every remote rule was deleted"
        );
      }
    }

    let creating = RuleSyncStage::Creating {
      deleted,
      requested: rules.len(),
    };

    let created = self
      .api
      .add_rules(rules.as_slice())
      .await
      .map_err(|source| AdapterError::RuleSync {
        stage: creating,
        source,
      })?;

    if created.len() != rules.len() {
      return Err(AdapterError::RuleSync {
        stage: creating,
        source: ApiError::Rejected(format!(
          "created {} of {} rules",
          created.len(),
          rules.len()
        )),
      });
    }

    info!(deleted, created = created.len(), "Stream rules installed");
    Ok(created)
  }
}

/// Remote rule ID → tag, for events whose `matching_rules` omit the tag.
pub fn tags_by_id(installed: &[RemoteRule], rules: &RuleSet) -> HashMap<String, String> {
  installed
    .iter()
    .filter_map(|remote| {
      let tag = remote
        .tag
        .clone()
        .or_else(|| rules.tag_for_value(&remote.value).map(str::to_string))?;
      Some((remote.id.clone(), tag))
    })
    .collect()
}
