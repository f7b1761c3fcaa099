//! Twitter v2 Request/Response Types
//!
//! Serialization types for the rule and lookup endpoints. Stream
//! payloads themselves are modelled in `domain::event`.

use serde::{Deserialize, Serialize};

use crate::domain::record::Engagement;
use crate::domain::rule::MatchRule;
use crate::ports::rules_api::RemoteRule;

/// `POST /2/tweets/search/stream/rules` body that creates rules.
#[derive(Debug, Clone, Serialize)]
pub struct AddRulesRequest<'a> {
  pub add: &'a [MatchRule],
}

/// `POST /2/tweets/search/stream/rules` body that deletes rules.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteRulesRequest<'a> {
  pub delete: DeleteIds<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteIds<'a> {
  pub ids: &'a [String],
}

/// Rule as returned by the rules endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRule {
  pub id: String,
  pub value: String,
  #[serde(default)]
  pub tag: Option<String>,
}

impl From<WireRule> for RemoteRule {
  fn from(rule: WireRule) -> Self {
    Self {
      id: rule.id,
      value: rule.value,
      tag: rule.tag,
    }
  }
}

/// Response of every call to the rules endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesResponse {
  /// Absent when no rules are registered.
  #[serde(default)]
  pub data: Vec<WireRule>,
  #[serde(default)]
  pub meta: Option<RulesMeta>,
  #[serde(default)]
  pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesMeta {
  #[serde(default)]
  pub summary: Option<RulesSummary>,
}

/// Counts reported after a create or delete.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RulesSummary {
  pub created: usize,
  pub not_created: usize,
  pub deleted: usize,
  pub not_deleted: usize,
}

/// One entry of an `errors` array, or a top-level problem document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiProblem {
  pub title: Option<String>,
  pub detail: Option<String>,
  pub message: Option<String>,
  pub value: Option<String>,
}

impl ApiProblem {
  /// Most specific human-readable description available.
  pub fn describe(&self) -> String {
    let text = self
      .detail
      .clone()
      .or_else(|| self.message.clone())
      .or_else(|| self.title.clone())
      .unwrap_or_else(|| "unknown error".to_string());
    match &self.value {
      Some(value) => format!("{text} ({value})"),
      None => text,
    }
  }
}

/// `GET /2/tweets?ids=...` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupResponse {
  #[serde(default)]
  pub data: Vec<LookupTweet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupTweet {
  pub id: String,
  #[serde(default)]
  pub public_metrics: Engagement,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_add_request_shape() {
    let rules = vec![MatchRule::new("paris lang:fr", "Paris fr")];
    let json = serde_json::to_value(AddRulesRequest { add: &rules }).unwrap();
    assert_eq!(
      json,
      serde_json::json!({"add": [{"value": "paris lang:fr", "tag": "Paris fr"}]})
    );
  }

  #[test]
  fn test_delete_request_shape() {
    let ids = vec!["1".to_string(), "2".to_string()];
    let json = serde_json::to_value(DeleteRulesRequest {
      delete: DeleteIds { ids: &ids },
    })
    .unwrap();
    assert_eq!(json, serde_json::json!({"delete": {"ids": ["1", "2"]}}));
  }

  #[test]
  fn test_empty_rules_response() {
    let body = r#"{"meta": {"sent": "2021-06-01T10:00:00.000Z", "result_count": 0}}"#;
    let response: RulesResponse = serde_json::from_str(body).unwrap();
    assert!(response.data.is_empty());
  }

  #[test]
  fn test_problem_description() {
    let problem: ApiProblem = serde_json::from_str(
      r#"{"value": "paris", "id": "1", "title": "DuplicateRule"}"#,
    )
    .unwrap();
    assert_eq!(problem.describe(), "DuplicateRule (paris)");
  }
}
