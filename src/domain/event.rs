//! Raw filtered-stream payloads and their normalization into records.
//!
//! The stream delivers one JSON object per line:
//!
//! ```json
//! {"data": {...tweet...}, "includes": {"users": [{...author...}]},
//!  "matching_rules": [{"id": "...", "tag": "..."}]}
//! ```
//!
//! Everything except `data.id` and `data.created_at` may be missing and
//! is defaulted.

use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Deserialize;

use super::record::{AuthorMetrics, Engagement, Record};
use crate::error::ParseWarning;

/// One tweet as delivered by the filtered stream.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub data: TweetData,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub matching_rules: Vec<MatchedRule>,
}

/// Tweet fields requested on the stream connection.
#[derive(Debug, Clone, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub in_reply_to_user_id: Option<String>,
    #[serde(default)]
    pub public_metrics: Engagement,
}

/// Expansions attached to the tweet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<Author>,
}

/// Expanded author record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub public_metrics: AuthorMetrics,
}

/// Rule the API reports as having matched this tweet.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchedRule {
    pub id: String,
    #[serde(default)]
    pub tag: Option<String>,
}

impl RawEvent {
    /// Parse one stream line.
    ///
    /// # Errors
    /// A `ParseWarning` when the line is not JSON, is an error-only
    /// payload, or lacks `data.id` / `data.created_at`.
    pub fn parse(line: &str) -> Result<Self, ParseWarning> {
        serde_json::from_str(line).map_err(|e| {
            let reason = serde_json::from_str::<serde_json::Value>(line)
                .ok()
                .and_then(|v| stream_error_title(&v))
                .map_or_else(|| e.to_string(), |title| format!("stream error: {title}"));
            ParseWarning::new(line, reason)
        })
    }

    /// Tag of the first matching rule.
    ///
    /// Falls back to the installed rule with the same id when the API
    /// omits the tag, then to an empty tag.
    pub fn tag(&self, installed: &HashMap<String, String>) -> String {
        self.matching_rules
            .first()
            .and_then(|rule| {
                rule.tag
                    .clone()
                    .or_else(|| installed.get(&rule.id).cloned())
            })
            .unwrap_or_default()
    }

    /// Flatten into a `Record`, merging in the first author's metrics.
    pub fn into_record(self, installed: &HashMap<String, String>) -> Record {
        let tag = self.tag(installed);
        let author = self.includes.users.into_iter().next().unwrap_or_default();

        Record {
            created_at: self.data.created_at.trunc_subsecs(0),
            text: self.data.text,
            username: author.username,
            reply: self.data.in_reply_to_user_id.is_some(),
            id: self.data.id,
            engagement: self.data.public_metrics,
            author: author.public_metrics,
            tag,
        }
    }
}

/// Title or detail of an `{"errors": [...]}` payload injected into the stream.
fn stream_error_title(value: &serde_json::Value) -> Option<String> {
    let first = value.get("errors")?.as_array()?.first()?;
    first
        .get("title")
        .or_else(|| first.get("detail"))
        .or_else(|| first.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
