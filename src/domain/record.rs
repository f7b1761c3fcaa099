//! Flat tweet records and the labelled observations built from them.
//!
//! A `Record` is assembled from one stream event, then immediately split
//! into `Features` (everything except the tag and the target metric) and
//! the label (the target metric's value).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

// ────────────────────────────────────────────
// Metric names
// ────────────────────────────────────────────

/// Every integer counter carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    RetweetCount,
    ReplyCount,
    LikeCount,
    QuoteCount,
    FollowersCount,
    FollowingCount,
    TweetCount,
    ListedCount,
}

impl Metric {
    pub const ALL: [Self; 8] = [
        Self::RetweetCount,
        Self::ReplyCount,
        Self::LikeCount,
        Self::QuoteCount,
        Self::FollowersCount,
        Self::FollowingCount,
        Self::TweetCount,
        Self::ListedCount,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RetweetCount => "retweet_count",
            Self::ReplyCount => "reply_count",
            Self::LikeCount => "like_count",
            Self::QuoteCount => "quote_count",
            Self::FollowersCount => "followers_count",
            Self::FollowingCount => "following_count",
            Self::TweetCount => "tweet_count",
            Self::ListedCount => "listed_count",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engagement metric used as the prediction label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    #[default]
    RetweetCount,
    ReplyCount,
    LikeCount,
    QuoteCount,
}

impl Target {
    pub const ALL: [Self; 4] = [
        Self::RetweetCount,
        Self::ReplyCount,
        Self::LikeCount,
        Self::QuoteCount,
    ];

    pub const fn metric(self) -> Metric {
        match self {
            Self::RetweetCount => Metric::RetweetCount,
            Self::ReplyCount => Metric::ReplyCount,
            Self::LikeCount => Metric::LikeCount,
            Self::QuoteCount => Metric::QuoteCount,
        }
    }

    pub const fn as_str(self) -> &'static str {
        self.metric().as_str()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                AdapterError::Configuration(format!(
                    "target must be one of retweet_count, reply_count, like_count, quote_count; got {s:?}"
                ))
            })
    }
}

// ────────────────────────────────────────────
// Counters
// ────────────────────────────────────────────

/// Tweet-level public metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Engagement {
    pub retweet_count: u64,
    pub reply_count: u64,
    pub like_count: u64,
    pub quote_count: u64,
}

impl Engagement {
    pub const fn get(&self, target: Target) -> u64 {
        match target {
            Target::RetweetCount => self.retweet_count,
            Target::ReplyCount => self.reply_count,
            Target::LikeCount => self.like_count,
            Target::QuoteCount => self.quote_count,
        }
    }
}

/// Author-level public metrics from the `includes` side-channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorMetrics {
    pub followers_count: u64,
    pub following_count: u64,
    pub tweet_count: u64,
    pub listed_count: u64,
}

// ────────────────────────────────────────────
// Record → (features, label)
// ────────────────────────────────────────────

/// One tweet, flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub username: String,
    /// True when the tweet replies to another user.
    pub reply: bool,
    pub id: String,
    pub engagement: Engagement,
    pub author: AuthorMetrics,
    /// Tag of the rule that matched.
    pub tag: String,
}

impl Record {
    /// Value of any counter on the record.
    pub const fn metric(&self, metric: Metric) -> u64 {
        match metric {
            Metric::RetweetCount => self.engagement.retweet_count,
            Metric::ReplyCount => self.engagement.reply_count,
            Metric::LikeCount => self.engagement.like_count,
            Metric::QuoteCount => self.engagement.quote_count,
            Metric::FollowersCount => self.author.followers_count,
            Metric::FollowingCount => self.author.following_count,
            Metric::TweetCount => self.author.tweet_count,
            Metric::ListedCount => self.author.listed_count,
        }
    }

    /// Split into features (minus tag and target), label and tag.
    pub fn split(self, target: Target) -> (Features, u64, String) {
        let label = self.engagement.get(target);
        let counts = Metric::ALL
            .into_iter()
            .filter(|m| *m != target.metric())
            .map(|m| (m, self.metric(m)))
            .collect();

        let features = Features {
            created_at: self.created_at,
            text: self.text,
            username: self.username,
            reply: self.reply,
            id: self.id,
            counts,
        };

        (features, label, self.tag)
    }
}

/// Record minus tag and target metric; serializes as one flat object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Features {
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub username: String,
    pub reply: bool,
    pub id: String,
    #[serde(flatten)]
    pub counts: BTreeMap<Metric, u64>,
}

impl Features {
    pub fn count(&self, metric: Metric) -> Option<u64> {
        self.counts.get(&metric).copied()
    }
}

/// One yielded item: sequence index, features, label and matched tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub index: u64,
    pub tag: String,
    pub features: Features,
    pub label: u64,
}

impl Observation {
    pub fn new(index: u64, record: Record, target: Target) -> Self {
        let (features, label, tag) = record.split(target);
        Self {
            index,
            tag,
            features,
            label,
        }
    }

    /// The plain `(index, features, label)` triple.
    pub fn into_triple(self) -> (u64, Features, u64) {
        (self.index, self.features, self.label)
    }
}

impl From<Observation> for (u64, Features, u64) {
    fn from(obs: Observation) -> Self {
        obs.into_triple()
    }
}

/// Ground-truth label looked up after the reveal delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revealed {
    pub index: u64,
    pub features: Features,
    pub label: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record {
            created_at: "2021-06-01T10:00:00Z".parse().unwrap(),
            text: "Bonjour Paris".into(),
            username: "raphael".into(),
            reply: false,
            id: "1399".into(),
            engagement: Engagement {
                retweet_count: 3,
                reply_count: 1,
                like_count: 12,
                quote_count: 0,
            },
            author: AuthorMetrics {
                followers_count: 150,
                following_count: 80,
                tweet_count: 900,
                listed_count: 2,
            },
            tag: "Paris fr".into(),
        }
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!("like_count".parse::<Target>().unwrap(), Target::LikeCount);
        assert!(matches!(
            "followers_count".parse::<Target>(),
            Err(AdapterError::Configuration(_))
        ));
        assert!("".parse::<Target>().is_err());
    }

    #[test]
    fn test_split_removes_target_and_tag() {
        let (features, label, tag) = sample_record().split(Target::LikeCount);

        assert_eq!(label, 12);
        assert_eq!(tag, "Paris fr");
        assert_eq!(features.count(Metric::LikeCount), None);
        assert_eq!(features.count(Metric::RetweetCount), Some(3));
        assert_eq!(features.count(Metric::FollowersCount), Some(150));
        assert_eq!(features.counts.len(), 7);
    }

    #[test]
    fn test_features_serialize_flat() {
        let obs = Observation::new(4, sample_record(), Target::RetweetCount);
        let json = serde_json::to_value(&obs.features).unwrap();

        assert_eq!(json["listed_count"], 2);
        assert_eq!(json["username"], "raphael");
        assert_eq!(json["reply"], false);
        assert!(json.get("retweet_count").is_none());
        assert!(json.get("tag").is_none());
        assert!(json.get("counts").is_none());
    }

    #[test]
    fn test_into_triple() {
        let obs = Observation::new(7, sample_record(), Target::QuoteCount);
        let (index, features, label) = obs.into_triple();
        assert_eq!(index, 7);
        assert_eq!(label, 0);
        assert_eq!(features.id, "1399");
    }
}
