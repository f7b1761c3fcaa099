//! Domain layer - Tweets, rules and labelled observations.
//!
//! Pure data types and the normalization from stream payloads to
//! records. No network or runtime dependencies live here.

pub mod event;
pub mod record;
pub mod rule;

// Re-export core types for convenience
pub use event::RawEvent;
pub use record::{
    AuthorMetrics, Engagement, Features, Metric, Observation, Record, Revealed, Target,
};
pub use rule::{MatchRule, RuleSet, MAX_RULE_LENGTH};
