//! Tweet Lookup Port - Re-reading Engagement Counts by ID

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::record::Engagement;
use crate::error::ApiError;

/// Maximum number of IDs the lookup endpoint accepts per request.
pub const MAX_LOOKUP_IDS: usize = 100;

/// Trait for fetching current public metrics of known tweets.
#[async_trait]
pub trait TweetLookup: Send + Sync + 'static {
  /// Current engagement counts keyed by tweet ID.
  ///
  /// Tweets that no longer exist or are not visible are simply absent
  /// from the result. `ids` never exceeds `MAX_LOOKUP_IDS`.
  async fn engagement(&self, ids: &[String]) -> Result<HashMap<String, Engagement>, ApiError>;
}
