//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use cases require from the
//! outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `RuleApi`: Filtered stream rule listing, deletion, creation
//! - `StreamConnector` / `LineStream`: Long-lived NDJSON connection
//! - `TweetLookup`: Engagement counts for already-seen tweets

pub mod rules_api;
pub mod tweet_lookup;
pub mod tweet_source;

pub use rules_api::{RemoteRule, RuleApi};
pub use tweet_lookup::{TweetLookup, MAX_LOOKUP_IDS};
pub use tweet_source::{LineStream, StreamConnector};
