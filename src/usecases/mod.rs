//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces.
//!
//! Use cases:
//! - `RuleSynchronizer`: Reconcile the remote rule set with ours
//! - `TweetStream`: Reconnecting producer of labelled observations
//! - `LabelRevealer`: Delayed ground-truth labels via tweet lookup

pub mod label_reveal;
pub mod rule_sync;
pub mod stream_adapter;

pub use label_reveal::LabelRevealer;
pub use rule_sync::RuleSynchronizer;
pub use stream_adapter::{StreamSettings, TweetStream, DEFAULT_DELAY};
