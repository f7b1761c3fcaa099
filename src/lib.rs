//! twiver — Twitter Filtered Stream for Online Learning
//!
//! Installs match rules on the v2 filtered stream, keeps a connection
//! open across disconnects, and turns every matching tweet into an
//! `(index, features, label)` observation.
//!
//! Re-exports all modules for integration tests and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod usecases;

pub use adapters::twitter::{open_stream, StreamOptions, TwitterStream};
pub use domain::{Features, MatchRule, Observation, Target};
pub use error::{AdapterError, ApiError, ParseWarning};
pub use usecases::{StreamSettings, TweetStream};
