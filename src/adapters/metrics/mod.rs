//! Metrics and Monitoring Adapters
//!
//! Prometheus counters for the stream adapter and an axum server for
//! /live, /ready and /metrics.

pub mod health;
pub mod prometheus;

pub use health::HealthServer;
pub use prometheus::StreamMetrics;
