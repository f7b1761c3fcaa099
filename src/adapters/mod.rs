//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, metrics export).
//!
//! Adapter categories:
//! - `twitter`: v2 API REST client, filtered-stream connection, auth
//! - `metrics`: Prometheus metrics export and health checks

pub mod metrics;
pub mod twitter;
