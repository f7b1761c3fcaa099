//! Prometheus Metrics Registry - Stream Observability
//!
//! Counters for what the adapter sees on the wire: observations per
//! tag, skipped lines, reconnects, revealed labels, plus a gauge for
//! the connection itself.

use std::sync::atomic::{AtomicBool, Ordering};

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Centralized Prometheus metrics for the stream adapter.
///
/// All metrics follow the naming convention `twiver_*`.
pub struct StreamMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Observations yielded, by rule tag.
    pub observations: IntCounterVec,
    /// Stream lines skipped because they did not parse.
    pub parse_warnings: IntCounter,
    /// Connections re-opened after a disconnect.
    pub reconnects: IntCounter,
    /// Labels revealed by delayed lookup.
    pub revealed: IntCounter,
    /// Connection status (1 = connected, 0 = disconnected).
    pub connected: IntGauge,
    /// Mirror of `connected` for the readiness probe.
    ready: AtomicBool,
}

impl StreamMetrics {
    /// Create and register all Prometheus metrics.
    ///
    /// # Errors
    /// Fails if a metric definition is invalid or registered twice.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let observations = IntCounterVec::new(
            Opts::new("twiver_observations_total", "Observations yielded"),
            &["tag"],
        )?;

        let parse_warnings = IntCounter::new(
            "twiver_parse_warnings_total",
            "Stream lines skipped because they did not parse",
        )?;

        let reconnects = IntCounter::new(
            "twiver_reconnects_total",
            "Stream connections re-opened after a disconnect",
        )?;

        let revealed = IntCounter::new(
            "twiver_labels_revealed_total",
            "Labels revealed by delayed lookup",
        )?;

        let connected = IntGauge::new(
            "twiver_stream_connected",
            "Stream connection status (1=connected, 0=disconnected)",
        )?;

        // Register all metrics
        registry.register(Box::new(observations.clone()))?;
        registry.register(Box::new(parse_warnings.clone()))?;
        registry.register(Box::new(reconnects.clone()))?;
        registry.register(Box::new(revealed.clone()))?;
        registry.register(Box::new(connected.clone()))?;

        Ok(Self {
            registry,
            observations,
            parse_warnings,
            reconnects,
            revealed,
            connected,
            ready: AtomicBool::new(false),
        })
    }

    pub fn observed(&self, tag: &str) {
        self.observations.with_label_values(&[tag]).inc();
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(i64::from(connected));
        self.ready.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
