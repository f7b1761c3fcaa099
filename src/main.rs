//! twiver — Entry Point
//!
//! Streams labelled tweet observations to stdout as JSON lines until
//! SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from the first argument) + validate
//! 2. Init tracing (JSON structured logging on stderr)
//! 3. Read the bearer token from the configured env var
//! 4. Build the stream adapter (validates rules + target, no I/O)
//! 5. Spawn health/metrics server if enabled
//! 6. Pull observations; print each, feed the label revealer
//! 7. On SIGINT: flush pending reveals (bounded), stop servers, exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use twiver::adapters::metrics::{HealthServer, StreamMetrics};
use twiver::adapters::twitter::{open_stream, StreamOptions, TwitterClient};
use twiver::config::{self, AppConfig};
use twiver::domain::{Observation, Revealed};
use twiver::usecases::LabelRevealer;

/// One stdout line.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Output<'a> {
    Observation(&'a Observation),
    Revealed(&'a Revealed),
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&path).context("Failed to load configuration")?;

    // ── 2. Initialize structured logging ────────────────────
    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path,
        rules = config.rules.len(),
        target = %config.stream.target,
        delay_seconds = config.stream.delay_seconds,
        reveal = config.reveal.enabled,
        "Configuration loaded, starting twiver"
    );

    // ── 3. Credential from env ──────────────────────────────
    // Missing and blank are both rejected by open_stream.
    let bearer_token = std::env::var(&config.stream.bearer_token_env).unwrap_or_default();

    // ── 4. Stream adapter ───────────────────────────────────
    let options = StreamOptions {
        bearer_token,
        settings: config.stream_settings(),
        client: config.client_config(),
    };
    let (stream, client) = open_stream(options).with_context(|| {
        format!("Cannot open stream (token from {})", config.stream.bearer_token_env)
    })?;

    let metrics = Arc::new(StreamMetrics::new().context("Failed to register metrics")?);
    let mut stream = stream.with_metrics(Arc::clone(&metrics));

    let reveal_after = chrono::Duration::from_std(Duration::from_secs(config.reveal.delay_seconds))
        .context("reveal.delay_seconds out of range")?;
    let mut revealer = config.reveal.enabled.then(|| {
        LabelRevealer::new(
            Arc::clone(&client),
            stream.target(),
            reveal_after,
            config.reveal.batch_size,
        )
    });

    // ── 5. Health / metrics server ──────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let health_handle = config.metrics.enabled.then(|| {
        let server = HealthServer::new(Arc::clone(&metrics), config.metrics.bind_address.clone());
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server.run(shutdown_rx).await {
                error!(error = %e, "Health server failed");
            }
        })
    });

    // ── 6. Main pull loop ───────────────────────────────────
    let mut stdout = std::io::stdout().lock();
    let outcome: Result<()> = loop {
        tokio::select! {
            biased;
            _ = signal::ctrl_c() => {
                info!("SIGINT received, shutting down");
                break Ok(());
            }
            next = stream.next_observation() => {
                let observation = match next {
                    Ok(observation) => observation,
                    Err(e) if e.is_terminal() => break Err(e.into()),
                    Err(e) => {
                        // Rule sync failed; retry after the reconnect delay.
                        warn!(error = %e, "Stream not ready");
                        tokio::time::sleep(Duration::from_secs(config.stream.delay_seconds)).await;
                        continue;
                    }
                };

                emit(&mut stdout, &Output::Observation(&observation))?;

                if let Some(revealer) = revealer.as_mut() {
                    match revealer.observe(&observation).await {
                        Ok(revealed) => emit_revealed(&mut stdout, &metrics, &revealed)?,
                        Err(e) => warn!(error = %e, "Label lookup failed, will retry"),
                    }
                }
            }
        }
    };

    // ── 7. Graceful shutdown ────────────────────────────────
    if let Some(revealer) = revealer.as_mut() {
        flush_reveals(revealer, &mut stdout, &metrics).await?;
    }

    let _ = shutdown_tx.send(());
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    drop(stream);
    info!("Shutdown complete");
    outcome
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn emit(out: &mut impl Write, line: &Output<'_>) -> Result<()> {
    serde_json::to_writer(&mut *out, line).context("Failed to serialize output")?;
    out.write_all(b"\n").context("Failed to write to stdout")?;
    out.flush().context("Failed to flush stdout")
}

fn emit_revealed(out: &mut impl Write, metrics: &StreamMetrics, revealed: &[Revealed]) -> Result<()> {
    for item in revealed {
        emit(out, &Output::Revealed(item))?;
        metrics.revealed.inc();
    }
    Ok(())
}

/// Reveal whatever is still queued, giving up after 30s.
async fn flush_reveals(
    revealer: &mut LabelRevealer<TwitterClient>,
    out: &mut impl Write,
    metrics: &StreamMetrics,
) -> Result<()> {
    if revealer.outstanding() == 0 {
        return Ok(());
    }
    info!(outstanding = revealer.outstanding(), "Flushing pending label reveals");

    match tokio::time::timeout(Duration::from_secs(30), revealer.flush()).await {
        Ok(Ok(revealed)) => emit_revealed(out, metrics, &revealed),
        Ok(Err(e)) => {
            warn!(error = %e, "Final label lookup failed");
            Ok(())
        }
        Err(_) => {
            warn!("Final label lookup timed out");
            Ok(())
        }
    }
}
