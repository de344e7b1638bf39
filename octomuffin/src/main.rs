//! OctoMuffin
//!
//! Pretends to run a muffin bakery: every interval it bakes a batch and
//! publishes one CloudEvent per ingredient used and one per lot shipped to a
//! coffee shop, all to the HTTP sink named by `K_SINK`.
//!
//! # Usage
//!
//! ```bash
//! K_SINK=http://localhost:8080 cargo run --bin octomuffin
//! ```
//!
//! Stops on Ctrl+C or SIGTERM. A submission still in flight is abandoned.

mod config;

use config::{Config, ConfigError};
use octomuffin_http::HttpEventSink;
use octomuffin_runtime::{Bakery, ShutdownCoordinator, wait_for_signal};
use std::future::Future;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    init_tracing();

    run(Config::from_env, wait_for_signal()).await
}

/// Load configuration with `load`, bake until `stop` resolves, then shut down.
async fn run<L, S>(load: L, stop: S) -> Result<(), Box<dyn std::error::Error>>
where
    L: FnOnce() -> Result<Config, ConfigError>,
    S: Future<Output = std::io::Result<()>>,
{
    let config = load().inspect_err(|e| {
        tracing::error!(error = %e, "failed to process env var");
    })?;
    tracing::info!(
        port = config.port,
        sink = %config.sink,
        interval = ?config.bake_interval(),
        mode = %config.mode,
        "Configuration loaded"
    );

    let sink = HttpEventSink::builder()
        .target(config.sink.as_str())
        .mode(config.mode)
        .timeout(config.sink_timeout())
        .build()
        .inspect_err(|e| {
            tracing::error!(error = %e, "failed to create client");
        })?;

    let coordinator = ShutdownCoordinator::new(config.shutdown_timeout());
    let bakery = Bakery::new(Arc::new(sink));
    let signal = coordinator.subscribe();
    let interval = config.bake_interval();
    let task = tokio::spawn(async move { bakery.bake(signal, interval).await });

    stop.await?;
    coordinator.shutdown_and_wait(task).await??;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "octomuffin=info,octomuffin_runtime=info,octomuffin_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
