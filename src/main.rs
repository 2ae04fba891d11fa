//! Crisis Alert Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the orchestrator, mailer, and
//! metrics exporter. The user store here is the in-memory implementation;
//! the host application injects its database-backed store when embedding
//! the library.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use companion_safety::api::{create_router, AppState};
use companion_safety::config::Config;
use companion_safety::delivery::{smtp::SmtpMailer, DeliveryPipeline};
use companion_safety::location::NoPositionSensor;
use companion_safety::metrics::Metrics;
use companion_safety::orchestrator::CrisisOrchestrator;
use companion_safety::store::InMemoryUserStore;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("companion_safety=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env();
    let metrics = Metrics::init(
        config.sensor_timeout.as_secs(),
        config.retry_delay.as_secs(),
    );

    let mailer = Arc::new(SmtpMailer::from_env().context("SMTP configuration")?);
    let pipeline = DeliveryPipeline::new(mailer).with_retry_delay(config.retry_delay);

    let store = Arc::new(InMemoryUserStore::new());
    tracing::warn!(
        "running with an empty in-memory user store; incidents will abort until the host \
         app injects its own UserStore (see README, Embedding)"
    );
    let orchestrator = CrisisOrchestrator::new(store, Arc::new(NoPositionSensor), pipeline)
        .with_default_helpline(config.default_helpline.clone())
        .with_sensor_timeout(config.sensor_timeout);

    let router = create_router(AppState { orchestrator }).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "crisis alert service listening");
    axum::serve(listener, router).await.context("serve")?;

    Ok(())
}
