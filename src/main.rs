use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tfe_runs_exporter::aggregator::StatusAggregator;
use tfe_runs_exporter::collector::RunsCollector;
use tfe_runs_exporter::config::AppConfig;
use tfe_runs_exporter::metrics::{SCRAPE_DURATION, SCRAPE_FAILURES};
use tfe_runs_exporter::readiness::wait_for_file;
use tfe_runs_exporter::server;
use tfe_runs_exporter::transport::TfeClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal exporter error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;
    let settings = config.resolve().context("validate configuration")?;

    if let Some(path) = &settings.ready_file {
        wait_for_file(path, settings.ready_poll_interval).await;
    }

    let client = TfeClient::new(
        settings.address.clone(),
        settings.token.clone(),
        settings.request_timeout,
    )
    .context("initialize runs API client")?;

    let aggregator = StatusAggregator::new(
        Arc::new(client),
        settings.page_size,
        settings.max_concurrency,
    );
    let collector = Arc::new(
        RunsCollector::new(
            settings.organization.clone(),
            aggregator,
            settings.scrape_timeout,
        )
        .context("build run status descriptors")?,
    );

    // Scrape metrics show up before the first scrape completes.
    Lazy::force(&SCRAPE_DURATION);
    Lazy::force(&SCRAPE_FAILURES);

    let listener = tokio::net::TcpListener::bind(settings.listen_address)
        .await
        .with_context(|| format!("bind listen address {}", settings.listen_address))?;

    info!(
        address = %settings.listen_address,
        upstream = %settings.address,
        organization = %settings.organization,
        page_size = settings.page_size,
        max_concurrency = settings.max_concurrency,
        scrape_timeout_secs = settings.scrape_timeout.as_secs(),
        "runs exporter listening"
    );

    server::serve(listener, collector, shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl_c listener error");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM listener error");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received, draining connections");
}

fn init_tracing() -> Result<()> {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
