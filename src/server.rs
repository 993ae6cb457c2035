// Scrape HTTP API implementation
// This file provides the /metrics and /health endpoints
//
// Numan Thabit 2025 Nov

use crate::collector::{encode_text, RunsCollector};
use crate::errors::ExporterError;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router as AxumRouter,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with scrape and liveness endpoints
pub fn create_router(collector: Arc<RunsCollector>) -> AxumRouter {
    AxumRouter::new()
        .route("/metrics", get(scrape))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(collector)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    collector: Arc<RunsCollector>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(collector))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Installation totals and per-workspace families for a fresh snapshot,
/// followed by the exporter's own metrics.
pub async fn render_metrics(collector: &RunsCollector) -> Result<String, ExporterError> {
    let scrape = collector.scrape().await?;
    let mut families = collector.installation_families(&scrape.totals);
    families.extend(collector.families(&scrape.samples));
    families.extend(prometheus::gather());
    encode_text(&families)
}

/// Liveness only; never touches the upstream API
async fn health_check() -> &'static str {
    "OK"
}

async fn scrape(State(collector): State<Arc<RunsCollector>>) -> Response {
    match render_metrics(&collector).await {
        Ok(body) => ([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            let status = match &err {
                ExporterError::ScrapeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                e if e.is_upstream() => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, err.to_string()).into_response()
        }
    }
}
