#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tfe_runs_exporter::aggregator::StatusAggregator;
use tfe_runs_exporter::errors::ExporterError;
use tfe_runs_exporter::runs::{RunsApi, Workspace};
use tfe_runs_exporter::transport::TfeClient;

const TOKEN: &str = "test-token";
const WORKSPACES: [&str; 6] = ["app", "app-staging", "dns", "infra", "network", "storage"];

fn counts_for(name: &str) -> Vec<(&'static str, u64)> {
    match name {
        "app" => vec![("total", 2), ("applied", 2)],
        "app-staging" => vec![("total", 3), ("errored", 3)],
        "infra" => vec![("total", 5), ("pending", 1), ("applied", 4)],
        _ => vec![("total", 1), ("policy-checked", 1)],
    }
}

/// Sum the status counts of every workspace in `names`.
fn merged<'a>(names: impl Iterator<Item = &'a str>) -> Value {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for name in names {
        for (status, count) in counts_for(name) {
            *totals.entry(status).or_default() += count;
        }
    }
    json!(totals)
}

fn run_list(counts: Value) -> Json<Value> {
    Json(json!({
        "data": [],
        "meta": { "status-counts": counts }
    }))
}

fn workspace(name: &str) -> Workspace {
    Workspace {
        id: format!("ws-{name}"),
        name: name.to_string(),
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

async fn list_workspaces(
    Path(org): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if org != "acme" {
        return Err(StatusCode::NOT_FOUND);
    }
    let page: usize = params["page[number]"].parse().unwrap();
    let size: usize = params["page[size]"].parse().unwrap();
    let total_pages = WORKSPACES.len().div_ceil(size);

    let data: Vec<Value> = WORKSPACES
        .iter()
        .skip((page - 1) * size)
        .take(size)
        .map(|name| json!({ "id": format!("ws-{name}"), "type": "workspaces", "attributes": { "name": name } }))
        .collect();
    let next_page = if page < total_pages { json!(page + 1) } else { Value::Null };

    Ok(Json(json!({
        "data": data,
        "meta": { "pagination": {
            "current-page": page,
            "prev-page": null,
            "next-page": next_page,
            "total-pages": total_pages,
            "total-count": WORKSPACES.len()
        } }
    })))
}

/// Instance-wide run listing. `q` is a free-text search, so it matches any
/// workspace whose name contains it.
async fn admin_runs(
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let counts = match params.get("q") {
        Some(q) => merged(WORKSPACES.iter().copied().filter(|name| name.contains(q.as_str()))),
        None => merged(WORKSPACES.iter().copied()),
    };
    Ok(run_list(counts))
}

async fn workspace_runs(
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let name = id.strip_prefix("ws-").ok_or(StatusCode::NOT_FOUND)?;
    if name == "broken" {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if !WORKSPACES.iter().any(|known| *known == name) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(run_list(merged(std::iter::once(name))))
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/api/v2/organizations/:org/workspaces", get(list_workspaces))
        .route("/api/v2/workspaces/:id/runs", get(workspace_runs))
        .route("/api/v2/admin/runs", get(admin_runs));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, token: &str) -> TfeClient {
    TfeClient::new(
        format!("http://{addr}").parse().unwrap(),
        token,
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn lists_workspaces_page_by_page() {
    let addr = spawn_stub().await;
    let client = client(addr, TOKEN);

    let first = client.list_workspaces("acme", 1, 2).await.unwrap();
    assert_eq!(first.workspaces.len(), 2);
    assert_eq!(first.workspaces[0].name, "app");
    assert_eq!(first.pagination.next_page, Some(2));

    let last = client.list_workspaces("acme", 3, 2).await.unwrap();
    assert_eq!(last.workspaces.len(), 2);
    assert_eq!(last.workspaces[1].id, "ws-storage");
    assert_eq!(last.pagination.next_page, None);
}

#[tokio::test]
async fn reads_status_counts_for_a_workspace() {
    let addr = spawn_stub().await;
    let counts = client(addr, TOKEN)
        .run_status_counts(&workspace("infra"))
        .await
        .unwrap();

    assert_eq!(counts.total, 5);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.applied, 4);
    assert_eq!(counts.errored, 0);
}

#[tokio::test]
async fn workspace_counts_exclude_similarly_named_workspaces() {
    let addr = spawn_stub().await;
    let counts = client(addr, TOKEN)
        .run_status_counts(&workspace("app"))
        .await
        .unwrap();

    // "app-staging" also contains "app"; its runs must not leak in.
    assert_eq!(counts.total, 2);
    assert_eq!(counts.applied, 2);
    assert_eq!(counts.errored, 0);
}

#[tokio::test]
async fn installation_totals_span_every_workspace() {
    let addr = spawn_stub().await;
    let totals = client(addr, TOKEN).installation_status_counts().await.unwrap();

    assert_eq!(totals.total, 13);
    assert_eq!(totals.applied, 6);
    assert_eq!(totals.errored, 3);
    assert_eq!(totals.pending, 1);
    assert_eq!(totals.policy_checked, 3);
}

#[tokio::test]
async fn bad_token_is_a_provider_error() {
    let addr = spawn_stub().await;
    let err = client(addr, "wrong")
        .run_status_counts(&workspace("infra"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExporterError::Provider(ref msg) if msg.contains("401")), "{err}");
}

#[tokio::test]
async fn server_error_surfaces_for_the_failing_workspace() {
    let addr = spawn_stub().await;
    let err = client(addr, TOKEN)
        .run_status_counts(&workspace("broken"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExporterError::Provider(_)), "{err}");
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, TOKEN)
        .list_workspaces("acme", 1, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, ExporterError::Transport(_)), "{err}");
}

#[tokio::test]
async fn aggregates_every_workspace_over_http() {
    let addr = spawn_stub().await;
    let aggregator = StatusAggregator::new(Arc::new(client(addr, TOKEN)), 2, 3);

    let runs = aggregator.aggregate("acme").await.unwrap();

    assert_eq!(runs.len(), WORKSPACES.len());
    assert_eq!(runs["infra"].total, 5);
    assert_eq!(runs["app"].total, 2);
    assert_eq!(runs["app-staging"].errored, 3);
    assert_eq!(runs["dns"].policy_checked, 1);
}
