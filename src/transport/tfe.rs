// Runs administration API client
// This file implements the HTTP client for the JSON:API endpoints that list
// an organization's workspaces and report run status counts
//
// Numan Thabit 2025 Nov

use crate::errors::ExporterError;
use crate::metrics::{REQ_ERRORS, REQ_LATENCY};
use crate::runs::{Pagination, RunsApi, StatusCounts, Workspace, WorkspacePage};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const JSON_API: &str = "application/vnd.api+json";

/// HTTP client for the runs administration API. Cheap to clone; the
/// connection pool and token are shared across clones.
#[derive(Clone)]
pub struct TfeClient {
    address: Url,
    token: String,
    http: Client,
}

impl TfeClient {
    pub fn new(
        address: Url,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ExporterError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ExporterError::Transport(format!("build HTTP client: {e}")))?;

        Ok(Self {
            address,
            token: token.into(),
            http,
        })
    }

    /// `{address}/api/v2/<segments...>`, each segment percent-encoded.
    fn api_url(&self, segments: &[&str]) -> Result<Url, ExporterError> {
        let mut url = self.address.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ExporterError::Config(format!("address {} cannot be a base URL", self.address))
            })?
            .pop_if_empty()
            .extend(["api", "v2"])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        method: &str,
    ) -> Result<T, ExporterError> {
        let _timer = REQ_LATENCY.with_label_values(&[method]).start_timer();

        let result = self.send(url, query).await;
        if let Err(err) = &result {
            REQ_ERRORS.with_label_values(&[method]).inc();
            debug!(method = method, error = %err, "upstream request failed");
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ExporterError> {
        debug!(url = %url, "upstream GET");
        let resp = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .header(ACCEPT, HeaderValue::from_static(JSON_API))
            .send()
            .await
            .map_err(|e| ExporterError::Transport(format!("send: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExporterError::Provider(format!("http {status}")));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ExporterError::Transport(format!("read body: {e}")))?;
        serde_json::from_slice(&body)
            .map_err(|e| ExporterError::Provider(format!("decode response: {e}")))
    }
}

#[async_trait]
impl RunsApi for TfeClient {
    async fn list_workspaces(
        &self,
        organization: &str,
        page_number: u32,
        page_size: u32,
    ) -> Result<WorkspacePage, ExporterError> {
        let url = self.api_url(&["organizations", organization, "workspaces"])?;
        let query = [
            ("page[number]", page_number.to_string()),
            ("page[size]", page_size.to_string()),
        ];
        let doc: WorkspaceListDocument = self.get_json(url, &query, "list_workspaces").await?;

        Ok(WorkspacePage {
            workspaces: doc
                .data
                .into_iter()
                .map(|item| Workspace {
                    id: item.id,
                    name: item.attributes.name,
                })
                .collect(),
            pagination: doc.meta.pagination.unwrap_or(Pagination {
                current_page: page_number,
                next_page: None,
                total_pages: page_number,
            }),
        })
    }

    async fn run_status_counts(
        &self,
        workspace: &Workspace,
    ) -> Result<StatusCounts, ExporterError> {
        let url = self.api_url(&["workspaces", &workspace.id, "runs"])?;
        let doc: RunListDocument = self
            .get_json(url, &single_item_page(), "workspace_runs")
            .await?;
        Ok(doc.meta.status_counts)
    }

    async fn installation_status_counts(&self) -> Result<StatusCounts, ExporterError> {
        let url = self.api_url(&["admin", "runs"])?;
        let doc: RunListDocument = self
            .get_json(url, &single_item_page(), "admin_runs")
            .await?;
        Ok(doc.meta.status_counts)
    }
}

/// Only the meta block of a run list is read, so one item is enough.
fn single_item_page() -> [(&'static str, String); 2] {
    [
        ("page[number]", "1".to_string()),
        ("page[size]", "1".to_string()),
    ]
}

// JSON:API documents

#[derive(Debug, Deserialize)]
struct WorkspaceListDocument {
    #[serde(default)]
    data: Vec<WorkspaceResource>,
    #[serde(default)]
    meta: ListMeta,
}

#[derive(Debug, Deserialize)]
struct WorkspaceResource {
    id: String,
    attributes: WorkspaceAttributes,
}

#[derive(Debug, Deserialize)]
struct WorkspaceAttributes {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListMeta {
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct RunListDocument {
    meta: RunListMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunListMeta {
    #[serde(default)]
    status_counts: StatusCounts,
}
