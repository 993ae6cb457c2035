// Status-count aggregator
// Enumerates every workspace in an organization and fans out one
// status-count query per workspace, assembling a single snapshot
//
// Numan Thabit 2025 Nov

use crate::errors::ExporterError;
use crate::runs::{RunsApi, RunsByWorkspace, StatusCounts, Workspace};
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds a [`RunsByWorkspace`] snapshot per call. Holds no state between
/// calls beyond the shared read-only client.
#[derive(Clone)]
pub struct StatusAggregator {
    client: Arc<dyn RunsApi>,
    page_size: u32,
    max_concurrency: usize,
}

impl StatusAggregator {
    pub fn new(client: Arc<dyn RunsApi>, page_size: u32, max_concurrency: usize) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Walk every page of the workspace listing.
    pub async fn workspaces(&self, organization: &str) -> Result<Vec<Workspace>, ExporterError> {
        let mut workspaces = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self
                .client
                .list_workspaces(organization, page_number, self.page_size)
                .await
                .map_err(|e| ExporterError::list_workspaces(organization, e))?;

            debug!(
                organization = organization,
                page = page_number,
                workspaces = page.workspaces.len(),
                "workspace page fetched"
            );
            workspaces.extend(page.workspaces);

            match page.pagination.next_page {
                None => break,
                Some(next) if next > page_number => page_number = next,
                Some(next) => {
                    // A cursor that does not move forward would never terminate.
                    return Err(ExporterError::list_workspaces(
                        organization,
                        ExporterError::Provider(format!(
                            "pagination did not advance (page {page_number} -> {next})"
                        )),
                    ));
                }
            }
        }

        Ok(workspaces)
    }

    /// Snapshot of status counts for every workspace in `organization`.
    ///
    /// The first failing upstream call aborts the whole aggregation; results
    /// already gathered are dropped and in-flight queries are cancelled.
    pub async fn aggregate(&self, organization: &str) -> Result<RunsByWorkspace, ExporterError> {
        let workspaces = self.workspaces(organization).await?;
        let client = &self.client;

        stream::iter(workspaces)
            .map(|workspace| async move {
                match client.run_status_counts(&workspace).await {
                    Ok(counts) => Ok((workspace.name, counts)),
                    Err(err) => {
                        warn!(
                            workspace = %workspace.name,
                            workspace_id = %workspace.id,
                            error = %err,
                            "status-count query failed"
                        );
                        Err(ExporterError::status_counts(&workspace.name, err))
                    }
                }
            })
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await
    }

    /// Installation-wide status counts, not broken down by workspace.
    pub async fn installation_totals(&self) -> Result<StatusCounts, ExporterError> {
        self.client
            .installation_status_counts()
            .await
            .map_err(ExporterError::installation_totals)
    }
}
