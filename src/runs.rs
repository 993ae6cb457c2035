// Run status data model
// This file defines the status-count snapshot returned by the runs
// administration API and the client seam the aggregator drives
//
// Numan Thabit 2025 Nov

use crate::errors::ExporterError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Opaque workspace identifier, unique within an organization.
pub type WorkspaceName = String;

/// One scrape's worth of status counts keyed by workspace.
pub type RunsByWorkspace = HashMap<WorkspaceName, StatusCounts>;

/// Aggregate run counts per lifecycle state, as reported by one API call.
/// Keys missing from the upstream payload decode as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StatusCounts {
    pub total: u64,
    pub pending: u64,
    pub planning: u64,
    pub planned: u64,
    pub confirmed: u64,
    pub applying: u64,
    pub applied: u64,
    pub discarded: u64,
    pub errored: u64,
    pub canceled: u64,
    pub policy_checking: u64,
    pub policy_override: u64,
    pub policy_checked: u64,
}

impl StatusCounts {
    pub fn get(&self, kind: StatusKind) -> u64 {
        match kind {
            StatusKind::Total => self.total,
            StatusKind::Pending => self.pending,
            StatusKind::Planning => self.planning,
            StatusKind::Planned => self.planned,
            StatusKind::Confirmed => self.confirmed,
            StatusKind::Applying => self.applying,
            StatusKind::Applied => self.applied,
            StatusKind::Discarded => self.discarded,
            StatusKind::Errored => self.errored,
            StatusKind::Canceled => self.canceled,
            StatusKind::PolicyChecking => self.policy_checking,
            StatusKind::PolicyOverride => self.policy_override,
            StatusKind::PolicyChecked => self.policy_checked,
        }
    }
}

const INSTALLATION_PREFIX: &str = "tf_enterprise_";

/// The fixed set of counters published per workspace and installation-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Total,
    Pending,
    Planning,
    Planned,
    Confirmed,
    Applying,
    Applied,
    Discarded,
    Errored,
    Canceled,
    PolicyChecking,
    PolicyOverride,
    PolicyChecked,
}

impl StatusKind {
    pub const ALL: [StatusKind; 13] = [
        StatusKind::Total,
        StatusKind::Pending,
        StatusKind::Planning,
        StatusKind::Planned,
        StatusKind::Confirmed,
        StatusKind::Applying,
        StatusKind::Applied,
        StatusKind::Discarded,
        StatusKind::Errored,
        StatusKind::Canceled,
        StatusKind::PolicyChecking,
        StatusKind::PolicyOverride,
        StatusKind::PolicyChecked,
    ];

    /// Exposed metric name for the per-workspace gauge
    pub fn metric_name(&self) -> &'static str {
        match self {
            StatusKind::Total => "runs_total",
            StatusKind::Pending => "runs_pending",
            StatusKind::Planning => "runs_planning",
            StatusKind::Planned => "runs_planned",
            StatusKind::Confirmed => "runs_confirmed",
            StatusKind::Applying => "runs_applying",
            StatusKind::Applied => "runs_applied",
            StatusKind::Discarded => "runs_discarded",
            StatusKind::Errored => "runs_errored",
            StatusKind::Canceled => "runs_canceled",
            StatusKind::PolicyChecking => "runs_policy_checking",
            StatusKind::PolicyOverride => "runs_policy_override",
            StatusKind::PolicyChecked => "runs_policy_checked",
        }
    }

    /// Unlabelled installation-wide gauge, e.g. `tf_enterprise_runs_total`
    pub fn installation_metric_name(&self) -> String {
        format!("{INSTALLATION_PREFIX}{}", self.metric_name())
    }

    pub fn help(&self) -> &'static str {
        match self {
            StatusKind::Total => "Total number of runs with any status (total)",
            StatusKind::Pending => "Runs currently in the queue (pending)",
            StatusKind::Planning => "Runs currently planning (planning)",
            StatusKind::Planned => "Runs planned (planned)",
            StatusKind::Confirmed => "Runs confirmed (confirmed)",
            StatusKind::Applying => "Runs currently applying (applying)",
            StatusKind::Applied => "Runs applied (applied)",
            StatusKind::Discarded => "Runs discarded (discarded)",
            StatusKind::Errored => "Runs errored (errored)",
            StatusKind::Canceled => "Runs canceled (canceled)",
            StatusKind::PolicyChecking => "Runs currently checking policy (policy-checking)",
            StatusKind::PolicyOverride => "Runs with overridden policy (policy-override)",
            StatusKind::PolicyChecked => "Runs with checked policy (policy-checked)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub name: WorkspaceName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Pagination {
    pub current_page: u32,
    pub next_page: Option<u32>,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default)]
pub struct WorkspacePage {
    pub workspaces: Vec<Workspace>,
    pub pagination: Pagination,
}

/// Read-only view of the runs administration API.
#[async_trait]
pub trait RunsApi: Send + Sync {
    /// One page of the organization's workspaces. Pages are numbered from 1.
    async fn list_workspaces(
        &self,
        organization: &str,
        page_number: u32,
        page_size: u32,
    ) -> Result<WorkspacePage, ExporterError>;

    /// Status counts for the runs of a single workspace, scoped by its id.
    async fn run_status_counts(&self, workspace: &Workspace)
        -> Result<StatusCounts, ExporterError>;

    /// Status counts across every run the installation knows about.
    async fn installation_status_counts(&self) -> Result<StatusCounts, ExporterError>;
}
