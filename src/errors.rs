// Error types and error handling module
// This file defines the exporter's error taxonomy: configuration failures
// that are fatal at startup, and upstream failures scoped to a single scrape
//
// Numan Thabit 2025 Nov

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("config error: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("listing workspaces for organization {organization} failed: {source}")]
    ListWorkspaces {
        organization: String,
        #[source]
        source: Box<ExporterError>,
    },
    #[error("querying run status counts for workspace {workspace} failed: {source}")]
    StatusCounts {
        workspace: String,
        #[source]
        source: Box<ExporterError>,
    },
    #[error("querying installation-wide run status counts failed: {source}")]
    InstallationTotals {
        #[source]
        source: Box<ExporterError>,
    },
    #[error("scrape exceeded deadline of {0:?}")]
    ScrapeTimeout(Duration),
    #[error("encode error: {0}")]
    Encode(String),
}

impl ExporterError {
    pub fn list_workspaces(organization: &str, source: ExporterError) -> Self {
        Self::ListWorkspaces {
            organization: organization.to_string(),
            source: Box::new(source),
        }
    }

    pub fn status_counts(workspace: &str, source: ExporterError) -> Self {
        Self::StatusCounts {
            workspace: workspace.to_string(),
            source: Box::new(source),
        }
    }

    pub fn installation_totals(source: ExporterError) -> Self {
        Self::InstallationTotals {
            source: Box::new(source),
        }
    }

    /// True for failures scoped to one scrape (remote API or deadline).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::ListWorkspaces { .. }
                | Self::StatusCounts { .. }
                | Self::InstallationTotals { .. }
                | Self::ScrapeTimeout(_)
        )
    }
}

impl From<prometheus::Error> for ExporterError {
    fn from(err: prometheus::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<config::ConfigError> for ExporterError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_carry_context() {
        let err = ExporterError::status_counts(
            "infra",
            ExporterError::Provider("http 401 Unauthorized".into()),
        );
        assert!(err.is_upstream());
        let msg = err.to_string();
        assert!(msg.contains("infra"), "{msg}");
        assert!(msg.contains("401"), "{msg}");
    }

    #[test]
    fn config_errors_are_not_upstream() {
        assert!(!ExporterError::Config("missing organization".into()).is_upstream());
        assert!(ExporterError::ScrapeTimeout(Duration::from_secs(1)).is_upstream());
        assert!(ExporterError::installation_totals(ExporterError::Transport("reset".into()))
            .is_upstream());
    }
}
