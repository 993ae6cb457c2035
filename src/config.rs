// Configuration management module
// This file handles loading and validating the exporter settings
// from TFE_* environment variables
//
// Numan Thabit 2025 Nov

use crate::errors::ExporterError;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_LISTEN_ADDRESS: &str = ":9112";
/// Unprefixed listen-address variable honoured when TFE_LISTEN_ADDRESS is unset.
pub const LEGACY_LISTEN_ADDRESS_VAR: &str = "HTTP_LISTENADDR";
/// Largest page the workspaces endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Organization whose workspaces are monitored
    pub organization: String,
    /// API base address, e.g. https://tfe.example.com
    pub address: Url,
    /// API token (takes precedence over token_file)
    pub token: Option<String>,
    /// File containing the API token
    pub token_file: Option<PathBuf>,
    /// Listen address; a bare ":port" binds every interface
    pub listen_address: Option<String>,
    /// Readiness-gate file that must exist before serving
    pub ready_file: Option<PathBuf>,
    pub ready_poll_interval_ms: Option<u64>,
    /// Workspace listing page size
    pub page_size: Option<u32>,
    /// Bound on concurrent per-workspace status-count queries
    pub max_concurrency: Option<usize>,
    /// Deadline for one full aggregation
    pub scrape_timeout_secs: Option<u64>,
    /// Timeout for a single upstream HTTP request
    pub request_timeout_secs: Option<u64>,
}

/// Validated settings handed to the aggregator, collector and server.
#[derive(Debug, Clone)]
pub struct ExporterSettings {
    pub organization: String,
    pub address: Url,
    pub token: String,
    pub listen_address: SocketAddr,
    pub ready_file: Option<PathBuf>,
    pub ready_poll_interval: Duration,
    pub page_size: u32,
    pub max_concurrency: usize,
    pub scrape_timeout: Duration,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn load() -> Result<Self, ExporterError> {
        Self::build(
            config::Environment::with_prefix("TFE"),
            std::env::var(LEGACY_LISTEN_ADDRESS_VAR).ok(),
        )
    }

    /// Load from an explicit variable map instead of the process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ExporterError> {
        let legacy_listen = vars.get(LEGACY_LISTEN_ADDRESS_VAR).cloned();
        Self::build(
            config::Environment::with_prefix("TFE").source(Some(vars)),
            legacy_listen,
        )
    }

    fn build(
        env: config::Environment,
        legacy_listen: Option<String>,
    ) -> Result<Self, ExporterError> {
        let mut builder = config::Config::builder();
        if let Some(address) = legacy_listen {
            builder = builder.set_default("listen_address", address)?;
        }
        let cfg = builder.add_source(env).build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn resolve(&self) -> Result<ExporterSettings, ExporterError> {
        let organization = self.organization.trim();
        if organization.is_empty() {
            return Err(ExporterError::Config("TFE_ORGANIZATION is empty".into()));
        }

        let page_size = self.page_size.unwrap_or(MAX_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ExporterError::Config(format!(
                "TFE_PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        let max_concurrency = self.max_concurrency.unwrap_or(8);
        if max_concurrency == 0 {
            return Err(ExporterError::Config(
                "TFE_MAX_CONCURRENCY must be at least 1".into(),
            ));
        }

        let ready_poll_interval_ms = self.ready_poll_interval_ms.unwrap_or(1000);
        if ready_poll_interval_ms == 0 {
            return Err(ExporterError::Config(
                "TFE_READY_POLL_INTERVAL_MS must be at least 1".into(),
            ));
        }

        Ok(ExporterSettings {
            organization: organization.to_string(),
            address: self.address.clone(),
            token: self.resolve_token()?,
            listen_address: parse_listen_address(
                self.listen_address.as_deref().unwrap_or(DEFAULT_LISTEN_ADDRESS),
            )?,
            ready_file: self.ready_file.clone(),
            ready_poll_interval: Duration::from_millis(ready_poll_interval_ms),
            page_size,
            max_concurrency,
            scrape_timeout: Duration::from_secs(self.scrape_timeout_secs.unwrap_or(30)),
            request_timeout: Duration::from_secs(self.request_timeout_secs.unwrap_or(10)),
        })
    }

    fn resolve_token(&self) -> Result<String, ExporterError> {
        let token = match (&self.token, &self.token_file) {
            (Some(token), _) => token.trim().to_string(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map_err(|e| {
                    ExporterError::Config(format!("read token file {}: {e}", path.display()))
                })?
                .trim()
                .to_string(),
            (None, None) => {
                return Err(ExporterError::Config(
                    "one of TFE_TOKEN or TFE_TOKEN_FILE is required".into(),
                ))
            }
        };
        if token.is_empty() {
            return Err(ExporterError::Config("API token is empty".into()));
        }
        Ok(token)
    }
}

/// Accepts "host:port", "ip:port" or the bare ":port" form.
pub fn parse_listen_address(raw: &str) -> Result<SocketAddr, ExporterError> {
    let raw = raw.trim();
    let candidate = match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => raw.to_string(),
    };
    candidate
        .to_socket_addrs()
        .map_err(|e| ExporterError::Config(format!("invalid listen address {raw}: {e}")))?
        .next()
        .ok_or_else(|| ExporterError::Config(format!("listen address {raw} did not resolve")))
}
