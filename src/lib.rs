// Library root module for tfe-runs-exporter
// This file defines the public API and module structure for the exporter library:
// the status-count aggregator, the metric publisher and the scrape server
//
// Numan Thabit 2025 Nov

pub mod aggregator;
pub mod collector;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod readiness;
pub mod runs;
pub mod server;
pub mod transport;
