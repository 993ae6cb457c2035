// Metrics and observability module
// This file holds the exporter's own process metrics: upstream call latency
// and errors, scrape duration and scrape failures
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Histogram, HistogramVec,
};

pub static REQ_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "tfe_exporter_request_latency_seconds",
        "latency for upstream API calls",
        &["method"]
    )
    .unwrap()
});

pub static REQ_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tfe_exporter_request_errors_total",
        "errors by upstream API method",
        &["method"]
    )
    .unwrap()
});

pub static SCRAPE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "tfe_exporter_scrape_duration_seconds",
        "time spent aggregating run status counts per scrape"
    )
    .unwrap()
});

pub static SCRAPE_FAILURES: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tfe_exporter_scrape_failures_total",
        "scrapes that failed before publishing any run metrics"
    )
    .unwrap()
});
