// Run status metric publisher
// Drives the aggregator on every scrape and flattens the snapshot into
// one gauge sample per (status kind, workspace) pair, alongside the
// unlabelled installation-wide totals
//
// Numan Thabit 2025 Nov

use crate::aggregator::StatusAggregator;
use crate::errors::ExporterError;
use crate::metrics::{SCRAPE_DURATION, SCRAPE_FAILURES};
use crate::runs::{RunsByWorkspace, StatusCounts, StatusKind, WorkspaceName};
use prometheus::core::Desc;
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub const WORKSPACE_LABEL: &str = "workspace";

/// Name and help text for one status kind. Per-workspace descriptors carry
/// the `workspace` label; installation descriptors carry none.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub kind: StatusKind,
    desc: Desc,
}

impl MetricDescriptor {
    fn per_workspace(kind: StatusKind) -> Result<Self, ExporterError> {
        let desc = Desc::new(
            kind.metric_name().to_string(),
            kind.help().to_string(),
            vec![WORKSPACE_LABEL.to_string()],
            HashMap::new(),
        )?;
        Ok(Self { kind, desc })
    }

    fn installation(kind: StatusKind) -> Result<Self, ExporterError> {
        let desc = Desc::new(
            kind.installation_metric_name(),
            kind.help().to_string(),
            Vec::new(),
            HashMap::new(),
        )?;
        Ok(Self { kind, desc })
    }

    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn help(&self) -> &str {
        &self.desc.help
    }

    pub fn labels(&self) -> &[String] {
        &self.desc.variable_labels
    }

    fn family(&self) -> MetricFamily {
        let mut family = MetricFamily::default();
        family.set_name(self.name().to_string());
        family.set_help(self.help().to_string());
        family.set_field_type(MetricType::GAUGE);
        family
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub kind: StatusKind,
    pub workspace: WorkspaceName,
    pub value: f64,
}

/// Everything one scrape produced.
#[derive(Debug, Clone, Default)]
pub struct Scrape {
    pub samples: Vec<Sample>,
    pub totals: StatusCounts,
}

/// Pull-model publisher for the run status gauges.
pub struct RunsCollector {
    organization: String,
    aggregator: StatusAggregator,
    scrape_timeout: Duration,
    descriptors: Vec<MetricDescriptor>,
    installation_descriptors: Vec<MetricDescriptor>,
}

impl RunsCollector {
    pub fn new(
        organization: impl Into<String>,
        aggregator: StatusAggregator,
        scrape_timeout: Duration,
    ) -> Result<Self, ExporterError> {
        let descriptors = StatusKind::ALL
            .iter()
            .map(|kind| MetricDescriptor::per_workspace(*kind))
            .collect::<Result<Vec<_>, _>>()?;
        let installation_descriptors = StatusKind::ALL
            .iter()
            .map(|kind| MetricDescriptor::installation(*kind))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            organization: organization.into(),
            aggregator,
            scrape_timeout,
            descriptors,
            installation_descriptors,
        })
    }

    /// The fixed per-workspace descriptor set. Built once at construction.
    pub fn describe(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    /// The fixed unlabelled descriptor set for installation-wide totals.
    pub fn describe_installation(&self) -> &[MetricDescriptor] {
        &self.installation_descriptors
    }

    /// Per-workspace samples for a fresh snapshot.
    pub async fn collect(&self) -> Result<Vec<Sample>, ExporterError> {
        self.scrape().await.map(|scrape| scrape.samples)
    }

    /// Aggregate a fresh snapshot and the installation totals concurrently.
    ///
    /// Fails as a whole when either query fails or the pair overruns the
    /// scrape deadline; no partial result is ever returned.
    pub async fn scrape(&self) -> Result<Scrape, ExporterError> {
        debug!(organization = %self.organization, "scraping run status counts");
        let started = Instant::now();

        let queries = async {
            futures::try_join!(
                self.aggregator.aggregate(&self.organization),
                self.aggregator.installation_totals(),
            )
        };
        let result = tokio::time::timeout(self.scrape_timeout, queries)
            .await
            .unwrap_or(Err(ExporterError::ScrapeTimeout(self.scrape_timeout)));
        SCRAPE_DURATION.observe(started.elapsed().as_secs_f64());

        let (runs, totals) = match result {
            Ok(pair) => pair,
            Err(err) => {
                SCRAPE_FAILURES.inc();
                error!(organization = %self.organization, error = %err, "scrape failed");
                return Err(err);
            }
        };

        let samples = flatten(&runs);
        info!(
            organization = %self.organization,
            workspaces = runs.len(),
            samples = samples.len(),
            installation_total = totals.total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scrape complete"
        );
        Ok(Scrape { samples, totals })
    }

    /// Group samples into gauge families, one per descriptor. Descriptors
    /// without samples are left out.
    pub fn families(&self, samples: &[Sample]) -> Vec<MetricFamily> {
        self.descriptors
            .iter()
            .filter_map(|descriptor| {
                let mut matching: Vec<&Sample> = samples
                    .iter()
                    .filter(|s| s.kind == descriptor.kind)
                    .collect();
                if matching.is_empty() {
                    return None;
                }
                matching.sort_by(|a, b| a.workspace.cmp(&b.workspace));

                let mut family = descriptor.family();
                for sample in matching {
                    family
                        .mut_metric()
                        .push(gauge(Some(&sample.workspace), sample.value));
                }
                Some(family)
            })
            .collect()
    }

    /// One single-sample unlabelled family per status kind.
    pub fn installation_families(&self, totals: &StatusCounts) -> Vec<MetricFamily> {
        self.installation_descriptors
            .iter()
            .map(|descriptor| {
                let mut family = descriptor.family();
                family
                    .mut_metric()
                    .push(gauge(None, totals.get(descriptor.kind) as f64));
                family
            })
            .collect()
    }
}

fn flatten(runs: &RunsByWorkspace) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(runs.len() * StatusKind::ALL.len());
    for (workspace, counts) in runs {
        for kind in StatusKind::ALL {
            samples.push(Sample {
                kind,
                workspace: workspace.clone(),
                value: counts.get(kind) as f64,
            });
        }
    }
    samples
}

fn gauge(workspace: Option<&str>, value: f64) -> Metric {
    let mut g = Gauge::default();
    g.set_value(value);

    let mut metric = Metric::default();
    if let Some(workspace) = workspace {
        let mut label = LabelPair::default();
        label.set_name(WORKSPACE_LABEL.to_string());
        label.set_value(workspace.to_string());
        metric.mut_label().push(label);
    }
    metric.set_gauge(g);
    metric
}

/// Render families in the text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, ExporterError> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(families, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ExporterError::Encode(e.to_string()))
}
