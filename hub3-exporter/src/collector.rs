//! Scrape collector: runs a collection cycle and renders the exposition text.

use std::fmt::Write;
use std::sync::Arc;

use hub3_modem::{
    AggregatorStats, Collection, Compatibility, Direction, MetricKind, SharedAggregator,
    SkipReason,
};
use tracing::debug;

use crate::config::PrometheusConfig;
use crate::mapping::{PrometheusType, build_metric_name, format_labels, format_value};

/// Exporter version reported in `_exporter_build_info` and on the landing page.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One rendered sample.
struct Sample {
    labels: Vec<(&'static str, String)>,
    value: f64,
}

/// A metric family: HELP and TYPE lines followed by its samples.
struct MetricFamily {
    name: String,
    help: &'static str,
    metric_type: PrometheusType,
    samples: Vec<Sample>,
}

impl MetricFamily {
    fn new(name: String, help: &'static str, metric_type: PrometheusType) -> Self {
        Self {
            name,
            help,
            metric_type,
            samples: Vec::new(),
        }
    }

    fn with_sample(mut self, labels: Vec<(&'static str, String)>, value: f64) -> Self {
        self.samples.push(Sample { labels, value });
        self
    }

    fn write_to(&self, output: &mut String) {
        writeln!(output, "# HELP {} {}", self.name, self.help).ok();
        writeln!(output, "# TYPE {} {}", self.name, self.metric_type.as_str()).ok();
        for sample in &self.samples {
            writeln!(
                output,
                "{}{} {}",
                self.name,
                format_labels(&sample.labels),
                format_value(sample.value)
            )
            .ok();
        }
    }
}

/// Runs a collection cycle per scrape and renders it.
pub struct ScrapeCollector {
    aggregator: SharedAggregator,
    namespace: String,
}

impl ScrapeCollector {
    /// Create a new scrape collector.
    pub fn new(aggregator: SharedAggregator, config: &PrometheusConfig) -> Self {
        Self {
            aggregator,
            namespace: config.namespace.clone(),
        }
    }

    /// Collect from the modem and render the result.
    pub async fn scrape(&self) -> String {
        let collection = self.aggregator.collect().await;

        debug!(
            observations = collection.observations.len(),
            failed_tables = collection.report.failed(),
            duration_ms = collection.report.duration.as_millis() as u64,
            "Scrape collected"
        );

        self.render(&collection)
    }

    fn name(&self, suffix: &str) -> String {
        build_metric_name(&self.namespace, suffix)
    }

    /// Render a collection in Prometheus exposition format.
    ///
    /// Channel metric families come first, sorted by name, followed by the
    /// exporter's own metrics as of the same cycle.
    pub fn render(&self, collection: &Collection) -> String {
        let compatibility = self.aggregator.compatibility();
        let mut output = String::with_capacity(collection.observations.len() * 64 + 2048);

        let mut families = self.channel_families(collection, compatibility);
        families.sort_by(|a, b| a.name.cmp(&b.name));
        for family in &families {
            family.write_to(&mut output);
        }

        for family in self.exporter_families(collection, &collection.stats, compatibility) {
            family.write_to(&mut output);
        }

        output
    }

    fn channel_families(
        &self,
        collection: &Collection,
        compatibility: Compatibility,
    ) -> Vec<MetricFamily> {
        MetricKind::emitted(compatibility)
            .iter()
            .filter_map(|kind| {
                let samples: Vec<Sample> = collection
                    .observations
                    .iter()
                    .filter(|o| o.kind == *kind)
                    .map(|o| Sample {
                        labels: vec![("channel", o.channel_label())],
                        value: o.value,
                    })
                    .collect();

                if samples.is_empty() {
                    return None;
                }

                Some(MetricFamily {
                    name: self.name(kind.name()),
                    help: kind.help(),
                    metric_type: PrometheusType::for_metric(*kind, compatibility),
                    samples,
                })
            })
            .collect()
    }

    fn exporter_families(
        &self,
        collection: &Collection,
        stats: &AggregatorStats,
        compatibility: Compatibility,
    ) -> Vec<MetricFamily> {
        let report = &collection.report;
        let up = if report.is_total_failure() { 0.0 } else { 1.0 };

        let mut table_failures = MetricFamily::new(
            self.name("exporter_table_failures_total"),
            "Walk requests that failed, by table",
            PrometheusType::Counter,
        );
        for spec in self.aggregator.specs() {
            let failures = stats.table_failures.get(spec.name).copied().unwrap_or(0);
            table_failures = table_failures
                .with_sample(vec![("table", spec.name.to_string())], failures as f64);
        }

        let mut skipped = MetricFamily::new(
            self.name("exporter_entries_skipped_total"),
            "Walk entries that could not be applied, by reason",
            PrometheusType::Counter,
        );
        for reason in SkipReason::ALL {
            let count = stats.entries_skipped.get(&reason).copied().unwrap_or(0);
            skipped = skipped.with_sample(vec![("reason", reason.to_string())], count as f64);
        }

        let channels = MetricFamily::new(
            self.name("exporter_channels"),
            "Channels currently held, by direction",
            PrometheusType::Gauge,
        )
        .with_sample(
            vec![("direction", Direction::Downstream.to_string())],
            collection.downstream.len() as f64,
        )
        .with_sample(
            vec![("direction", Direction::Upstream.to_string())],
            collection.upstream.len() as f64,
        );

        vec![
            MetricFamily::new(
                self.name("up"),
                "Whether the last scrape reached the modem",
                PrometheusType::Gauge,
            )
            .with_sample(Vec::new(), up),
            MetricFamily::new(
                self.name("exporter_build_info"),
                "Exporter build information",
                PrometheusType::Gauge,
            )
            .with_sample(
                vec![
                    ("compatibility", compatibility.as_str().to_string()),
                    ("version", VERSION.to_string()),
                ],
                1.0,
            ),
            MetricFamily::new(
                self.name("exporter_collect_duration_seconds"),
                "Duration of the last collection cycle",
                PrometheusType::Gauge,
            )
            .with_sample(Vec::new(), report.duration.as_secs_f64()),
            MetricFamily::new(
                self.name("exporter_cycles_total"),
                "Collection cycles run",
                PrometheusType::Counter,
            )
            .with_sample(Vec::new(), stats.cycles as f64),
            MetricFamily::new(
                self.name("exporter_failed_cycles_total"),
                "Collection cycles in which every table walk failed",
                PrometheusType::Counter,
            )
            .with_sample(Vec::new(), stats.failed_cycles as f64),
            table_failures,
            skipped,
            channels,
        ]
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<ScrapeCollector>;
