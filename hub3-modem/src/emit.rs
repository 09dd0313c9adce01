//! Conversion of channel records into labeled observations.

use crate::aggregator::ChannelTables;
use crate::channel::{ChannelRecord, Direction};
use crate::tables::Compatibility;

/// A per-channel metric the exporter publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    DownstreamFrequency,
    DownstreamPower,
    DownstreamSnr,
    DownstreamPreRsErrors,
    DownstreamPostRsErrors,
    UpstreamFrequency,
    UpstreamPower,
}

const LEGACY_METRICS: &[MetricKind] = &[
    MetricKind::DownstreamFrequency,
    MetricKind::DownstreamPower,
    MetricKind::DownstreamSnr,
    MetricKind::DownstreamPreRsErrors,
    MetricKind::DownstreamPostRsErrors,
    MetricKind::UpstreamPower,
];

const CORRECTED_METRICS: &[MetricKind] = &[
    MetricKind::DownstreamFrequency,
    MetricKind::DownstreamPower,
    MetricKind::DownstreamSnr,
    MetricKind::DownstreamPreRsErrors,
    MetricKind::DownstreamPostRsErrors,
    MetricKind::UpstreamFrequency,
    MetricKind::UpstreamPower,
];

impl MetricKind {
    /// Metrics emitted in the given compatibility mode, in emission order.
    pub fn emitted(compatibility: Compatibility) -> &'static [MetricKind] {
        match compatibility {
            Compatibility::Legacy => LEGACY_METRICS,
            Compatibility::Corrected => CORRECTED_METRICS,
        }
    }

    /// Metric name without namespace.
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::DownstreamFrequency => "downstream_frequency_hertz",
            MetricKind::DownstreamPower => "downstream_power_dbmv",
            MetricKind::DownstreamSnr => "downstream_snr_db",
            MetricKind::DownstreamPreRsErrors => "downstream_pre_rs_errors",
            MetricKind::DownstreamPostRsErrors => "downstream_post_rs_errors",
            MetricKind::UpstreamFrequency => "upstream_frequency_hertz",
            MetricKind::UpstreamPower => "upstream_power_dbmv",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricKind::DownstreamFrequency => "Downstream frequency in Hz",
            MetricKind::DownstreamPower => "Downstream power level in dBmV",
            MetricKind::DownstreamSnr => "Downstream SNR in dB",
            MetricKind::DownstreamPreRsErrors => "Number of errors per channel pre RS",
            MetricKind::DownstreamPostRsErrors => "Number of errors per channel post RS",
            MetricKind::UpstreamFrequency => "Upstream frequency in Hz",
            MetricKind::UpstreamPower => "Upstream power level in dBmV",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            MetricKind::UpstreamFrequency | MetricKind::UpstreamPower => Direction::Upstream,
            _ => Direction::Downstream,
        }
    }

    /// Whether the underlying device value only ever increases.
    pub fn is_monotonic(&self) -> bool {
        matches!(
            self,
            MetricKind::DownstreamPreRsErrors | MetricKind::DownstreamPostRsErrors
        )
    }

    /// Value of this metric for a record, in physical units.
    pub fn value(&self, record: &ChannelRecord) -> f64 {
        match self {
            MetricKind::DownstreamFrequency | MetricKind::UpstreamFrequency => {
                record.frequency_hz as f64
            }
            MetricKind::DownstreamPower | MetricKind::UpstreamPower => record.power_dbmv(),
            MetricKind::DownstreamSnr => record.snr_db(),
            MetricKind::DownstreamPreRsErrors => record.pre_rs_errors as f64,
            MetricKind::DownstreamPostRsErrors => record.post_rs_errors as f64,
        }
    }
}

/// One labeled numeric sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub kind: MetricKind,
    /// Channel index of the record the value came from.
    pub channel: u32,
    pub value: f64,
}

impl Observation {
    /// The `channel` label value.
    pub fn channel_label(&self) -> String {
        self.channel.to_string()
    }
}

/// Emit observations for every record currently held, grouped by metric and
/// ordered by channel index.
pub fn emit(tables: &ChannelTables, compatibility: Compatibility) -> Vec<Observation> {
    let metrics = MetricKind::emitted(compatibility);
    let mut observations =
        Vec::with_capacity(metrics.len() * (tables.downstream.len() + tables.upstream.len()));

    for kind in metrics {
        for record in tables.table(kind.direction()).values() {
            observations.push(Observation {
                kind: *kind,
                channel: record.index,
                value: kind.value(record),
            });
        }
    }

    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Field;

    fn tables_with(downstream: &[(u32, Field, i64)], upstream: &[(u32, Field, i64)]) -> ChannelTables {
        let mut tables = ChannelTables::default();
        for (index, field, value) in downstream {
            tables
                .downstream
                .entry(*index)
                .or_insert_with(|| ChannelRecord::new(*index))
                .set(*field, *value);
        }
        for (index, field, value) in upstream {
            tables
                .upstream
                .entry(*index)
                .or_insert_with(|| ChannelRecord::new(*index))
                .set(*field, *value);
        }
        tables
    }

    #[test]
    fn test_emit_legacy_counts() {
        let tables = tables_with(
            &[(1, Field::Frequency, 1), (2, Field::Frequency, 2)],
            &[(1, Field::Power, 400), (1, Field::Frequency, 30_000_000)],
        );

        let observations = emit(&tables, Compatibility::Legacy);

        // Five per downstream record, one per upstream record
        assert_eq!(observations.len(), 2 * 5 + 1);
        assert!(
            !observations
                .iter()
                .any(|o| o.kind == MetricKind::UpstreamFrequency)
        );
    }

    #[test]
    fn test_emit_corrected_includes_upstream_frequency() {
        let tables = tables_with(&[], &[(4, Field::Frequency, 30_000_000)]);

        let observations = emit(&tables, Compatibility::Corrected);
        let frequency = observations
            .iter()
            .find(|o| o.kind == MetricKind::UpstreamFrequency)
            .unwrap();

        assert_eq!(frequency.channel, 4);
        assert_eq!(frequency.value, 30_000_000.0);
    }

    #[test]
    fn test_emit_scales_power_and_snr() {
        let tables = tables_with(
            &[(3, Field::Power, 57), (3, Field::Snr, 350)],
            &[(1, Field::Power, 455)],
        );

        let observations = emit(&tables, Compatibility::Legacy);
        let value_of = |kind| {
            observations
                .iter()
                .find(|o| o.kind == kind)
                .map(|o| o.value)
                .unwrap()
        };

        assert_eq!(value_of(MetricKind::DownstreamPower), 5.7);
        assert_eq!(value_of(MetricKind::DownstreamSnr), 35.0);
        assert_eq!(value_of(MetricKind::UpstreamPower), 45.5);

        // Emission never writes back into the records
        assert_eq!(tables.downstream[&3].snr_tenth_db, 350);
    }

    #[test]
    fn test_emit_order() {
        let tables = tables_with(
            &[(9, Field::Frequency, 9), (2, Field::Frequency, 2)],
            &[],
        );

        let observations = emit(&tables, Compatibility::Legacy);
        let frequencies: Vec<u32> = observations
            .iter()
            .filter(|o| o.kind == MetricKind::DownstreamFrequency)
            .map(|o| o.channel)
            .collect();

        assert_eq!(frequencies, vec![2, 9]);
        assert_eq!(observations[0].kind, MetricKind::DownstreamFrequency);
        assert_eq!(observations[0].channel_label(), "2");
    }

    #[test]
    fn test_emit_empty_tables() {
        let observations = emit(&ChannelTables::default(), Compatibility::Legacy);
        assert!(observations.is_empty());
    }

    #[test]
    fn test_monotonic_metrics() {
        assert!(MetricKind::DownstreamPreRsErrors.is_monotonic());
        assert!(MetricKind::DownstreamPostRsErrors.is_monotonic());
        assert!(!MetricKind::DownstreamSnr.is_monotonic());
    }
}
