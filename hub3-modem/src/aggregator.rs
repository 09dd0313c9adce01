//! Collection cycle: walk every table, merge into channel tables, emit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, trace, warn};

use crate::channel::{ChannelRecord, ChannelTable, Direction};
use crate::client::{ModemClient, WalkTable};
use crate::emit::{Observation, emit};
use crate::error::TableError;
use crate::oid::{SkipReason, decode_key, parse_value};
use crate::tables::{Compatibility, TableSpec, table_specs};

/// Downstream and upstream channel tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTables {
    pub downstream: ChannelTable,
    pub upstream: ChannelTable,
}

impl ChannelTables {
    pub fn table(&self, direction: Direction) -> &ChannelTable {
        match direction {
            Direction::Downstream => &self.downstream,
            Direction::Upstream => &self.upstream,
        }
    }

    pub fn table_mut(&mut self, direction: Direction) -> &mut ChannelTable {
        match direction {
            Direction::Downstream => &mut self.downstream,
            Direction::Upstream => &mut self.upstream,
        }
    }

    /// Merge one walk result into the table for `spec.direction`.
    ///
    /// Records are created on first sight of an index and updated in place.
    /// Entries that fail to decode are skipped individually; a value that
    /// fails to parse leaves the field's previous value untouched.
    pub fn merge_walk(&mut self, spec: &TableSpec, walk: &WalkTable) -> MergeStats {
        let mut stats = MergeStats::default();
        let table = self.table_mut(spec.direction);

        for (identifier, raw) in walk {
            stats.entries += 1;

            let key = match decode_key(identifier, &spec.layout) {
                Ok(key) => key,
                Err(reason) => {
                    debug!(table = spec.name, oid = %identifier, %reason, "Skipping walk entry");
                    stats.skip(reason);
                    continue;
                }
            };

            let record = table.entry(key.index).or_insert_with(|| {
                debug!(table = spec.name, channel = key.index, direction = %spec.direction, "Found new channel");
                stats.channels_created += 1;
                ChannelRecord::new(key.index)
            });

            let Some(field) = key.field else {
                debug!(table = spec.name, oid = %identifier, "Skipping walk entry with unknown selector");
                stats.skip(SkipReason::UnknownSelector);
                continue;
            };

            match parse_value(raw) {
                Ok(value) => {
                    record.set(field, value);
                    stats.applied += 1;
                }
                Err(reason) => {
                    debug!(table = spec.name, oid = %identifier, value = %raw, "Keeping previous value, walk value is not an integer");
                    stats.skip(reason);
                }
            }
        }

        stats
    }
}

/// Per-table merge counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entries returned by the walk.
    pub entries: u64,
    /// Entries assigned to a record field.
    pub applied: u64,
    /// Records created by this merge.
    pub channels_created: u64,
    /// Entries skipped, by reason.
    pub skipped: BTreeMap<SkipReason, u64>,
}

impl MergeStats {
    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    /// Number of entries skipped for `reason`.
    pub fn skipped(&self, reason: SkipReason) -> u64 {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }
}

/// Result of walking and merging a single table.
#[derive(Debug)]
pub struct TableOutcome {
    pub table: &'static str,
    pub direction: Direction,
    pub result: Result<MergeStats, TableError>,
}

/// Diagnostics for one collection cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub outcomes: Vec<TableOutcome>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// True when tables were attempted and none could be walked.
    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }

    /// Merge counts summed over all successful tables.
    pub fn merge_stats(&self) -> MergeStats {
        let mut total = MergeStats::default();
        for stats in self.outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
            total.entries += stats.entries;
            total.applied += stats.applied;
            total.channels_created += stats.channels_created;
            for (reason, count) in &stats.skipped {
                *total.skipped.entry(*reason).or_default() += count;
            }
        }
        total
    }
}

/// Everything a collection cycle produced.
#[derive(Debug)]
pub struct Collection {
    pub downstream: ChannelTable,
    pub upstream: ChannelTable,
    pub observations: Vec<Observation>,
    pub report: CycleReport,
    /// Cumulative statistics as of the end of this cycle.
    pub stats: AggregatorStats,
}

/// Cumulative aggregator statistics.
#[derive(Debug, Clone, Default)]
pub struct AggregatorStats {
    /// Collection cycles run.
    pub cycles: u64,
    /// Cycles in which every table walk failed.
    pub failed_cycles: u64,
    /// Failed walks, by table name.
    pub table_failures: BTreeMap<&'static str, u64>,
    /// Entries assigned to a record field.
    pub entries_applied: u64,
    /// Entries skipped, by reason.
    pub entries_skipped: BTreeMap<SkipReason, u64>,
    /// Channels discovered since start.
    pub channels_discovered: u64,
    /// Duration of the most recent cycle.
    pub last_duration: Option<Duration>,
}

/// Owns the channel tables and runs collection cycles against one modem.
pub struct ChannelAggregator {
    client: ModemClient,
    specs: Vec<TableSpec>,
    compatibility: Compatibility,
    deadline: Duration,
    /// Held for the whole fetch, merge and emit sequence.
    tables: Mutex<ChannelTables>,
    stats: RwLock<AggregatorStats>,
}

impl ChannelAggregator {
    /// Create an aggregator. The client's timeout doubles as the deadline
    /// for a whole cycle.
    pub fn new(client: ModemClient, compatibility: Compatibility) -> Self {
        let deadline = client.timeout();
        Self {
            client,
            specs: table_specs(compatibility),
            compatibility,
            deadline,
            tables: Mutex::new(ChannelTables::default()),
            stats: RwLock::new(AggregatorStats::default()),
        }
    }

    pub fn compatibility(&self) -> Compatibility {
        self.compatibility
    }

    /// Tables walked on every cycle.
    pub fn specs(&self) -> &[TableSpec] {
        &self.specs
    }

    /// Run one collection cycle.
    ///
    /// Only one cycle runs at a time; concurrent callers wait their turn.
    /// A failed walk leaves the previous records in place and the cycle goes
    /// on with the next table.
    pub async fn collect(&self) -> Collection {
        let mut tables = self.tables.lock().await;
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.deadline;

        let mut outcomes = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let result = self
                .walk(spec, deadline)
                .await
                .map(|walk| tables.merge_walk(spec, &walk));

            match &result {
                Ok(stats) => trace!(
                    table = spec.name,
                    entries = stats.entries,
                    applied = stats.applied,
                    skipped = stats.skipped_total(),
                    "Merged table"
                ),
                Err(e) => warn!(table = spec.name, oid = spec.oid, error = %e, "Table unavailable"),
            }

            outcomes.push(TableOutcome {
                table: spec.name,
                direction: spec.direction,
                result,
            });
        }

        let report = CycleReport {
            outcomes,
            duration: started.elapsed(),
        };

        if report.is_total_failure() {
            error!(
                tables = report.outcomes.len(),
                "Every table walk failed, serving last known channel data"
            );
        }

        let stats = self.record(&report);

        let observations = emit(&tables, self.compatibility);

        Collection {
            downstream: tables.downstream.clone(),
            upstream: tables.upstream.clone(),
            observations,
            report,
            stats,
        }
    }

    async fn walk(
        &self,
        spec: &TableSpec,
        deadline: tokio::time::Instant,
    ) -> Result<WalkTable, TableError> {
        let exceeded = || TableError::DeadlineExceeded {
            oid: spec.oid.to_string(),
        };

        if tokio::time::Instant::now() >= deadline {
            return Err(exceeded());
        }

        match tokio::time::timeout_at(deadline, self.client.fetch_table(spec.oid)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(exceeded()),
        }
    }

    fn record(&self, report: &CycleReport) -> AggregatorStats {
        let merged = report.merge_stats();
        let mut stats = self.stats.write();

        stats.cycles += 1;
        if report.is_total_failure() {
            stats.failed_cycles += 1;
        }
        for outcome in report.outcomes.iter().filter(|o| o.result.is_err()) {
            *stats.table_failures.entry(outcome.table).or_default() += 1;
        }
        stats.entries_applied += merged.applied;
        stats.channels_discovered += merged.channels_created;
        for (reason, count) in merged.skipped {
            *stats.entries_skipped.entry(reason).or_default() += count;
        }
        stats.last_duration = Some(report.duration);
        stats.clone()
    }

    /// Get cumulative statistics.
    pub fn stats(&self) -> AggregatorStats {
        self.stats.read().clone()
    }
}

/// Create a shareable aggregator handle.
pub type SharedAggregator = Arc<ChannelAggregator>;
