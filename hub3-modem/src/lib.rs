//! DOCSIS channel telemetry collection for Hub3 cable modems.
//!
//! The modem exposes its SNMP tables over HTTP (`/walk?oids=<oid>;`). This
//! crate walks those tables, folds the entries into one record per channel
//! and turns the records into labeled observations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   ModemClient   │────>│ChannelAggregator│────>│  Observations   │
//! │ (walk requests) │     │ (decode, merge) │     │ (unit scaling)  │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use hub3_modem::{ChannelAggregator, Compatibility, ModemClient};
//!
//! # async fn run() -> Result<(), hub3_modem::ClientError> {
//! let client = ModemClient::new("192.168.100.1", Duration::from_secs(5))?;
//! let aggregator = ChannelAggregator::new(client, Compatibility::Legacy);
//!
//! let collection = aggregator.collect().await;
//! for observation in &collection.observations {
//!     println!("{:?} {} {}", observation.kind, observation.channel, observation.value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod channel;
pub mod client;
pub mod emit;
pub mod error;
pub mod oid;
pub mod tables;

pub use aggregator::{
    AggregatorStats, ChannelAggregator, ChannelTables, Collection, CycleReport, MergeStats,
    SharedAggregator, TableOutcome,
};
pub use channel::{ChannelRecord, ChannelTable, Direction, Field};
pub use client::{ModemClient, WalkTable};
pub use emit::{MetricKind, Observation, emit};
pub use error::{ClientError, TableError};
pub use oid::SkipReason;
pub use tables::{Compatibility, TableSpec, table_specs};
