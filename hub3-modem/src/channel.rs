//! Per-channel DOCSIS records and the tables that hold them.

use std::collections::BTreeMap;

/// Direction of a DOCSIS channel relative to the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Downstream,
    Upstream,
}

impl Direction {
    /// Get the direction name as used in metric names and labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Downstream => "downstream",
            Direction::Upstream => "upstream",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single field of a [`ChannelRecord`] that a walk entry can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ChannelId,
    Frequency,
    Width,
    Modulation,
    Interleave,
    Power,
    Annex,
    Snr,
    PreRsErrors,
    PostRsErrors,
}

/// Everything known about one physical channel.
///
/// Values are stored exactly as the device reports them. Power and SNR stay
/// in tenths (dBmV × 10, dB × 10) and are only scaled when emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Channel index, the record's identity and its external label.
    pub index: u32,
    /// Channel ID as reported by the device.
    pub channel_id: i64,
    pub frequency_hz: i64,
    pub width_hz: i64,
    pub modulation: i64,
    pub interleave_depth: i64,
    pub annex: i64,
    /// Power level in tenths of a dBmV.
    pub power_tenth_dbmv: i64,
    /// Signal to noise ratio in tenths of a dB.
    pub snr_tenth_db: i64,
    pub pre_rs_errors: i64,
    pub post_rs_errors: i64,
}

impl ChannelRecord {
    /// Create a zero-valued record for a channel index.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Set a single field to a raw device value.
    pub fn set(&mut self, field: Field, value: i64) {
        match field {
            Field::ChannelId => self.channel_id = value,
            Field::Frequency => self.frequency_hz = value,
            Field::Width => self.width_hz = value,
            Field::Modulation => self.modulation = value,
            Field::Interleave => self.interleave_depth = value,
            Field::Power => self.power_tenth_dbmv = value,
            Field::Annex => self.annex = value,
            Field::Snr => self.snr_tenth_db = value,
            Field::PreRsErrors => self.pre_rs_errors = value,
            Field::PostRsErrors => self.post_rs_errors = value,
        }
    }

    /// Power level in dBmV.
    pub fn power_dbmv(&self) -> f64 {
        self.power_tenth_dbmv as f64 / 10.0
    }

    /// Signal to noise ratio in dB.
    pub fn snr_db(&self) -> f64 {
        self.snr_tenth_db as f64 / 10.0
    }
}

/// Channel records keyed by channel index, in index order.
pub type ChannelTable = BTreeMap<u32, ChannelRecord>;
