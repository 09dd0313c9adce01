//! Walk table definitions for the Hub3 management interface.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::channel::{Direction, Field};

/// Downstream channel table (`docsIfDownstreamChannelTable`).
pub const OID_DOWNSTREAM_CHANNELS: &str = "1.3.6.1.2.1.10.127.1.1.1";
/// Downstream SNR table.
pub const OID_DOWNSTREAM_SNR: &str = "1.3.6.1.4.1.4491.2.1.20.1.24.1.1";
/// Downstream correctable codewords (`docsIfSigQCorrecteds`).
pub const OID_DOWNSTREAM_CORRECTEDS: &str = "1.3.6.1.2.1.10.127.1.1.4.1.3";
/// Downstream uncorrectable codewords (`docsIfSigQUncorrectables`).
pub const OID_DOWNSTREAM_UNCORRECTABLES: &str = "1.3.6.1.2.1.10.127.1.1.4.1.4";
/// Hub3 vendor upstream channel table.
pub const OID_UPSTREAM_CHANNELS_VENDOR: &str = "1.3.6.1.4.1.4115.1.3.4.1.9.2";
/// Upstream channel table (`docsIfUpstreamChannelTable`).
pub const OID_UPSTREAM_CHANNELS: &str = "1.3.6.1.2.1.10.127.1.1.2";
/// Upstream transmit power table.
pub const OID_UPSTREAM_POWER: &str = "1.3.6.1.4.1.4491.2.1.20.1.2.1.1";

/// Selector layout of the DOCSIS downstream channel table.
const DOWNSTREAM_CHANNEL_SELECTORS: &[(u32, Field)] = &[
    (1, Field::ChannelId),
    (2, Field::Frequency),
    (3, Field::Width),
    (4, Field::Modulation),
    (5, Field::Interleave),
    (6, Field::Power),
    (7, Field::Annex),
];

/// The vendor upstream table only contributes the channel ID.
const UPSTREAM_VENDOR_SELECTORS: &[(u32, Field)] = &[(1, Field::ChannelId)];

const UPSTREAM_CHANNEL_SELECTORS: &[(u32, Field)] = &[
    (1, Field::ChannelId),
    (2, Field::Frequency),
    (3, Field::Width),
];

/// How the entries of a walk table map onto record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// The second-to-last OID component selects the field.
    Selected(&'static [(u32, Field)]),
    /// Every entry populates the same field.
    Fixed(Field),
}

impl Layout {
    /// Resolve a selector to a field, if the layout defines it.
    pub fn field_for(&self, selector: u32) -> Option<Field> {
        match self {
            Layout::Selected(selectors) => selectors
                .iter()
                .find(|(s, _)| *s == selector)
                .map(|(_, field)| *field),
            Layout::Fixed(field) => Some(*field),
        }
    }
}

/// One walk request and how its results are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Short name used in logs and metric labels.
    pub name: &'static str,
    /// OID prefix passed to the walk endpoint.
    pub oid: &'static str,
    /// Which channel table the entries merge into.
    pub direction: Direction,
    pub layout: Layout,
}

/// Which observable behavior the exporter reproduces.
///
/// `Legacy` matches the output existing dashboards were built against,
/// including its defects: the post-RS walk reuses the pre-RS OID, upstream
/// frequency is never collected, and error counters are typed as gauges.
/// `Corrected` fixes all three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    #[default]
    Legacy,
    Corrected,
}

impl Compatibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compatibility::Legacy => "legacy",
            Compatibility::Corrected => "corrected",
        }
    }
}

impl FromStr for Compatibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(Compatibility::Legacy),
            "corrected" => Ok(Compatibility::Corrected),
            other => Err(format!(
                "unknown compatibility mode '{}' (expected 'legacy' or 'corrected')",
                other
            )),
        }
    }
}

/// Build the ordered list of tables walked on every collection cycle.
pub fn table_specs(compatibility: Compatibility) -> Vec<TableSpec> {
    let post_rs_oid = match compatibility {
        Compatibility::Legacy => OID_DOWNSTREAM_CORRECTEDS,
        Compatibility::Corrected => OID_DOWNSTREAM_UNCORRECTABLES,
    };

    let mut specs = vec![
        TableSpec {
            name: "downstream_channels",
            oid: OID_DOWNSTREAM_CHANNELS,
            direction: Direction::Downstream,
            layout: Layout::Selected(DOWNSTREAM_CHANNEL_SELECTORS),
        },
        TableSpec {
            name: "downstream_snr",
            oid: OID_DOWNSTREAM_SNR,
            direction: Direction::Downstream,
            layout: Layout::Fixed(Field::Snr),
        },
        TableSpec {
            name: "downstream_pre_rs",
            oid: OID_DOWNSTREAM_CORRECTEDS,
            direction: Direction::Downstream,
            layout: Layout::Fixed(Field::PreRsErrors),
        },
        TableSpec {
            name: "downstream_post_rs",
            oid: post_rs_oid,
            direction: Direction::Downstream,
            layout: Layout::Fixed(Field::PostRsErrors),
        },
        TableSpec {
            name: "upstream_channels",
            oid: OID_UPSTREAM_CHANNELS_VENDOR,
            direction: Direction::Upstream,
            layout: Layout::Selected(UPSTREAM_VENDOR_SELECTORS),
        },
    ];

    if compatibility == Compatibility::Corrected {
        specs.push(TableSpec {
            name: "upstream_channel_attributes",
            oid: OID_UPSTREAM_CHANNELS,
            direction: Direction::Upstream,
            layout: Layout::Selected(UPSTREAM_CHANNEL_SELECTORS),
        });
    }

    specs.push(TableSpec {
        name: "upstream_power",
        oid: OID_UPSTREAM_POWER,
        direction: Direction::Upstream,
        layout: Layout::Fixed(Field::Power),
    });

    specs
}
