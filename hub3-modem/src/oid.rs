//! Decoding of walk entry identifiers into channel index and field.

use crate::channel::Field;
use crate::tables::Layout;

/// Minimum number of dot-separated components an identifier needs to carry
/// both a selector and a channel index.
pub const MIN_COMPONENTS: usize = 3;

/// Why a walk entry was not applied to a channel record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// Identifier has fewer than [`MIN_COMPONENTS`] components.
    TooFewComponents,
    /// Last component is not a positive integer.
    InvalidIndex,
    /// Second-to-last component is not an integer.
    InvalidSelector,
    /// Selector is not defined for the table.
    UnknownSelector,
    /// Value is not an integer.
    InvalidValue,
}

impl SkipReason {
    /// All reasons, in label order.
    pub const ALL: [SkipReason; 5] = [
        SkipReason::TooFewComponents,
        SkipReason::InvalidIndex,
        SkipReason::InvalidSelector,
        SkipReason::UnknownSelector,
        SkipReason::InvalidValue,
    ];

    /// Get the reason as used in metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::TooFewComponents => "too_few_components",
            SkipReason::InvalidIndex => "invalid_index",
            SkipReason::InvalidSelector => "invalid_selector",
            SkipReason::UnknownSelector => "unknown_selector",
            SkipReason::InvalidValue => "invalid_value",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A walk entry identifier resolved against a table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedKey {
    /// Channel index (last component).
    pub index: u32,
    /// Field to populate, or `None` when the selector is not part of the layout.
    pub field: Option<Field>,
}

/// Decode an identifier such as `1.3.6.1.2.1.10.127.1.1.1.1.2.3` into its
/// channel index and target field.
///
/// For [`Layout::Selected`] tables the second-to-last component must parse as
/// an integer; for [`Layout::Fixed`] tables it is not inspected.
pub fn decode_key(identifier: &str, layout: &Layout) -> Result<DecodedKey, SkipReason> {
    let parts: Vec<&str> = identifier.split('.').collect();
    if parts.len() < MIN_COMPONENTS {
        return Err(SkipReason::TooFewComponents);
    }

    let index = parse_index(parts[parts.len() - 1])?;

    let field = match layout {
        Layout::Selected(_) => {
            let selector: u32 = parts[parts.len() - 2]
                .parse()
                .map_err(|_| SkipReason::InvalidSelector)?;
            layout.field_for(selector)
        }
        Layout::Fixed(field) => Some(*field),
    };

    Ok(DecodedKey { index, field })
}

fn parse_index(component: &str) -> Result<u32, SkipReason> {
    match component.parse::<u32>() {
        Ok(0) | Err(_) => Err(SkipReason::InvalidIndex),
        Ok(index) => Ok(index),
    }
}

/// Parse a raw walk value as an integer.
pub fn parse_value(raw: &str) -> Result<i64, SkipReason> {
    raw.trim().parse().map_err(|_| SkipReason::InvalidValue)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNELS: Layout = Layout::Selected(&[(1, Field::ChannelId), (2, Field::Frequency)]);

    #[test]
    fn test_decode_selected_entry() {
        let key = decode_key("1.3.6.1.2.1.10.127.1.1.1.1.2.3", &CHANNELS).unwrap();
        assert_eq!(key.index, 3);
        assert_eq!(key.field, Some(Field::Frequency));
    }

    #[test]
    fn test_decode_fixed_entry_ignores_selector() {
        let layout = Layout::Fixed(Field::Snr);
        let key = decode_key("1.3.6.1.4.1.4491.2.1.20.1.24.1.1.3", &layout).unwrap();
        assert_eq!(key.index, 3);
        assert_eq!(key.field, Some(Field::Snr));

        // Non-numeric second-to-last component is fine for fixed tables
        let key = decode_key("a.b.12", &layout).unwrap();
        assert_eq!(key.index, 12);
    }

    #[test]
    fn test_decode_too_few_components() {
        // Hub3 walk responses end with a "1": "Finish" trailer
        assert_eq!(
            decode_key("1", &CHANNELS),
            Err(SkipReason::TooFewComponents)
        );
        assert_eq!(
            decode_key("2.3", &CHANNELS),
            Err(SkipReason::TooFewComponents)
        );
        assert_eq!(decode_key("", &CHANNELS), Err(SkipReason::TooFewComponents));
    }

    #[test]
    fn test_decode_invalid_index() {
        assert_eq!(
            decode_key("1.3.6.2.x", &CHANNELS),
            Err(SkipReason::InvalidIndex)
        );
        assert_eq!(
            decode_key("1.3.6.2.0", &CHANNELS),
            Err(SkipReason::InvalidIndex)
        );
        assert_eq!(
            decode_key("1.3.6.2.-4", &CHANNELS),
            Err(SkipReason::InvalidIndex)
        );
    }

    #[test]
    fn test_decode_invalid_selector() {
        assert_eq!(
            decode_key("1.3.6.freq.3", &CHANNELS),
            Err(SkipReason::InvalidSelector)
        );
    }

    #[test]
    fn test_decode_unknown_selector() {
        let key = decode_key("1.3.6.9.3", &CHANNELS).unwrap();
        assert_eq!(key.index, 3);
        assert_eq!(key.field, None);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("350"), Ok(350));
        assert_eq!(parse_value("-25"), Ok(-25));
        assert_eq!(parse_value(" 42 "), Ok(42));
        assert_eq!(parse_value("35.0"), Err(SkipReason::InvalidValue));
        assert_eq!(parse_value(""), Err(SkipReason::InvalidValue));
    }

    #[test]
    fn test_skip_reason_labels() {
        let labels: Vec<&str> = SkipReason::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "too_few_components",
                "invalid_index",
                "invalid_selector",
                "unknown_selector",
                "invalid_value"
            ]
        );
    }
}
