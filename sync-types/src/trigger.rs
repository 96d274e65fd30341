//! What a host change notification was about.

use std::fmt;

use crate::PropertyKey;

/// The classified key of a change notification.
///
/// Hosts report changes by key string; the engine classifies that string
/// once and matches on this type afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The viewer's input list changed.
    Inputs,
    /// Generic "refresh everything" notification.
    Batch,
    /// A synchronizable property changed.
    Property(PropertyKey),
    /// A per-property enable flag changed.
    EnableFlag(PropertyKey),
    /// Anything else. Never acted upon.
    Other(String),
}

impl Trigger {
    /// Check if the engine should react to this trigger at all.
    pub fn is_relevant(&self) -> bool {
        !matches!(self, Trigger::Other(_))
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Inputs => f.write_str("inputs"),
            Trigger::Batch => f.write_str("batch"),
            Trigger::Property(key) => write!(f, "property:{}", key),
            Trigger::EnableFlag(key) => write!(f, "flag:{}", key),
            Trigger::Other(key) => write!(f, "other:{}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_other_is_irrelevant() {
        assert!(Trigger::Inputs.is_relevant());
        assert!(Trigger::Batch.is_relevant());
        assert!(Trigger::Property(PropertyKey::Gain).is_relevant());
        assert!(Trigger::EnableFlag(PropertyKey::Gain).is_relevant());
        assert!(!Trigger::Other("xpos".into()).is_relevant());
    }

    #[test]
    fn display() {
        assert_eq!(Trigger::Property(PropertyKey::Gamma).to_string(), "property:gamma");
        assert_eq!(Trigger::EnableFlag(PropertyKey::Roi).to_string(), "flag:roi");
    }
}
