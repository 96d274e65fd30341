//! Error types for viewer-sync.

use thiserror::Error;

use crate::ValueKind;

/// Errors that can occur when building viewer-sync vocabulary values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Entity name is empty or has an empty path segment
    #[error("invalid entity name: {0:?}")]
    InvalidName(String),

    /// Property key is not part of the synchronizable set
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// Text could not be read as a value of the property's kind
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Property the value was meant for.
        key: String,
        /// The rejected text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Value has a different kind than the property expects
    #[error("{key} expects a {expected} value, got {found}")]
    KindMismatch {
        /// Property the value was meant for.
        key: String,
        /// Kind declared by the property.
        expected: ValueKind,
        /// Kind of the supplied value.
        found: ValueKind,
    },
}
