//! Identity types for viewer-sync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SyncError;

/// Separator between path segments of a fully-qualified name.
const PATH_SEPARATOR: char = '.';

/// The fully-qualified name of a viewer entity.
///
/// Names are dot-separated paths: `Viewer1` lives at the top level,
/// `Comp.Precomp.Viewer1` lives inside `Comp.Precomp`. Two handles refer to
/// the same entity exactly when their names are equal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    /// Create a name, rejecting empty names and empty path segments.
    pub fn new(name: impl Into<String>) -> Result<Self, SyncError> {
        let name = name.into();
        if name.is_empty() || name.split(PATH_SEPARATOR).any(|s| s.trim().is_empty()) {
            return Err(SyncError::InvalidName(name));
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parent path, or `None` for a top-level entity.
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once(PATH_SEPARATOR).map(|(parent, _)| parent)
    }

    /// The last path segment.
    pub fn short_name(&self) -> &str {
        self.0
            .rsplit_once(PATH_SEPARATOR)
            .map_or(self.0.as_str(), |(_, short)| short)
    }
}

impl FromStr for EntityName {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityName {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.0
    }
}

impl AsRef<str> for EntityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityName({})", self.0)
    }
}

/// One slot of a viewer's ordered input list.
///
/// `None` is an unconnected slot; slots keep their position so that the
/// full list can be copied verbatim between viewers.
pub type InputRef = Option<EntityName>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_nested_name() {
        let name = EntityName::new("Comp.Precomp.Viewer1").unwrap();
        assert_eq!(name.parent(), Some("Comp.Precomp"));
        assert_eq!(name.short_name(), "Viewer1");
    }

    #[test]
    fn top_level_has_no_parent() {
        let name = EntityName::new("Viewer1").unwrap();
        assert_eq!(name.parent(), None);
        assert_eq!(name.short_name(), "Viewer1");
    }

    #[test]
    fn empty_names_rejected() {
        assert!(EntityName::new("").is_err());
        assert!(EntityName::new("Comp..Viewer1").is_err());
        assert!(EntityName::new("Viewer1.").is_err());
        assert!(EntityName::new(" ").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let name = EntityName::new("Comp.Viewer2").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Comp.Viewer2\"");
        let restored: EntityName = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, name);
    }

    #[test]
    fn deserialize_rejects_invalid_name() {
        let result: Result<EntityName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
