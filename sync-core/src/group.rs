//! Sync group construction.
//!
//! A selection is partitioned by structural locality: viewers that share a
//! parent path are synced together. With nothing selected every discovered
//! viewer forms one implicit global group.

use std::collections::{HashMap, HashSet};
use std::fmt;
use viewer_sync_types::EntityName;

/// What a group's members have in common.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// The implicit group used when nothing is selected.
    Global,
    /// Top-level viewers (no parent path).
    Root,
    /// Viewers under this parent path.
    Parent(String),
}

impl GroupKey {
    fn of(name: &EntityName) -> Self {
        match name.parent() {
            Some(parent) => GroupKey::Parent(parent.to_string()),
            None => GroupKey::Root,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Global => f.write_str("<global>"),
            GroupKey::Root => f.write_str("<root>"),
            GroupKey::Parent(path) => f.write_str(path),
        }
    }
}

/// An ordered, duplicate-free set of viewers to keep in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroup {
    /// Grouping key.
    pub key: GroupKey,
    /// Members in discovery order.
    pub members: Vec<EntityName>,
}

impl SyncGroup {
    /// Every member except `member`, in group order.
    pub fn peers_of(&self, member: &EntityName) -> Vec<EntityName> {
        self.members
            .iter()
            .filter(|m| *m != member)
            .cloned()
            .collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Smallest group worth linking.
pub const MIN_GROUP_SIZE: usize = 2;

/// Partition a selection into sync groups.
///
/// An empty `selection` groups every `discovered` viewer under
/// [`GroupKey::Global`]. Order of first appearance is kept for both groups
/// and members, repeated names are ignored, and groups smaller than
/// [`MIN_GROUP_SIZE`] are dropped.
pub fn build_groups(selection: &[EntityName], discovered: &[EntityName]) -> Vec<SyncGroup> {
    let mut seen = HashSet::new();

    let groups = if selection.is_empty() {
        vec![SyncGroup {
            key: GroupKey::Global,
            members: discovered
                .iter()
                .filter(|name| seen.insert(*name))
                .cloned()
                .collect(),
        }]
    } else {
        let mut groups: Vec<SyncGroup> = Vec::new();
        let mut index: HashMap<GroupKey, usize> = HashMap::new();

        for name in selection {
            if !seen.insert(name) {
                continue;
            }
            let key = GroupKey::of(name);
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                groups.push(SyncGroup {
                    key,
                    members: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].members.push(name.clone());
        }
        groups
    };

    groups
        .into_iter()
        .filter(|g| g.len() >= MIN_GROUP_SIZE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<EntityName> {
        list.iter().map(|n| EntityName::new(*n).unwrap()).collect()
    }

    #[test]
    fn groups_by_parent_in_discovery_order() {
        let selection = names(&[
            "Comp.ViewerB",
            "Viewer1",
            "Comp.ViewerA",
            "Viewer2",
            "Other.Viewer1",
        ]);

        let groups = build_groups(&selection, &[]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, GroupKey::Parent("Comp".into()));
        assert_eq!(groups[0].members, names(&["Comp.ViewerB", "Comp.ViewerA"]));
        assert_eq!(groups[1].key, GroupKey::Root);
        assert_eq!(groups[1].members, names(&["Viewer1", "Viewer2"]));
    }

    #[test]
    fn empty_selection_is_one_global_group() {
        let discovered = names(&["Viewer1", "Comp.Viewer1", "Viewer2"]);

        let groups = build_groups(&[], &discovered);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, GroupKey::Global);
        assert_eq!(groups[0].members, discovered);
    }

    #[test]
    fn singletons_dropped() {
        let selection = names(&["Viewer1", "Comp.Viewer1"]);
        assert!(build_groups(&selection, &[]).is_empty());
        assert!(build_groups(&[], &names(&["Viewer1"])).is_empty());
        assert!(build_groups(&[], &[]).is_empty());
    }

    #[test]
    fn duplicates_ignored() {
        let selection = names(&["Viewer1", "Viewer1", "Viewer2"]);
        let groups = build_groups(&selection, &[]);
        assert_eq!(groups[0].members, names(&["Viewer1", "Viewer2"]));

        let repeated = names(&["Viewer1", "Viewer1"]);
        assert!(build_groups(&repeated, &[]).is_empty());
    }

    #[test]
    fn peers_exclude_member_by_identity() {
        let group = SyncGroup {
            key: GroupKey::Root,
            members: names(&["Viewer1", "Viewer2", "Viewer3"]),
        };
        let v2 = EntityName::new("Viewer2").unwrap();
        assert_eq!(group.peers_of(&v2), names(&["Viewer1", "Viewer3"]));
    }

    #[test]
    fn nested_parents_are_distinct_groups() {
        let selection = names(&["A.B.Viewer1", "A.Viewer1", "A.B.Viewer2", "A.Viewer2"]);
        let groups = build_groups(&selection, &[]);
        assert_eq!(groups[0].key, GroupKey::Parent("A.B".into()));
        assert_eq!(groups[1].key, GroupKey::Parent("A".into()));
    }
}
