//! Sync toggle controller.
//!
//! One user action links or unlinks the selected viewers. Each invocation
//! walks the same phases:
//!
//! 1. [`Grouped`] - the considered viewers and their sync groups
//! 2. [`Inspected`] - every considered callback slot classified, plus every
//!    viewer reachable through existing links
//! 3. A [`ToggleDecision`] and a list of [`ToggleAction`]s (pure)
//! 4. The actions applied to the host
//!
//! Planning is side-effect free so it can be tested without a host; only
//! the last step writes.

use std::collections::{HashSet, VecDeque};
use viewer_sync_types::{EntityName, PropertyKey};

use crate::config::SyncConfig;
use crate::group::{build_groups, SyncGroup, MIN_GROUP_SIZE};
use crate::host::Host;
use crate::link::{self, LinkError, LinkState};

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleMode {
    /// Unlink if anything considered is already linked, link otherwise.
    #[default]
    Auto,
    /// Link, first unlinking whatever the considered viewers were linked to.
    Link,
    /// Unlink.
    Unlink,
}

/// What the controller decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDecision {
    /// Write fresh links.
    Add,
    /// Clear existing links.
    Remove,
    /// Clear existing links, then write fresh ones.
    Relink,
    /// The host is unavailable; nothing was done.
    Disabled,
}

/// A single write planned by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleAction {
    /// Empty the callback slot and drop enable flags.
    ClearLink(EntityName),
    /// Store a peer list in the callback slot.
    WriteLink {
        /// Viewer to write.
        entity: EntityName,
        /// Its peers.
        peers: Vec<EntityName>,
    },
    /// Create the default enable-flag controls.
    MaterializeFlags(EntityName),
}

/// Outcome of one toggle invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleReport {
    /// What was decided.
    pub decision: ToggleDecision,
    /// Groups that received links.
    pub linked: Vec<SyncGroup>,
    /// Viewers whose links were cleared.
    pub cleared: Vec<EntityName>,
    /// Viewers left untouched, and why.
    pub skipped: Vec<(EntityName, LinkError)>,
}

impl ToggleReport {
    fn disabled() -> Self {
        Self {
            decision: ToggleDecision::Disabled,
            linked: Vec::new(),
            cleared: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// First phase: what is considered and how it is grouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouped {
    /// The selection, or every viewer when nothing is selected.
    pub considered: Vec<EntityName>,
    /// Groups of two or more.
    pub groups: Vec<SyncGroup>,
}

impl Grouped {
    /// Group the host's current selection.
    pub fn from_host<H: Host + ?Sized>(host: &H) -> Self {
        let selection = host.selected();
        let discovered = host.viewers();
        let groups = build_groups(&selection, &discovered);
        let considered = if selection.is_empty() {
            discovered
        } else {
            selection
        };
        Self { considered, groups }
    }

    /// Classify every considered slot and follow existing links.
    pub fn inspect<H: Host + ?Sized>(self, host: &H) -> Inspected {
        let mut states = Vec::with_capacity(self.considered.len());
        let mut visited: HashSet<EntityName> = HashSet::new();
        let mut queue = VecDeque::new();

        for name in &self.considered {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(text) = host.callback(name) else {
                continue;
            };
            let state = link::inspect(&text);
            if let LinkState::Linked(peers) = &state {
                queue.extend(peers.iter().cloned());
            }
            states.push((name.clone(), state));
        }

        // Peers outside the selection that a prior link still points at.
        let mut reachable = Vec::new();
        while let Some(peer) = queue.pop_front() {
            if !visited.insert(peer.clone()) {
                continue;
            }
            let Some(text) = host.callback(&peer) else {
                continue;
            };
            match link::inspect(&text) {
                LinkState::Foreign => {
                    tracing::debug!("{} holds a foreign callback, not following", peer);
                    continue;
                }
                LinkState::Linked(peers) => queue.extend(peers),
                LinkState::Unset | LinkState::Malformed(_) => {}
            }
            reachable.push(peer);
        }

        Inspected {
            groups: self.groups,
            states,
            reachable,
        }
    }
}

/// Second phase: classified slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspected {
    /// Groups of two or more.
    pub groups: Vec<SyncGroup>,
    /// Link state of every considered viewer that exists.
    pub states: Vec<(EntityName, LinkState)>,
    /// Viewers outside the considered set reachable through existing links.
    pub reachable: Vec<EntityName>,
}

impl Inspected {
    /// Decide between linking and unlinking.
    pub fn decide(&self, mode: ToggleMode) -> ToggleDecision {
        let any_marked = self.states.iter().any(|(_, state)| state.is_marked());
        match (mode, any_marked) {
            (ToggleMode::Unlink, _) => ToggleDecision::Remove,
            (ToggleMode::Auto, true) => ToggleDecision::Remove,
            (ToggleMode::Auto, false) | (ToggleMode::Link, false) => ToggleDecision::Add,
            (ToggleMode::Link, true) => ToggleDecision::Relink,
        }
    }

    /// Viewers whose slot belongs to somebody else.
    pub fn foreign(&self) -> impl Iterator<Item = &EntityName> {
        self.states
            .iter()
            .filter(|(_, state)| matches!(state, LinkState::Foreign))
            .map(|(name, _)| name)
    }

    /// Plan the writes for a decision.
    pub fn plan(&self, decision: ToggleDecision, granular: bool) -> Vec<ToggleAction> {
        match decision {
            ToggleDecision::Disabled => Vec::new(),
            ToggleDecision::Remove => self.plan_remove(),
            ToggleDecision::Add => self.plan_add(granular),
            ToggleDecision::Relink => {
                let mut actions = self.plan_remove();
                actions.extend(self.plan_add(granular));
                actions
            }
        }
    }

    /// Groups that will actually be linked once foreign viewers are excluded.
    pub fn linkable_groups(&self) -> Vec<SyncGroup> {
        let foreign: HashSet<&EntityName> = self.foreign().collect();
        self.groups
            .iter()
            .map(|group| SyncGroup {
                key: group.key.clone(),
                members: group
                    .members
                    .iter()
                    .filter(|m| !foreign.contains(m))
                    .cloned()
                    .collect(),
            })
            .filter(|group| group.len() >= MIN_GROUP_SIZE)
            .collect()
    }

    fn plan_remove(&self) -> Vec<ToggleAction> {
        self.states
            .iter()
            .filter(|(_, state)| !matches!(state, LinkState::Foreign))
            .map(|(name, _)| name)
            .chain(self.reachable.iter())
            .map(|name| ToggleAction::ClearLink(name.clone()))
            .collect()
    }

    fn plan_add(&self, granular: bool) -> Vec<ToggleAction> {
        let mut actions = Vec::new();
        for group in self.linkable_groups() {
            for member in &group.members {
                actions.push(ToggleAction::WriteLink {
                    entity: member.clone(),
                    peers: group.peers_of(member),
                });
                if granular {
                    actions.push(ToggleAction::MaterializeFlags(member.clone()));
                }
            }
        }
        actions
    }
}

/// Links and unlinks viewers.
#[derive(Debug, Clone, Copy)]
pub struct SyncToggle<'c> {
    config: &'c SyncConfig,
}

impl<'c> SyncToggle<'c> {
    /// Create a controller using `config`.
    pub fn new(config: &'c SyncConfig) -> Self {
        Self { config }
    }

    /// Run one toggle against the host's current selection.
    pub fn run<H: Host + ?Sized>(&self, host: &mut H, mode: ToggleMode) -> ToggleReport {
        if !host.is_available() {
            tracing::debug!("Host unavailable, toggle disabled");
            return ToggleReport::disabled();
        }

        let inspected = Grouped::from_host(host).inspect(host);
        let decision = inspected.decide(mode);
        let actions = inspected.plan(decision, self.config.granular);

        let skipped: Vec<(EntityName, LinkError)> = inspected
            .foreign()
            .map(|name| {
                tracing::warn!("{} holds a foreign callback, skipping", name);
                (name.clone(), LinkError::Foreign)
            })
            .collect();

        self.apply(host, &actions);

        let cleared: Vec<EntityName> = actions
            .iter()
            .filter_map(|a| match a {
                ToggleAction::ClearLink(name) => Some(name.clone()),
                _ => None,
            })
            .collect();
        let linked = match decision {
            ToggleDecision::Add | ToggleDecision::Relink => inspected.linkable_groups(),
            ToggleDecision::Remove | ToggleDecision::Disabled => Vec::new(),
        };

        tracing::info!(
            "Toggle {:?}: {} groups linked, {} viewers cleared, {} skipped",
            decision,
            linked.len(),
            cleared.len(),
            skipped.len()
        );

        ToggleReport {
            decision,
            linked,
            cleared,
            skipped,
        }
    }

    /// Apply planned actions in order.
    pub fn apply<H: Host + ?Sized>(&self, host: &mut H, actions: &[ToggleAction]) {
        for action in actions {
            match action {
                ToggleAction::ClearLink(name) => {
                    host.set_callback(name, "");
                    host.remove_controls(name);
                }
                ToggleAction::WriteLink { entity, peers } => {
                    tracing::debug!("Linking {} to {:?}", entity, peers);
                    host.set_callback(entity, &link::encode(peers));
                }
                ToggleAction::MaterializeFlags(name) => {
                    for key in PropertyKey::ALL {
                        host.add_control(name, &self.config.control_spec(key));
                    }
                }
            }
        }
    }
}
