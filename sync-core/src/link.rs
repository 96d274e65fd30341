//! Link state codec for viewer-sync.
//!
//! Each linked viewer remembers its peers in the host's callback slot, the
//! only text the host persists for it. The slot may also hold somebody
//! else's callback, which must never be overwritten.
//!
//! Format: `viewerSync.link(["Viewer2","Comp.Viewer3"])`
//!
//! - The `viewerSync.link(` prefix marks the slot as ours
//! - The body is a JSON array of fully-qualified names
//!
//! Inside the crate peer lists are always `Vec<EntityName>`; text exists
//! only at this boundary.

use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use viewer_sync_types::EntityName;

use crate::host::Host;

/// Prefix identifying a callback slot owned by viewer-sync.
pub const LINK_MARKER: &str = "viewerSync.link(";

const LINK_CLOSE: char = ')';

/// Errors reading a callback slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The slot carries our marker but the peer list cannot be read.
    #[error("malformed link: {0}")]
    Parse(String),

    /// The slot holds a callback that is not ours.
    #[error("callback slot holds foreign content")]
    Foreign,
}

/// Classification of a callback slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Empty slot.
    Unset,
    /// A readable peer list.
    Linked(Vec<EntityName>),
    /// Our marker, unreadable body.
    Malformed(String),
    /// Not ours.
    Foreign,
}

impl LinkState {
    /// Check if the slot carries the viewer-sync marker or foreign content.
    pub fn is_marked(&self) -> bool {
        !matches!(self, LinkState::Unset)
    }
}

/// Encode a peer list for the callback slot.
pub fn encode(peers: &[EntityName]) -> String {
    let names = peers
        .iter()
        .map(|p| serde_json::Value::String(p.to_string()))
        .collect();
    format!("{}{}{}", LINK_MARKER, serde_json::Value::Array(names), LINK_CLOSE)
}

/// Decode the callback slot into a peer list.
///
/// Empty (or whitespace-only) text is an empty list.
pub fn decode(text: &str) -> Result<Vec<EntityName>, LinkError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let body = text.strip_prefix(LINK_MARKER).ok_or(LinkError::Foreign)?;
    let body = body
        .strip_suffix(LINK_CLOSE)
        .ok_or_else(|| LinkError::Parse("missing closing parenthesis".into()))?;

    serde_json::from_str(body).map_err(|e| LinkError::Parse(e.to_string()))
}

/// Classify the callback slot without failing.
pub fn inspect(text: &str) -> LinkState {
    match decode(text) {
        Ok(peers) if peers.is_empty() => LinkState::Unset,
        Ok(peers) => LinkState::Linked(peers),
        Err(LinkError::Parse(reason)) => LinkState::Malformed(reason),
        Err(LinkError::Foreign) => LinkState::Foreign,
    }
}

/// Non-fatal conditions found while resolving peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// A stored peer name no longer resolves to a viewer.
    UnresolvedPeer {
        /// Viewer holding the link.
        owner: EntityName,
        /// The missing peer.
        peer: EntityName,
    },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::UnresolvedPeer { owner, peer } => {
                write!(f, "{} links to {}, which no longer exists", owner, peer)
            }
        }
    }
}

/// Result of resolving a stored peer list against the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    /// Peers that still exist, in stored order, without duplicates.
    pub live: Vec<EntityName>,
    /// Stored peers that no longer exist.
    pub pruned: Vec<EntityName>,
    /// The stored list contained the owner itself or a repeated name.
    pub dropped_invalid: bool,
}

impl Resolved {
    /// Check if the stored link differs from `live` and should be rewritten.
    pub fn needs_rewrite(&self) -> bool {
        !self.pruned.is_empty() || self.dropped_invalid
    }

    /// Warnings for every pruned peer.
    pub fn warnings(&self, owner: &EntityName) -> Vec<SyncWarning> {
        unresolved(owner, &self.pruned)
    }
}

/// One [`SyncWarning::UnresolvedPeer`] per missing peer of `owner`.
pub fn unresolved(owner: &EntityName, missing: &[EntityName]) -> Vec<SyncWarning> {
    missing
        .iter()
        .map(|peer| SyncWarning::UnresolvedPeer {
            owner: owner.clone(),
            peer: peer.clone(),
        })
        .collect()
}

/// Look up each stored peer; unresolved names are dropped, not errors.
///
/// The owner is excluded by identity, never by position.
pub fn resolve<H: Host + ?Sized>(host: &H, owner: &EntityName, peers: &[EntityName]) -> Resolved {
    let mut resolved = Resolved::default();
    let mut seen = HashSet::new();

    for peer in peers {
        if peer == owner || !seen.insert(peer) {
            resolved.dropped_invalid = true;
            continue;
        }
        if host.exists(peer) {
            resolved.live.push(peer.clone());
        } else {
            tracing::debug!("{} links to missing viewer {}, pruning", owner, peer);
            resolved.pruned.push(peer.clone());
        }
    }

    resolved
}
