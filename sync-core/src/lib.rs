//! # sync-core
//!
//! Pure logic for viewer-sync (no I/O, instant tests).
//!
//! This crate keeps groups of viewers in lock-step: when a tracked property
//! changes on one viewer, every peer in its sync group is updated to match.
//!
//! ## Design Philosophy
//!
//! Everything here runs synchronously against the [`Host`] trait, which
//! stands in for the application that owns the viewers. This enables:
//! - Instant unit tests against the in-memory [`Scene`] host
//! - Deterministic behavior (same scene + same event → same result)
//! - Easy reasoning about re-entrant propagation
//!
//! The moving parts:
//! - [`group`] partitions a selection into sync groups
//! - [`link`] reads and writes the peer list kept in each viewer's callback slot
//! - [`toggle`] links or unlinks a selection
//! - [`engine`] propagates property changes between linked peers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod group;
pub mod host;
pub mod link;
pub mod scene;
pub mod toggle;

pub use config::{ConfigError, PropertySpec, PropertyTable, SyncConfig, TriggerKeys};
pub use engine::{DeliveryReport, PassOutcome, Propagation, SyncEngine};
pub use group::{build_groups, GroupKey, SyncGroup};
pub use host::{ChangeEvent, ControlSpec, Host};
pub use link::{LinkError, LinkState, Resolved, SyncWarning};
pub use scene::{Scene, SceneError, Viewer, MAX_INPUTS};
pub use toggle::{SyncToggle, ToggleAction, ToggleDecision, ToggleMode, ToggleReport};
