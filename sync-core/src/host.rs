//! Host abstraction for viewer-sync.
//!
//! The host is the application that owns the viewers. Everything the engine
//! and the toggle controller read or write goes through [`Host`], so the
//! same logic runs against a real application binding or the in-memory
//! [`Scene`](crate::Scene).
//!
//! # Change notifications
//!
//! Writes that change a value queue a [`ChangeEvent`]. The engine drains
//! the queue with [`Host::take_events`] after every pass, which turns
//! re-entrant "property changed" callbacks into plain message passing.
//! Hosts should not queue events for writes that leave the value unchanged.

use viewer_sync_types::{EntityName, InputRef, PropertyKey, PropertyValue, Trigger};

/// A change notification for one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    /// Viewer whose state changed.
    pub entity: EntityName,
    /// What changed.
    pub trigger: Trigger,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(entity: EntityName, trigger: Trigger) -> Self {
        Self { entity, trigger }
    }
}

/// An enable-flag control to create on a viewer in granular mode.
///
/// `name`, `title` and `tooltip` are host-facing metadata for hosts that
/// build a visible control. The engine reads flags back by `key` only, so
/// hosts without a UI may ignore them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSpec {
    /// Property the flag governs.
    pub key: PropertyKey,
    /// Host key of the flag (prefix + property key). Host-facing.
    pub name: String,
    /// Short label. Host-facing.
    pub title: String,
    /// Help text. Host-facing.
    pub tooltip: String,
    /// Initial value.
    pub default_enabled: bool,
}

/// The application that owns the viewers.
///
/// Reads of a missing viewer return empty values and writes to a missing
/// viewer are ignored; a viewer can disappear between any two calls.
pub trait Host {
    /// Whether the host is present at all. An unavailable host disables the
    /// engine without raising errors.
    fn is_available(&self) -> bool {
        true
    }

    /// All viewers in scope, in discovery order.
    fn viewers(&self) -> Vec<EntityName>;

    /// Currently selected viewers, in selection order.
    fn selected(&self) -> Vec<EntityName>;

    /// Check if a viewer with this name exists.
    fn exists(&self, name: &EntityName) -> bool;

    /// Current value of a property.
    fn property(&self, name: &EntityName, key: PropertyKey) -> Option<PropertyValue>;

    /// Write a property.
    fn set_property(&mut self, name: &EntityName, key: PropertyKey, value: PropertyValue);

    /// Contents of the callback slot, or `None` if the viewer is gone.
    fn callback(&self, name: &EntityName) -> Option<String>;

    /// Replace the callback slot. Does not notify.
    fn set_callback(&mut self, name: &EntityName, text: &str);

    /// Current value of an enable flag, or `None` if the control is absent.
    fn enable_flag(&self, name: &EntityName, key: PropertyKey) -> Option<bool>;

    /// Create (or reset) an enable-flag control. Does not notify.
    fn add_control(&mut self, name: &EntityName, spec: &ControlSpec);

    /// Write an existing or new enable flag.
    fn set_enable_flag(&mut self, name: &EntityName, key: PropertyKey, enabled: bool);

    /// Remove every enable-flag control. Does not notify.
    fn remove_controls(&mut self, name: &EntityName);

    /// Ordered input list.
    fn inputs(&self, name: &EntityName) -> Vec<InputRef>;

    /// Replace the ordered input list.
    fn set_inputs(&mut self, name: &EntityName, inputs: &[InputRef]);

    /// Take all change notifications queued since the last call.
    fn take_events(&mut self) -> Vec<ChangeEvent>;
}
