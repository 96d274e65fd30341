//! In-memory host.
//!
//! [`Scene`] holds viewers in discovery order together with the current
//! selection, and queues a [`ChangeEvent`] for every write that changes a
//! value. It backs the tests and the command-line tool, which persists it
//! as JSON.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use viewer_sync_types::{EntityName, InputRef, PropertyKey, PropertyValue, SyncError, Trigger};

use crate::host::{ChangeEvent, ControlSpec, Host};

/// Errors from editing a scene directly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// A name or value was rejected.
    #[error(transparent)]
    Invalid(#[from] SyncError),

    /// A viewer with this name already exists.
    #[error("viewer already exists: {0}")]
    Duplicate(EntityName),

    /// No viewer with this name exists.
    #[error("no such viewer: {0}")]
    NotFound(String),

    /// An input slot beyond the last one a viewer offers.
    #[error("input index {0} out of range (viewers have {max} inputs)", max = MAX_INPUTS)]
    InputIndex(usize),
}

/// Input slots per viewer.
pub const MAX_INPUTS: usize = 10;

/// One viewer and all the state the engine touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    /// Fully-qualified name.
    pub name: EntityName,
    /// Property values.
    #[serde(default)]
    pub properties: BTreeMap<PropertyKey, PropertyValue>,
    /// Ordered input slots.
    #[serde(default)]
    pub inputs: Vec<InputRef>,
    /// The persisted callback slot.
    #[serde(default)]
    pub callback: String,
    /// Enable-flag controls, present only in granular mode.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<PropertyKey, bool>,
}

impl Viewer {
    /// Create a viewer with stock property values.
    pub fn new(name: EntityName) -> Self {
        let properties = PropertyKey::valued()
            .map(|key| (key, stock_value(key)))
            .collect();
        Self {
            name,
            properties,
            inputs: Vec::new(),
            callback: String::new(),
            flags: BTreeMap::new(),
        }
    }
}

fn stock_value(key: PropertyKey) -> PropertyValue {
    match key {
        PropertyKey::Gain | PropertyKey::Gamma => PropertyValue::Number(1.0),
        PropertyKey::Channels => PropertyValue::Number(0.0),
        PropertyKey::FrameRange => PropertyValue::List(vec![1.0, 100.0]),
        PropertyKey::Roi => PropertyValue::List(vec![0.0, 0.0, 0.0, 0.0]),
        PropertyKey::Inputs
        | PropertyKey::FrameRangeLock
        | PropertyKey::ShowRoi
        | PropertyKey::IgnorePixelAspect
        | PropertyKey::ZoomLock => PropertyValue::Bool(false),
    }
}

fn default_true() -> bool {
    true
}

/// An in-memory collection of viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Viewers in discovery order.
    #[serde(default)]
    viewers: Vec<Viewer>,
    /// Selected viewers in selection order.
    #[serde(default)]
    selection: Vec<EntityName>,
    /// Skip notifications for writes that do not change the value (default: true).
    #[serde(default = "default_true")]
    suppress_noop_events: bool,
    /// Pending notifications. Never persisted.
    #[serde(skip)]
    events: VecDeque<ChangeEvent>,
    /// When false the scene reports itself unavailable.
    #[serde(skip, default = "default_true")]
    available: bool,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self {
            viewers: Vec::new(),
            selection: Vec::new(),
            suppress_noop_events: true,
            events: VecDeque::new(),
            available: true,
        }
    }

    /// Add a viewer with stock values at the end of discovery order.
    pub fn add_viewer(&mut self, name: &str) -> Result<&mut Viewer, SceneError> {
        let name = EntityName::new(name)?;
        if self.index_of(&name).is_some() {
            return Err(SceneError::Duplicate(name));
        }
        self.viewers.push(Viewer::new(name));
        let last = self.viewers.len() - 1;
        Ok(&mut self.viewers[last])
    }

    /// Delete a viewer. Inputs that pointed at it are disconnected.
    pub fn delete(&mut self, name: &str) -> Result<Viewer, SceneError> {
        let index = self
            .viewers
            .iter()
            .position(|v| v.name.as_str() == name)
            .ok_or_else(|| SceneError::NotFound(name.to_string()))?;
        let removed = self.viewers.remove(index);

        self.selection.retain(|s| *s != removed.name);
        for viewer in &mut self.viewers {
            for slot in &mut viewer.inputs {
                if slot.as_ref() == Some(&removed.name) {
                    *slot = None;
                }
            }
        }
        Ok(removed)
    }

    /// Replace the selection. Every name must exist.
    pub fn select(&mut self, names: &[&str]) -> Result<(), SceneError> {
        let mut selection = Vec::with_capacity(names.len());
        for name in names {
            let name = EntityName::new(*name)?;
            if self.index_of(&name).is_none() {
                return Err(SceneError::NotFound(name.to_string()));
            }
            selection.push(name);
        }
        self.selection = selection;
        Ok(())
    }

    /// Look up a viewer by name.
    pub fn viewer(&self, name: &str) -> Option<&Viewer> {
        self.viewers.iter().find(|v| v.name.as_str() == name)
    }

    /// Check if a viewer is part of the selection.
    pub fn is_selected(&self, name: &EntityName) -> bool {
        self.selection.contains(name)
    }

    /// All viewers in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Viewer> {
        self.viewers.iter()
    }

    /// Choose whether no-op writes still notify.
    pub fn set_suppress_noop_events(&mut self, suppress: bool) {
        self.suppress_noop_events = suppress;
    }

    /// Mark the scene available or unavailable to the engine.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Number of queued notifications.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Parse and write a property from user text, queueing a notification.
    pub fn set_property_text(
        &mut self,
        name: &str,
        key: PropertyKey,
        text: &str,
    ) -> Result<(), SceneError> {
        let entity = self.require(name)?;
        let value = PropertyValue::parse(key, text)?;
        self.set_property(&entity, key, value);
        Ok(())
    }

    /// Connect (or with `None` disconnect) one input slot, growing the list
    /// as needed and queueing a notification.
    pub fn connect(
        &mut self,
        name: &str,
        index: usize,
        producer: Option<&str>,
    ) -> Result<(), SceneError> {
        if index >= MAX_INPUTS {
            return Err(SceneError::InputIndex(index));
        }
        let entity = self.require(name)?;
        let producer = producer.map(EntityName::new).transpose()?;

        let mut inputs = self.inputs(&entity);
        if inputs.len() <= index {
            inputs.resize(index + 1, None);
        }
        inputs[index] = producer;
        while matches!(inputs.last(), Some(None)) {
            inputs.pop();
        }
        self.set_inputs(&entity, &inputs);
        Ok(())
    }

    fn require(&self, name: &str) -> Result<EntityName, SceneError> {
        self.viewer(name)
            .map(|v| v.name.clone())
            .ok_or_else(|| SceneError::NotFound(name.to_string()))
    }

    fn index_of(&self, name: &EntityName) -> Option<usize> {
        self.viewers.iter().position(|v| v.name == *name)
    }

    fn viewer_mut(&mut self, name: &EntityName) -> Option<&mut Viewer> {
        self.viewers.iter_mut().find(|v| v.name == *name)
    }

    fn notify(&mut self, name: &EntityName, trigger: Trigger, changed: bool) {
        if changed || !self.suppress_noop_events {
            self.events.push_back(ChangeEvent::new(name.clone(), trigger));
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for Scene {
    fn is_available(&self) -> bool {
        self.available
    }

    fn viewers(&self) -> Vec<EntityName> {
        self.viewers.iter().map(|v| v.name.clone()).collect()
    }

    fn selected(&self) -> Vec<EntityName> {
        self.selection.clone()
    }

    fn exists(&self, name: &EntityName) -> bool {
        self.index_of(name).is_some()
    }

    fn property(&self, name: &EntityName, key: PropertyKey) -> Option<PropertyValue> {
        self.viewer(name.as_str())
            .and_then(|v| v.properties.get(&key).cloned())
    }

    fn set_property(&mut self, name: &EntityName, key: PropertyKey, value: PropertyValue) {
        if let Err(e) = value.check_kind(key) {
            tracing::warn!("Ignoring write to {}: {}", name, e);
            return;
        }
        let Some(viewer) = self.viewer_mut(name) else {
            return;
        };
        let changed = viewer.properties.get(&key) != Some(&value);
        viewer.properties.insert(key, value);
        self.notify(name, Trigger::Property(key), changed);
    }

    fn callback(&self, name: &EntityName) -> Option<String> {
        self.viewer(name.as_str()).map(|v| v.callback.clone())
    }

    fn set_callback(&mut self, name: &EntityName, text: &str) {
        if let Some(viewer) = self.viewer_mut(name) {
            viewer.callback = text.to_string();
        }
    }

    fn enable_flag(&self, name: &EntityName, key: PropertyKey) -> Option<bool> {
        self.viewer(name.as_str())
            .and_then(|v| v.flags.get(&key).copied())
    }

    fn add_control(&mut self, name: &EntityName, spec: &ControlSpec) {
        // No UI here: only the key and initial value are kept.
        if let Some(viewer) = self.viewer_mut(name) {
            viewer.flags.insert(spec.key, spec.default_enabled);
        }
    }

    fn set_enable_flag(&mut self, name: &EntityName, key: PropertyKey, enabled: bool) {
        let Some(viewer) = self.viewer_mut(name) else {
            return;
        };
        let changed = viewer.flags.insert(key, enabled) != Some(enabled);
        self.notify(name, Trigger::EnableFlag(key), changed);
    }

    fn remove_controls(&mut self, name: &EntityName) {
        if let Some(viewer) = self.viewer_mut(name) {
            viewer.flags.clear();
        }
    }

    fn inputs(&self, name: &EntityName) -> Vec<InputRef> {
        self.viewer(name.as_str())
            .map(|v| v.inputs.clone())
            .unwrap_or_default()
    }

    fn set_inputs(&mut self, name: &EntityName, inputs: &[InputRef]) {
        let Some(viewer) = self.viewer_mut(name) else {
            return;
        };
        let changed = viewer.inputs != inputs;
        viewer.inputs = inputs.to_vec();
        self.notify(name, Trigger::Inputs, changed);
    }

    fn take_events(&mut self) -> Vec<ChangeEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> EntityName {
        EntityName::new(n).unwrap()
    }

    #[test]
    fn new_viewer_has_stock_values() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        assert_eq!(
            scene.property(&name("Viewer1"), PropertyKey::Gain),
            Some(PropertyValue::Number(1.0))
        );
        assert_eq!(scene.property(&name("Viewer1"), PropertyKey::Inputs), None);
    }

    #[test]
    fn duplicate_viewer_rejected() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        assert!(matches!(scene.add_viewer("Viewer1"), Err(SceneError::Duplicate(_))));
    }

    #[test]
    fn changed_write_notifies_once() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        let v1 = name("Viewer1");

        scene.set_property(&v1, PropertyKey::Gain, PropertyValue::Number(2.0));
        scene.set_property(&v1, PropertyKey::Gain, PropertyValue::Number(2.0));

        assert_eq!(
            scene.take_events(),
            vec![ChangeEvent::new(v1, Trigger::Property(PropertyKey::Gain))]
        );
        assert_eq!(scene.pending_events(), 0);
    }

    #[test]
    fn noop_writes_notify_when_not_suppressed() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        scene.set_suppress_noop_events(false);
        let v1 = name("Viewer1");

        scene.set_property(&v1, PropertyKey::Gain, PropertyValue::Number(1.0));

        assert_eq!(scene.take_events().len(), 1);
    }

    #[test]
    fn wrong_kind_ignored() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        let v1 = name("Viewer1");

        scene.set_property(&v1, PropertyKey::Gain, PropertyValue::Bool(true));

        assert_eq!(scene.property(&v1, PropertyKey::Gain), Some(PropertyValue::Number(1.0)));
        assert!(scene.take_events().is_empty());
    }

    #[test]
    fn callback_and_controls_do_not_notify() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        let v1 = name("Viewer1");
        let spec = crate::SyncConfig::default().control_spec(PropertyKey::Gain);

        scene.set_callback(&v1, "text");
        scene.add_control(&v1, &spec);
        scene.remove_controls(&v1);

        assert!(scene.take_events().is_empty());
        assert_eq!(scene.callback(&v1).as_deref(), Some("text"));
        assert_eq!(scene.enable_flag(&v1, PropertyKey::Gain), None);
    }

    #[test]
    fn connect_grows_and_trims_inputs() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        let v1 = name("Viewer1");

        scene.connect("Viewer1", 2, Some("Read1")).unwrap();
        assert_eq!(scene.inputs(&v1), vec![None, None, Some(name("Read1"))]);

        scene.connect("Viewer1", 2, None).unwrap();
        assert!(scene.inputs(&v1).is_empty());
        assert_eq!(scene.take_events().len(), 2);
    }

    #[test]
    fn connect_rejects_out_of_range_slot() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();

        scene.connect("Viewer1", MAX_INPUTS - 1, Some("Read1")).unwrap();
        assert_eq!(scene.inputs(&name("Viewer1")).len(), MAX_INPUTS);

        assert_eq!(
            scene.connect("Viewer1", MAX_INPUTS, Some("Read1")),
            Err(SceneError::InputIndex(MAX_INPUTS))
        );
        assert_eq!(
            scene.connect("Viewer1", usize::MAX, Some("Read1")),
            Err(SceneError::InputIndex(usize::MAX))
        );
        assert_eq!(scene.inputs(&name("Viewer1")).len(), MAX_INPUTS);
    }

    #[test]
    fn delete_disconnects_and_deselects() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        scene.add_viewer("Viewer2").unwrap();
        scene.connect("Viewer1", 0, Some("Viewer2")).unwrap();
        scene.select(&["Viewer1", "Viewer2"]).unwrap();

        scene.delete("Viewer2").unwrap();

        assert!(!scene.exists(&name("Viewer2")));
        assert_eq!(scene.selected(), vec![name("Viewer1")]);
        assert_eq!(scene.inputs(&name("Viewer1")), vec![None]);
        assert!(matches!(scene.delete("Viewer2"), Err(SceneError::NotFound(_))));
    }

    #[test]
    fn select_requires_existing_viewers() {
        let mut scene = Scene::new();
        scene.add_viewer("Viewer1").unwrap();
        assert!(scene.select(&["Viewer9"]).is_err());
        assert!(scene.select(&[]).is_ok());
    }

    #[test]
    fn json_roundtrip_keeps_state_but_not_events() {
        let mut scene = Scene::new();
        scene.add_viewer("Comp.Viewer1").unwrap();
        scene.set_property_text("Comp.Viewer1", PropertyKey::FrameRange, "1001 1100").unwrap();

        let json = serde_json::to_string(&scene).unwrap();
        let restored: Scene = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.viewer("Comp.Viewer1"), scene.viewer("Comp.Viewer1"));
        assert_eq!(restored.pending_events(), 0);
        assert!(restored.is_available());
    }
}
