//! Property sync engine.
//!
//! Runs once per change notification on a linked viewer: resolves the
//! viewer's peers, prunes peers that were deleted, and copies the changed
//! value(s) onto every live peer.
//!
//! # Re-entrancy
//!
//! Writing a peer's property makes the host queue a notification for that
//! peer, whose own pass copies the same value back out. Convergence rests on
//! two things:
//! - writes of an unchanged value queue nothing, so the echo dies out
//! - [`SyncEngine::deliver`] handles each `(viewer, trigger)` pair at most
//!   once per delivery, which bounds the work even for hosts that notify on
//!   every write

use std::collections::{HashSet, VecDeque};
use viewer_sync_types::{EntityName, PropertyKey, Trigger};

use crate::config::SyncConfig;
use crate::host::{ChangeEvent, Host};
use crate::link::{self, LinkError, SyncWarning};

/// What one pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The host is unavailable.
    Disabled,
    /// The trigger is not something the engine syncs.
    Ignored,
    /// The viewer holds no link.
    NotLinked,
    /// The viewer's slot could not be used.
    Skipped(LinkError),
    /// Every peer was gone; the viewer's own link was cleared.
    Unlinked {
        /// Peers that no longer exist.
        pruned: Vec<EntityName>,
    },
    /// Values were copied to peers.
    Propagated(Propagation),
}

/// Details of a propagating pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Live peers written to, in link order.
    pub peers: Vec<EntityName>,
    /// Peers pruned from the stored link.
    pub pruned: Vec<EntityName>,
    /// Enable flag copied to peers, with its value.
    pub flag: Option<(PropertyKey, bool)>,
    /// Properties copied to peers. `Inputs` means the input list.
    pub keys: Vec<PropertyKey>,
}

/// Every pass run by one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Handled events and their outcomes, in handling order.
    pub passes: Vec<(ChangeEvent, PassOutcome)>,
    /// Events dropped because their `(viewer, trigger)` pair was already handled.
    pub suppressed: usize,
    /// Non-fatal findings.
    pub warnings: Vec<SyncWarning>,
}

impl DeliveryReport {
    /// Number of passes that copied anything.
    pub fn propagations(&self) -> usize {
        self.passes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, PassOutcome::Propagated(_)))
            .count()
    }
}

/// Propagates property changes between linked viewers.
#[derive(Debug, Clone, Copy)]
pub struct SyncEngine<'c> {
    config: &'c SyncConfig,
}

impl<'c> SyncEngine<'c> {
    /// Create an engine using `config`.
    pub fn new(config: &'c SyncConfig) -> Self {
        Self { config }
    }

    /// Classify a host key and deliver it for `entity`.
    pub fn deliver_key<H: Host + ?Sized>(
        &self,
        host: &mut H,
        entity: EntityName,
        key: &str,
    ) -> DeliveryReport {
        let trigger = self.config.keys.classify(key);
        self.deliver(host, ChangeEvent::new(entity, trigger))
    }

    /// Handle `event` and every notification it causes, until quiet.
    pub fn deliver<H: Host + ?Sized>(&self, host: &mut H, event: ChangeEvent) -> DeliveryReport {
        let mut queue = VecDeque::from([event]);
        queue.extend(host.take_events());
        self.drain(host, queue)
    }

    /// Handle every notification the host has queued, until quiet.
    pub fn flush<H: Host + ?Sized>(&self, host: &mut H) -> DeliveryReport {
        let queue = VecDeque::from(host.take_events());
        self.drain(host, queue)
    }

    fn drain<H: Host + ?Sized>(
        &self,
        host: &mut H,
        mut queue: VecDeque<ChangeEvent>,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut handled: HashSet<ChangeEvent> = HashSet::new();

        while let Some(event) = queue.pop_front() {
            if handled.contains(&event) {
                report.suppressed += 1;
                continue;
            }
            handled.insert(event.clone());

            let outcome = self.handle(host, &event);
            match &outcome {
                PassOutcome::Propagated(Propagation { pruned, .. })
                | PassOutcome::Unlinked { pruned } => {
                    report
                        .warnings
                        .extend(link::unresolved(&event.entity, pruned));
                }
                _ => {}
            }
            report.passes.push((event, outcome));
            queue.extend(host.take_events());
        }

        if report.suppressed > 0 {
            tracing::debug!("Suppressed {} repeated notifications", report.suppressed);
        }
        report
    }

    /// Run a single pass for one event. Notifications caused by the pass
    /// stay queued in the host.
    pub fn handle<H: Host + ?Sized>(&self, host: &mut H, event: &ChangeEvent) -> PassOutcome {
        if !host.is_available() {
            return PassOutcome::Disabled;
        }
        if !event.trigger.is_relevant() {
            return PassOutcome::Ignored;
        }

        let owner = &event.entity;
        let Some(text) = host.callback(owner) else {
            return PassOutcome::NotLinked;
        };
        let stored = match link::decode(&text) {
            Ok(peers) if peers.is_empty() => return PassOutcome::NotLinked,
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", owner, e);
                return PassOutcome::Skipped(e);
            }
        };

        let resolved = link::resolve(host, owner, &stored);
        if resolved.live.is_empty() {
            tracing::info!("{} has no live peers left, unlinking", owner);
            host.set_callback(owner, "");
            return PassOutcome::Unlinked {
                pruned: resolved.pruned,
            };
        }
        if resolved.needs_rewrite() {
            tracing::debug!("Rewriting link of {} as {:?}", owner, resolved.live);
            host.set_callback(owner, &link::encode(&resolved.live));
        }

        let mut propagation = Propagation {
            peers: resolved.live,
            pruned: resolved.pruned,
            ..Propagation::default()
        };

        // A flag switched on means "sync this property now".
        let (effective, forced) = match &event.trigger {
            Trigger::EnableFlag(key) => {
                let enabled = host
                    .enable_flag(owner, *key)
                    .unwrap_or_else(|| self.config.default_enabled(*key));
                for peer in &propagation.peers {
                    host.set_enable_flag(peer, *key, enabled);
                }
                propagation.flag = Some((*key, enabled));
                if !enabled {
                    return PassOutcome::Propagated(propagation);
                }
                (Trigger::Property(*key), true)
            }
            other => (other.clone(), false),
        };

        let keys: Vec<PropertyKey> = match effective {
            Trigger::Inputs | Trigger::Property(PropertyKey::Inputs) => {
                if forced || self.is_enabled(host, owner, PropertyKey::Inputs) {
                    let inputs = host.inputs(owner);
                    for peer in &propagation.peers {
                        host.set_inputs(peer, &inputs);
                    }
                    propagation.keys.push(PropertyKey::Inputs);
                }
                return PassOutcome::Propagated(propagation);
            }
            Trigger::Batch => PropertyKey::valued()
                .filter(|key| self.is_enabled(host, owner, *key))
                .collect(),
            Trigger::Property(key) => {
                if forced || self.is_enabled(host, owner, key) {
                    vec![key]
                } else {
                    Vec::new()
                }
            }
            Trigger::EnableFlag(_) | Trigger::Other(_) => Vec::new(),
        };

        for key in keys {
            let Some(value) = host.property(owner, key) else {
                continue;
            };
            for peer in &propagation.peers {
                host.set_property(peer, key, value.clone());
            }
            propagation.keys.push(key);
        }

        tracing::debug!(
            "{} synced {:?} to {} peers",
            owner,
            propagation.keys,
            propagation.peers.len()
        );
        PassOutcome::Propagated(propagation)
    }

    /// Whether `key` currently syncs for `entity`.
    ///
    /// Granular mode honours the viewer's own flag, falling back to the
    /// table default when the control is missing.
    pub fn is_enabled<H: Host + ?Sized>(
        &self,
        host: &H,
        entity: &EntityName,
        key: PropertyKey,
    ) -> bool {
        let default = self.config.default_enabled(key);
        if self.config.granular {
            host.enable_flag(entity, key).unwrap_or(default)
        } else {
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Scene, SyncToggle, ToggleMode};
    use viewer_sync_types::PropertyValue;

    fn name(n: &str) -> EntityName {
        EntityName::new(n).unwrap()
    }

    fn linked_scene(config: &SyncConfig, names: &[&str]) -> Scene {
        let mut scene = Scene::new();
        for n in names {
            scene.add_viewer(n).unwrap();
        }
        SyncToggle::new(config).run(&mut scene, ToggleMode::Auto);
        scene
    }

    #[test]
    fn irrelevant_trigger_ignored() {
        let config = SyncConfig::default();
        let mut scene = linked_scene(&config, &["V1", "V2"]);
        let engine = SyncEngine::new(&config);

        let outcome = engine.handle(
            &mut scene,
            &ChangeEvent::new(name("V1"), Trigger::Other("xpos".into())),
        );

        assert_eq!(outcome, PassOutcome::Ignored);
    }

    #[test]
    fn unlinked_viewer_does_nothing() {
        let config = SyncConfig::default();
        let mut scene = Scene::new();
        scene.add_viewer("V1").unwrap();
        let engine = SyncEngine::new(&config);

        let outcome = engine.handle(
            &mut scene,
            &ChangeEvent::new(name("V1"), Trigger::Property(PropertyKey::Gain)),
        );

        assert_eq!(outcome, PassOutcome::NotLinked);
    }

    #[test]
    fn foreign_slot_skipped() {
        let config = SyncConfig::default();
        let mut scene = Scene::new();
        scene.add_viewer("V1").unwrap();
        scene.set_callback(&name("V1"), "print('mine')");
        let engine = SyncEngine::new(&config);

        let outcome = engine.handle(
            &mut scene,
            &ChangeEvent::new(name("V1"), Trigger::Property(PropertyKey::Gain)),
        );

        assert_eq!(outcome, PassOutcome::Skipped(LinkError::Foreign));
        assert_eq!(scene.callback(&name("V1")).as_deref(), Some("print('mine')"));
    }

    #[test]
    fn disabled_property_not_copied() {
        let config = SyncConfig::default();
        let mut scene = linked_scene(&config, &["V1", "V2"]);
        let engine = SyncEngine::new(&config);
        scene.set_property(&name("V1"), PropertyKey::ZoomLock, PropertyValue::Bool(true));

        let report = engine.flush(&mut scene);

        assert_eq!(
            scene.property(&name("V2"), PropertyKey::ZoomLock),
            Some(PropertyValue::Bool(false))
        );
        assert!(matches!(&report.passes[0].1, PassOutcome::Propagated(p) if p.keys.is_empty()));
    }

    #[test]
    fn batch_copies_enabled_properties_in_order() {
        let config = SyncConfig::default();
        let mut scene = linked_scene(&config, &["V1", "V2"]);
        let engine = SyncEngine::new(&config);
        let v1 = name("V1");

        let outcome = engine.handle(&mut scene, &ChangeEvent::new(v1, Trigger::Batch));

        let PassOutcome::Propagated(propagation) = outcome else {
            panic!("expected propagation");
        };
        assert_eq!(
            propagation.keys,
            vec![
                PropertyKey::Gain,
                PropertyKey::Gamma,
                PropertyKey::FrameRange,
                PropertyKey::FrameRangeLock,
            ]
        );
    }

    #[test]
    fn inputs_copied_verbatim() {
        let config = SyncConfig::default();
        let mut scene = linked_scene(&config, &["V1", "V2"]);
        let engine = SyncEngine::new(&config);
        scene.connect("V1", 0, Some("Read1")).unwrap();
        scene.connect("V1", 1, Some("Read1")).unwrap();
        scene.connect("V1", 3, Some("Grade1")).unwrap();

        engine.flush(&mut scene);

        assert_eq!(
            scene.inputs(&name("V2")),
            vec![Some(name("Read1")), Some(name("Read1")), None, Some(name("Grade1"))]
        );
    }

    #[test]
    fn inputs_pass_carries_nothing_else() {
        let config = SyncConfig::default();
        let mut scene = linked_scene(&config, &["V1", "V2"]);
        let engine = SyncEngine::new(&config);
        scene.set_property(&name("V1"), PropertyKey::Gain, PropertyValue::Number(0.25));
        scene.connect("V1", 0, Some("Read1")).unwrap();
        scene.take_events();

        let outcome = engine.handle(&mut scene, &ChangeEvent::new(name("V1"), Trigger::Inputs));

        let PassOutcome::Propagated(propagation) = outcome else {
            panic!("expected propagation");
        };
        assert_eq!(propagation.keys, vec![PropertyKey::Inputs]);
        assert_eq!(scene.inputs(&name("V2")), vec![Some(name("Read1"))]);
        assert_eq!(
            scene.property(&name("V2"), PropertyKey::Gain),
            Some(PropertyValue::Number(1.0))
        );
    }

    #[test]
    fn owner_never_writes_to_itself() {
        let config = SyncConfig::default();
        let mut scene = Scene::new();
        scene.add_viewer("V1").unwrap();
        scene.add_viewer("V2").unwrap();
        scene.set_callback(&name("V1"), &link::encode(&[name("V1"), name("V2")]));
        let engine = SyncEngine::new(&config);

        let outcome = engine.handle(
            &mut scene,
            &ChangeEvent::new(name("V1"), Trigger::Property(PropertyKey::Gain)),
        );

        assert!(matches!(outcome, PassOutcome::Propagated(p) if p.peers == vec![name("V2")]));
        assert_eq!(
            link::decode(&scene.callback(&name("V1")).unwrap()).unwrap(),
            vec![name("V2")]
        );
    }

    #[test]
    fn unavailable_host_disables_engine() {
        let config = SyncConfig::default();
        let mut scene = linked_scene(&config, &["V1", "V2"]);
        scene.set_available(false);
        let engine = SyncEngine::new(&config);

        let outcome = engine.handle(&mut scene, &ChangeEvent::new(name("V1"), Trigger::Batch));

        assert_eq!(outcome, PassOutcome::Disabled);
    }

    #[test]
    fn deliver_key_classifies() {
        let config = SyncConfig::default();
        let mut scene = linked_scene(&config, &["V1", "V2"]);
        scene.set_property(&name("V1"), PropertyKey::Gamma, PropertyValue::Number(2.2));
        scene.take_events();
        let engine = SyncEngine::new(&config);

        engine.deliver_key(&mut scene, name("V1"), "gamma");

        assert_eq!(
            scene.property(&name("V2"), PropertyKey::Gamma),
            Some(PropertyValue::Number(2.2))
        );
    }
}
