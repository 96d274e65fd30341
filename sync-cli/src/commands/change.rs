//! Change a viewer and propagate the change to its linked peers.

use anyhow::{Context, Result};
use std::path::Path;
use viewer_sync_core::{DeliveryReport, Host, PassOutcome, Scene, SyncConfig, SyncEngine};
use viewer_sync_types::{EntityName, PropertyKey};

use crate::config::{load_scene, save_scene};

/// Set a property from text.
pub fn set(
    path: &Path,
    config: &SyncConfig,
    name: &str,
    key: PropertyKey,
    value: &str,
) -> Result<()> {
    let mut scene = load_scene(path)?;
    scene
        .set_property_text(name, key, value)
        .with_context(|| format!("Cannot set {} on '{}'", key, name))?;
    deliver(path, config, scene)
}

/// Connect or disconnect one input slot.
pub fn connect(
    path: &Path,
    config: &SyncConfig,
    name: &str,
    index: usize,
    producer: Option<&str>,
) -> Result<()> {
    let mut scene = load_scene(path)?;
    scene
        .connect(name, index, producer)
        .with_context(|| format!("Cannot connect input {} of '{}'", index, name))?;
    deliver(path, config, scene)
}

/// Switch an enable flag.
pub fn flag(
    path: &Path,
    config: &SyncConfig,
    name: &str,
    key: PropertyKey,
    enabled: bool,
) -> Result<()> {
    let mut scene = load_scene(path)?;
    let entity = existing(&scene, name)?;
    if !config.granular {
        tracing::warn!("Enable flags only gate syncing when granular mode is on");
    }
    scene.set_enable_flag(&entity, key, enabled);
    deliver(path, config, scene)
}

/// Push every enabled property of a viewer to its peers.
pub fn refresh(path: &Path, config: &SyncConfig, name: &str) -> Result<()> {
    let mut scene = load_scene(path)?;
    let entity = existing(&scene, name)?;
    let report = SyncEngine::new(config).deliver_key(&mut scene, entity, &config.keys.batch);
    save_scene(&scene, path)?;
    print_delivery(&report);
    Ok(())
}

fn existing(scene: &Scene, name: &str) -> Result<EntityName> {
    let entity = EntityName::new(name)?;
    if !scene.exists(&entity) {
        anyhow::bail!("No viewer named '{}'", name);
    }
    Ok(entity)
}

/// Drain the notifications queued by an edit, then save.
fn deliver(path: &Path, config: &SyncConfig, mut scene: Scene) -> Result<()> {
    let report = SyncEngine::new(config).flush(&mut scene);
    save_scene(&scene, path)?;
    print_delivery(&report);
    Ok(())
}

fn print_delivery(report: &DeliveryReport) {
    let mut synced = 0;
    for (event, outcome) in &report.passes {
        match outcome {
            PassOutcome::Propagated(p) if !p.keys.is_empty() || p.flag.is_some() => {
                let mut what: Vec<String> = p.keys.iter().map(|k| k.to_string()).collect();
                if let Some((key, enabled)) = p.flag {
                    what.insert(0, format!("{} flag ({})", key, enabled));
                }
                let peers: Vec<&str> = p.peers.iter().map(|n| n.as_str()).collect();
                println!(
                    "{}: synced {} to {}",
                    event.entity,
                    what.join(", "),
                    peers.join(", ")
                );
                synced += 1;
            }
            PassOutcome::Unlinked { .. } => {
                println!("{}: every peer is gone, unlinked", event.entity);
            }
            PassOutcome::Skipped(reason) => {
                println!("{}: skipped ({})", event.entity, reason);
            }
            _ => {}
        }
    }
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    if synced == 0 && report.warnings.is_empty() {
        println!("Nothing to sync");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{edit, init, toggle};
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};
    use viewer_sync_core::ToggleMode;
    use viewer_sync_types::PropertyValue;

    fn linked(config: &SyncConfig, viewers: &[&str]) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.json");
        init::run(&path, false).unwrap();
        for v in viewers {
            edit::add(&path, v, true).unwrap();
        }
        toggle::run(&path, config, ToggleMode::Auto).unwrap();
        (dir, path)
    }

    fn name(n: &str) -> EntityName {
        EntityName::new(n).unwrap()
    }

    #[test]
    fn set_propagates_and_persists() {
        let config = SyncConfig::default();
        let (_dir, path) = linked(&config, &["V1", "V2", "V3"]);

        set(&path, &config, "V1", PropertyKey::Gain, "0.5").unwrap();

        let scene = load_scene(&path).unwrap();
        for v in ["V2", "V3"] {
            assert_eq!(
                scene.property(&name(v), PropertyKey::Gain),
                Some(PropertyValue::Number(0.5))
            );
        }
    }

    #[test]
    fn set_rejects_bad_value() {
        let config = SyncConfig::default();
        let (_dir, path) = linked(&config, &["V1", "V2"]);
        assert!(set(&path, &config, "V1", PropertyKey::Gain, "bright").is_err());
        assert!(set(&path, &config, "V9", PropertyKey::Gain, "1").is_err());
    }

    #[test]
    fn connect_syncs_inputs() {
        let config = SyncConfig::default();
        let (_dir, path) = linked(&config, &["V1", "V2"]);

        connect(&path, &config, "V1", 1, Some("Read1")).unwrap();

        let scene = load_scene(&path).unwrap();
        assert_eq!(scene.inputs(&name("V2")), vec![None, Some(name("Read1"))]);

        connect(&path, &config, "V1", 1, None).unwrap();
        let scene = load_scene(&path).unwrap();
        assert!(scene.inputs(&name("V2")).is_empty());
    }

    #[test]
    fn flag_copies_to_peers() {
        let config = SyncConfig {
            granular: true,
            ..SyncConfig::default()
        };
        let (_dir, path) = linked(&config, &["V1", "V2"]);

        flag(&path, &config, "V1", PropertyKey::Gamma, false).unwrap();

        let scene = load_scene(&path).unwrap();
        assert_eq!(scene.enable_flag(&name("V2"), PropertyKey::Gamma), Some(false));
    }

    #[test]
    fn refresh_pushes_enabled_properties() {
        let config = SyncConfig::default();
        let (_dir, path) = linked(&config, &["V1", "V2"]);
        let mut scene = load_scene(&path).unwrap();
        scene.set_property(&name("V1"), PropertyKey::Gamma, PropertyValue::Number(2.2));
        scene.set_property(
            &name("V1"),
            PropertyKey::Roi,
            PropertyValue::List(vec![1.0, 2.0, 3.0, 4.0]),
        );
        save_scene(&scene, &path).unwrap();

        refresh(&path, &config, "V1").unwrap();

        let scene = load_scene(&path).unwrap();
        assert_eq!(
            scene.property(&name("V2"), PropertyKey::Gamma),
            Some(PropertyValue::Number(2.2))
        );
        assert_eq!(
            scene.property(&name("V2"), PropertyKey::Roi),
            Some(PropertyValue::List(vec![0.0, 0.0, 0.0, 0.0]))
        );
        assert!(refresh(&path, &config, "Missing").is_err());
    }
}
