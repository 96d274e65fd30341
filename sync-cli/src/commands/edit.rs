//! Scene edits: add, select and delete viewers.

use anyhow::{Context, Result};
use std::path::Path;
use viewer_sync_core::Host;

use crate::config::{load_scene, save_scene};

/// Add a viewer, optionally appending it to the selection.
pub fn add(path: &Path, name: &str, select: bool) -> Result<()> {
    let mut scene = load_scene(path)?;
    scene
        .add_viewer(name)
        .with_context(|| format!("Cannot add viewer '{}'", name))?;

    if select {
        let mut selection: Vec<String> =
            scene.selected().iter().map(|n| n.to_string()).collect();
        selection.push(name.to_string());
        let names: Vec<&str> = selection.iter().map(String::as_str).collect();
        scene.select(&names)?;
    }

    save_scene(&scene, path)?;
    println!("Added {}", name);
    Ok(())
}

/// Replace the selection.
pub fn select(path: &Path, names: &[String]) -> Result<()> {
    let mut scene = load_scene(path)?;
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    scene.select(&names).context("Cannot select")?;
    save_scene(&scene, path)?;

    if names.is_empty() {
        println!("Selection cleared");
    } else {
        println!("Selected {}", names.join(", "));
    }
    Ok(())
}

/// Delete a viewer. Links pointing at it are pruned on the next change.
pub fn delete(path: &Path, name: &str) -> Result<()> {
    let mut scene = load_scene(path)?;
    scene
        .delete(name)
        .with_context(|| format!("Cannot delete viewer '{}'", name))?;
    save_scene(&scene, path)?;
    println!("Deleted {}", name);
    Ok(())
}
