//! Create an empty scene document.

use anyhow::Result;
use std::path::Path;
use viewer_sync_core::Scene;

use crate::config::save_scene;

/// Run the init command.
pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Scene already exists at {}. Use --force to start over.",
            path.display()
        );
    }

    save_scene(&Scene::new(), path)?;

    println!("Scene created at {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Add viewers: viewer-sync add Viewer1 --select");
    println!("  2. Link them:   viewer-sync toggle");

    Ok(())
}
