//! Link or unlink the selected viewers.

use anyhow::Result;
use std::path::Path;
use viewer_sync_core::{SyncConfig, SyncToggle, ToggleDecision, ToggleMode, ToggleReport};

use crate::config::{load_scene, save_scene};

/// Run the toggle command.
pub fn run(path: &Path, config: &SyncConfig, mode: ToggleMode) -> Result<()> {
    let mut scene = load_scene(path)?;
    let report = SyncToggle::new(config).run(&mut scene, mode);
    save_scene(&scene, path)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ToggleReport) {
    match report.decision {
        ToggleDecision::Disabled => println!("Host unavailable, nothing done"),
        ToggleDecision::Remove => println!("Unlinked {} viewers", report.cleared.len()),
        ToggleDecision::Add | ToggleDecision::Relink => {
            if report.decision == ToggleDecision::Relink {
                println!("Cleared {} existing links", report.cleared.len());
            }
            if report.linked.is_empty() {
                println!("Nothing to link (groups need at least 2 viewers)");
            }
            for group in &report.linked {
                let members: Vec<&str> = group.members.iter().map(|m| m.as_str()).collect();
                println!("Linked {}: {}", group.key, members.join(", "));
            }
        }
    }
    for (name, reason) in &report.skipped {
        println!("  skipped {}: {}", name, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{edit, init};
    use tempfile::tempdir;
    use viewer_sync_core::{link, Host};
    use viewer_sync_types::EntityName;

    #[test]
    fn toggle_links_then_unlinks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let config = SyncConfig::default();
        init::run(&path, false).unwrap();
        edit::add(&path, "Viewer1", true).unwrap();
        edit::add(&path, "Viewer2", true).unwrap();

        run(&path, &config, ToggleMode::Auto).unwrap();
        let scene = load_scene(&path).unwrap();
        let v1 = EntityName::new("Viewer1").unwrap();
        let peers = link::decode(&scene.callback(&v1).unwrap()).unwrap();
        assert_eq!(peers, vec![EntityName::new("Viewer2").unwrap()]);

        run(&path, &config, ToggleMode::Auto).unwrap();
        let scene = load_scene(&path).unwrap();
        assert_eq!(scene.callback(&v1).as_deref(), Some(""));
    }
}
