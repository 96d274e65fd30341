//! Print the scene.

use anyhow::Result;
use std::path::Path;
use viewer_sync_core::{link, LinkState, Scene, Viewer};

use crate::config::load_scene;

/// Run the show command.
pub fn run(path: &Path) -> Result<()> {
    let scene = load_scene(path)?;
    print!("{}", render(&scene));
    Ok(())
}

fn render(scene: &Scene) -> String {
    let mut out = String::new();
    if scene.iter().next().is_none() {
        out.push_str("No viewers. Run 'viewer-sync add <name>'.\n");
        return out;
    }
    for viewer in scene.iter() {
        render_viewer(&mut out, scene, viewer);
    }
    out
}

fn render_viewer(out: &mut String, scene: &Scene, viewer: &Viewer) {
    let selected = if scene.is_selected(&viewer.name) { " *" } else { "" };
    out.push_str(&format!("{}{}\n", viewer.name, selected));

    let link = match link::inspect(&viewer.callback) {
        LinkState::Unset => "-".to_string(),
        LinkState::Linked(peers) => {
            let peers: Vec<&str> = peers.iter().map(|p| p.as_str()).collect();
            peers.join(", ")
        }
        LinkState::Malformed(reason) => format!("malformed ({})", reason),
        LinkState::Foreign => "foreign callback".to_string(),
    };
    out.push_str(&format!("  linked:  {}\n", link));

    if !viewer.inputs.is_empty() {
        let inputs: Vec<&str> = viewer
            .inputs
            .iter()
            .map(|i| i.as_ref().map_or("-", |n| n.as_str()))
            .collect();
        out.push_str(&format!("  inputs:  {}\n", inputs.join(", ")));
    }
    for (key, value) in &viewer.properties {
        out.push_str(&format!("  {}: {}\n", key, value));
    }
    if !viewer.flags.is_empty() {
        let flags: Vec<String> = viewer
            .flags
            .iter()
            .filter(|(_, on)| **on)
            .map(|(key, _)| key.to_string())
            .collect();
        out.push_str(&format!("  syncing: {}\n", flags.join(", ")));
    }
}
