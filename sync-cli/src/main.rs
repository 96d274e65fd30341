//! # viewer-sync
//!
//! Link viewers in a scene document and keep their display properties in
//! sync.
//!
//! ## Commands
//!
//! - `init`: Create an empty scene document
//! - `add` / `select` / `delete`: Edit viewers and the selection
//! - `toggle`: Link or unlink the selected viewers
//! - `set` / `connect` / `flag` / `refresh`: Change a viewer and sync its peers
//! - `show`: Print viewers, links and properties
//!
//! ## Example
//!
//! ```bash
//! viewer-sync init
//! viewer-sync add Viewer1 --select
//! viewer-sync add Viewer2 --select
//! viewer-sync toggle
//! viewer-sync set Viewer1 gain 0.5
//! viewer-sync show
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use viewer_sync_core::ToggleMode;
use viewer_sync_types::PropertyKey;

mod commands;
mod config;

use commands::{change, edit, init, show, toggle};

/// Link viewers and keep their properties in sync.
#[derive(Parser, Debug)]
#[command(name = "viewer-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Scene document (JSON)
    #[arg(long, global = true, default_value = config::DEFAULT_SCENE)]
    scene: PathBuf,

    /// Sync configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine decisions
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty scene document
    Init {
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },

    /// Add a viewer
    Add {
        /// Fully-qualified viewer name, e.g. `Comp.Viewer1`
        name: String,

        /// Also add the viewer to the selection
        #[arg(long)]
        select: bool,
    },

    /// Replace the selection (no names clears it)
    Select {
        /// Viewers to select
        names: Vec<String>,
    },

    /// Delete a viewer
    Delete {
        /// Viewer to delete
        name: String,
    },

    /// Link or unlink the selected viewers (all viewers when none selected)
    Toggle {
        /// Always link, replacing existing links
        #[arg(long, conflicts_with = "unlink")]
        link: bool,

        /// Always unlink
        #[arg(long, conflicts_with = "link")]
        unlink: bool,
    },

    /// Set a property and sync it to linked peers
    Set {
        /// Viewer to change
        name: String,

        /// Property key, e.g. `gain` or `frame_range`
        key: PropertyKey,

        /// New value, e.g. `0.5`, `true` or `1,100`
        value: String,
    },

    /// Connect an input slot and sync inputs to linked peers
    Connect {
        /// Viewer to change
        name: String,

        /// Input slot
        index: usize,

        /// Producer name, or `-` to disconnect
        producer: String,
    },

    /// Set an enable flag and sync it to linked peers
    Flag {
        /// Viewer to change
        name: String,

        /// Property the flag governs
        key: PropertyKey,

        /// New flag value
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Re-sync every enabled property from a viewer
    Refresh {
        /// Viewer to sync from
        name: String,
    },

    /// Print viewers, links and properties
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let scene = cli.scene.as_path();
    match cli.command {
        Commands::Init { force } => init::run(scene, force),
        Commands::Add { name, select } => edit::add(scene, &name, select),
        Commands::Select { names } => edit::select(scene, &names),
        Commands::Delete { name } => edit::delete(scene, &name),
        Commands::Toggle { link, unlink } => {
            let mode = if link {
                ToggleMode::Link
            } else if unlink {
                ToggleMode::Unlink
            } else {
                ToggleMode::Auto
            };
            let sync = config::load_sync_config(cli.config.as_deref())?;
            toggle::run(scene, &sync, mode)
        }
        Commands::Set { name, key, value } => {
            let sync = config::load_sync_config(cli.config.as_deref())?;
            change::set(scene, &sync, &name, key, &value)
        }
        Commands::Connect {
            name,
            index,
            producer,
        } => {
            let sync = config::load_sync_config(cli.config.as_deref())?;
            let producer = (producer != "-").then_some(producer.as_str());
            change::connect(scene, &sync, &name, index, producer)
        }
        Commands::Flag { name, key, enabled } => {
            let sync = config::load_sync_config(cli.config.as_deref())?;
            change::flag(scene, &sync, &name, key, enabled)
        }
        Commands::Refresh { name } => {
            let sync = config::load_sync_config(cli.config.as_deref())?;
            change::refresh(scene, &sync, &name)
        }
        Commands::Show => show::run(scene),
    }
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
