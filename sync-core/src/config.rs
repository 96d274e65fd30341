//! Configuration for viewer-sync.
//!
//! Configuration is an immutable value built once (from defaults or a TOML
//! file) and passed by reference to the toggle controller and the engine.
//!
//! ```toml
//! granular = true
//!
//! [keys]
//! input_change = "inputChange"
//! batch = "showPanel"
//! flag_prefix = "vs_"
//!
//! [properties.gamma]
//! default_enabled = false
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use viewer_sync_types::{PropertyKey, Trigger};

use crate::host::ControlSpec;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `[properties.<key>]` section names no known property.
    #[error("unknown property in configuration: {0}")]
    UnknownProperty(String),

    /// Trigger keys are empty or collide with each other.
    #[error("invalid trigger keys: {0}")]
    InvalidKeys(String),
}

/// Display metadata and default enable state for one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    /// Short label shown next to the enable flag.
    pub title: String,
    /// Longer help text for the enable flag.
    pub tooltip: String,
    /// Whether the property syncs when no per-viewer flag says otherwise.
    pub default_enabled: bool,
}

impl PropertySpec {
    fn new(title: &str, tooltip: &str, default_enabled: bool) -> Self {
        Self {
            title: title.to_string(),
            tooltip: tooltip.to_string(),
            default_enabled,
        }
    }

    /// Built-in spec for `key`.
    pub fn builtin(key: PropertyKey) -> Self {
        match key {
            PropertyKey::Inputs => Self::new("Inputs", "Sync the connected inputs.", true),
            PropertyKey::Gain => Self::new("Gain", "Sync the display gain.", true),
            PropertyKey::Gamma => Self::new("Gamma", "Sync the display gamma.", true),
            PropertyKey::Channels => {
                Self::new("Channels", "Sync the displayed channel set.", false)
            }
            PropertyKey::FrameRange => {
                Self::new("Frame Range", "Sync the playback frame range.", true)
            }
            PropertyKey::FrameRangeLock => Self::new(
                "Frame Range Lock",
                "Sync whether the frame range is locked.",
                true,
            ),
            PropertyKey::Roi => Self::new("ROI", "Sync the region of interest box.", false),
            PropertyKey::ShowRoi => Self::new(
                "Show ROI",
                "Sync whether the region of interest is shown.",
                false,
            ),
            PropertyKey::IgnorePixelAspect => Self::new(
                "Ignore Pixel Aspect",
                "Sync whether pixel aspect is ignored.",
                false,
            ),
            PropertyKey::ZoomLock => {
                Self::new("Zoom Lock", "Sync whether zoom is locked.", false)
            }
        }
    }
}

/// Complete mapping from every [`PropertyKey`] to its [`PropertySpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTable {
    // Indexed by declaration order of PropertyKey.
    specs: [PropertySpec; PropertyKey::ALL.len()],
}

impl PropertyTable {
    /// Look up the spec for a key.
    pub fn get(&self, key: PropertyKey) -> &PropertySpec {
        &self.specs[key as usize]
    }

    /// Iterate specs in propagation order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyKey, &PropertySpec)> {
        PropertyKey::ALL.into_iter().zip(self.specs.iter())
    }

    fn apply(&mut self, key: PropertyKey, patch: PropertyOverride) {
        let spec = &mut self.specs[key as usize];
        if let Some(title) = patch.title {
            spec.title = title;
        }
        if let Some(tooltip) = patch.tooltip {
            spec.tooltip = tooltip;
        }
        if let Some(enabled) = patch.default_enabled {
            spec.default_enabled = enabled;
        }
    }
}

impl Default for PropertyTable {
    fn default() -> Self {
        Self {
            specs: PropertyKey::ALL.map(PropertySpec::builtin),
        }
    }
}

/// Host key strings with special meaning to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerKeys {
    /// Key reported when a viewer's inputs change (default: `inputChange`).
    #[serde(default = "default_input_change")]
    pub input_change: String,
    /// Key reported for a generic "refresh everything" change (default: `showPanel`).
    #[serde(default = "default_batch")]
    pub batch: String,
    /// Prefix of per-property enable flag keys (default: `vs_`).
    #[serde(default = "default_flag_prefix")]
    pub flag_prefix: String,
}

impl TriggerKeys {
    /// Classify a host key string.
    pub fn classify(&self, key: &str) -> Trigger {
        if key == self.input_change {
            return Trigger::Inputs;
        }
        if key == self.batch {
            return Trigger::Batch;
        }
        if let Some(rest) = key.strip_prefix(self.flag_prefix.as_str()) {
            if let Ok(property) = rest.parse::<PropertyKey>() {
                return Trigger::EnableFlag(property);
            }
        }
        match key.parse::<PropertyKey>() {
            Ok(PropertyKey::Inputs) => Trigger::Inputs,
            Ok(property) => Trigger::Property(property),
            Err(_) => Trigger::Other(key.to_string()),
        }
    }

    /// Host key of the enable flag for `key`.
    pub fn flag_key(&self, key: PropertyKey) -> String {
        format!("{}{}", self.flag_prefix, key)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.input_change.is_empty() || self.batch.is_empty() || self.flag_prefix.is_empty() {
            return Err(ConfigError::InvalidKeys("keys must not be empty".into()));
        }
        if self.input_change == self.batch {
            return Err(ConfigError::InvalidKeys(format!(
                "input_change and batch are both {:?}",
                self.batch
            )));
        }
        for special in [&self.input_change, &self.batch] {
            if special.parse::<PropertyKey>().is_ok() || special.starts_with(&self.flag_prefix) {
                return Err(ConfigError::InvalidKeys(format!(
                    "{:?} collides with a property or flag key",
                    special
                )));
            }
        }
        Ok(())
    }
}

impl Default for TriggerKeys {
    fn default() -> Self {
        Self {
            input_change: default_input_change(),
            batch: default_batch(),
            flag_prefix: default_flag_prefix(),
        }
    }
}

// Default value functions
fn default_input_change() -> String {
    "inputChange".to_string()
}

fn default_batch() -> String {
    "showPanel".to_string()
}

fn default_flag_prefix() -> String {
    "vs_".to_string()
}

/// Per-property override section as written in TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropertyOverride {
    title: Option<String>,
    tooltip: Option<String>,
    default_enabled: Option<bool>,
}

/// File schema, before property names are checked.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    granular: bool,
    #[serde(default)]
    keys: TriggerKeys,
    #[serde(default)]
    properties: BTreeMap<String, PropertyOverride>,
}

/// Root configuration for viewer-sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// Offer per-viewer, per-property enable flags (default: false).
    pub granular: bool,
    /// Special host keys.
    pub keys: TriggerKeys,
    /// Titles, tooltips and defaults for every property.
    pub properties: PropertyTable,
}

impl SyncConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        raw.keys.validate()?;

        let mut properties = PropertyTable::default();
        for (name, patch) in raw.properties {
            let key = name
                .parse::<PropertyKey>()
                .map_err(|_| ConfigError::UnknownProperty(name.clone()))?;
            properties.apply(key, patch);
        }

        Ok(Self {
            granular: raw.granular,
            keys: raw.keys,
            properties,
        })
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Whether `key` syncs when no per-viewer flag overrides it.
    pub fn default_enabled(&self, key: PropertyKey) -> bool {
        self.properties.get(key).default_enabled
    }

    /// The control to materialize for `key` in granular mode.
    pub fn control_spec(&self, key: PropertyKey) -> ControlSpec {
        let spec = self.properties.get(key);
        ControlSpec {
            key,
            name: self.keys.flag_key(key),
            title: spec.title.clone(),
            tooltip: spec.tooltip.clone(),
            default_enabled: spec.default_enabled,
        }
    }
}
