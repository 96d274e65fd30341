//! The closed set of synchronizable viewer properties and their values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SyncError;

/// Kind of value a property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A boolean switch.
    Bool,
    /// A single number.
    Number,
    /// An ordered list of numbers (ranges, boxes).
    NumberList,
    /// The viewer's ordered input list.
    Inputs,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::NumberList => "number list",
            ValueKind::Inputs => "input list",
        };
        f.write_str(name)
    }
}

/// A synchronizable viewer property.
///
/// The declaration order is the propagation order of a batch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    /// Input-list syncing. Carries no value of its own.
    Inputs,
    /// Display gain.
    Gain,
    /// Display gamma.
    Gamma,
    /// Displayed channel set, as an index.
    Channels,
    /// Playback frame range `[first, last]`.
    FrameRange,
    /// Whether the frame range is locked.
    FrameRangeLock,
    /// Region of interest `[x, y, r, t]`.
    Roi,
    /// Whether the region of interest is shown.
    ShowRoi,
    /// Whether pixel aspect is ignored.
    IgnorePixelAspect,
    /// Whether zoom is locked.
    ZoomLock,
}

impl PropertyKey {
    /// Every key, in propagation order.
    pub const ALL: [PropertyKey; 10] = [
        PropertyKey::Inputs,
        PropertyKey::Gain,
        PropertyKey::Gamma,
        PropertyKey::Channels,
        PropertyKey::FrameRange,
        PropertyKey::FrameRangeLock,
        PropertyKey::Roi,
        PropertyKey::ShowRoi,
        PropertyKey::IgnorePixelAspect,
        PropertyKey::ZoomLock,
    ];

    /// The host-facing key string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKey::Inputs => "inputs",
            PropertyKey::Gain => "gain",
            PropertyKey::Gamma => "gamma",
            PropertyKey::Channels => "channels",
            PropertyKey::FrameRange => "frame_range",
            PropertyKey::FrameRangeLock => "frame_range_lock",
            PropertyKey::Roi => "roi",
            PropertyKey::ShowRoi => "show_roi",
            PropertyKey::IgnorePixelAspect => "ignore_pixel_aspect",
            PropertyKey::ZoomLock => "zoom_lock",
        }
    }

    /// The kind of value stored under this key.
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyKey::Inputs => ValueKind::Inputs,
            PropertyKey::Gain | PropertyKey::Gamma | PropertyKey::Channels => ValueKind::Number,
            PropertyKey::FrameRange | PropertyKey::Roi => ValueKind::NumberList,
            PropertyKey::FrameRangeLock
            | PropertyKey::ShowRoi
            | PropertyKey::IgnorePixelAspect
            | PropertyKey::ZoomLock => ValueKind::Bool,
        }
    }

    /// Check if this is the input-list key.
    pub fn is_inputs(&self) -> bool {
        matches!(self, PropertyKey::Inputs)
    }

    /// Keys that carry a value, in propagation order.
    pub fn valued() -> impl Iterator<Item = PropertyKey> {
        Self::ALL.into_iter().filter(|k| !k.is_inputs())
    }
}

impl FromStr for PropertyKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SyncError::UnknownProperty(s.to_string()))
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value as exchanged with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean switch.
    Bool(bool),
    /// Single number.
    Number(f64),
    /// Ordered list of numbers.
    List(Vec<f64>),
}

impl PropertyValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Number(_) => ValueKind::Number,
            PropertyValue::List(_) => ValueKind::NumberList,
        }
    }

    /// Check that this value may be stored under `key`.
    pub fn check_kind(&self, key: PropertyKey) -> Result<(), SyncError> {
        if self.kind() == key.kind() {
            Ok(())
        } else {
            Err(SyncError::KindMismatch {
                key: key.to_string(),
                expected: key.kind(),
                found: self.kind(),
            })
        }
    }

    /// Parse user-supplied text as a value for `key`.
    ///
    /// Booleans accept `true/false`, `on/off`, `1/0`. Lists are comma
    /// or whitespace separated.
    pub fn parse(key: PropertyKey, text: &str) -> Result<Self, SyncError> {
        let invalid = |reason: String| SyncError::InvalidValue {
            key: key.to_string(),
            value: text.to_string(),
            reason,
        };
        let text = text.trim();

        match key.kind() {
            ValueKind::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => Ok(PropertyValue::Bool(true)),
                "false" | "off" | "0" => Ok(PropertyValue::Bool(false)),
                _ => Err(invalid("expected true or false".into())),
            },
            ValueKind::Number => parse_finite(text).map(PropertyValue::Number).map_err(invalid),
            ValueKind::NumberList => text
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(parse_finite)
                .collect::<Result<Vec<_>, _>>()
                .map(PropertyValue::List)
                .map_err(invalid),
            ValueKind::Inputs => Err(invalid("inputs are set by connecting producers".into())),
        }
    }
}

/// Parse one number. NaN and infinities have no JSON form and are rejected.
fn parse_finite(text: &str) -> Result<f64, String> {
    let value = text.parse::<f64>().map_err(|e| e.to_string())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err("must be finite".to_string())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::List(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}
