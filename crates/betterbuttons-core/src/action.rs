//! Button action symbols.
//!
//! `ButtonAction` covers everything a mapper can produce: the raw symbols
//! (`Press`, `Held`, `Release`) fed to the state machine and the canonical
//! gestures (`Single`, `Double`, `Long`) reported by direct-report sensors.
//! `PressEvent` is the consumer-visible subset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action symbol produced by an action mapper or recorded on a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonAction {
    #[default]
    None,
    Single,
    Double,
    Long,
    Press,
    Held,
    Release,
}

impl ButtonAction {
    /// The canonical gesture this action already is, if any.
    pub fn press_event(self) -> Option<PressEvent> {
        match self {
            Self::Single => Some(PressEvent::Single),
            Self::Double => Some(PressEvent::Double),
            Self::Long => Some(PressEvent::Long),
            _ => None,
        }
    }

    /// Whether this is a raw symbol that goes through synthesis.
    pub fn is_raw(self) -> bool {
        matches!(self, Self::Press | Self::Held | Self::Release)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Single => "single",
            Self::Double => "double",
            Self::Long => "long",
            Self::Press => "press",
            Self::Held => "held",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical press gesture delivered to the accessory side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressEvent {
    Single,
    Double,
    Long,
}

impl PressEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Long => "long",
        }
    }
}

impl From<PressEvent> for ButtonAction {
    fn from(event: PressEvent) -> Self {
        match event {
            PressEvent::Single => Self::Single,
            PressEvent::Double => Self::Double,
            PressEvent::Long => Self::Long,
        }
    }
}

impl fmt::Display for PressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
