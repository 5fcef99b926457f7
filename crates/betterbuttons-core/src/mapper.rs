//! Vendor action mappers.
//!
//! A mapper turns the raw `action` string a sensor publishes into a button
//! index and an [`ButtonAction`]. Mappers are stateless and never fail:
//! telemetry is untrusted, so anything unrecognised degrades to a default
//! symbol instead of an error.

use std::fmt;

use crate::action::ButtonAction;

/// Output of a mapper: which button, and what happened to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedAction {
    pub button: usize,
    pub action: ButtonAction,
}

impl MappedAction {
    pub fn new(button: usize, action: ButtonAction) -> Self {
        Self { button, action }
    }
}

/// Strategy for parsing one vendor's action strings.
pub trait ActionMapper: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &'static str;

    /// Map a raw action string.
    fn map(&self, action: &str) -> MappedAction;
}

impl fmt::Debug for dyn ActionMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionMapper({})", self.name())
    }
}

/// Mapper for remotes that report `<button>_<phase>` strings, such as
/// `on_press`, `up_hold` or `off_press_release`.
///
/// The button token is resolved against a fixed vendor order; an unknown
/// token lands on button 0. The phase maps `press` to `Press`, `hold` to
/// `Held` and both release variants to `Release`. Anything else, including
/// a missing phase, is treated as `Press`.
#[derive(Debug, Clone)]
pub struct SplitPhaseMapper {
    buttons: &'static [&'static str],
}

impl SplitPhaseMapper {
    pub const fn new(buttons: &'static [&'static str]) -> Self {
        Self { buttons }
    }

    /// Button order of the Hue dimmer switch (RWL021/RWL022).
    pub const fn hue_dimmer() -> Self {
        Self::new(&["on", "up", "down", "off"])
    }

    fn button_index(&self, token: &str) -> usize {
        self.buttons.iter().position(|b| *b == token).unwrap_or(0)
    }

    fn phase(token: Option<&str>) -> ButtonAction {
        match token {
            Some("press") => ButtonAction::Press,
            Some("hold") => ButtonAction::Held,
            Some("press_release") | Some("hold_release") => ButtonAction::Release,
            _ => ButtonAction::Press,
        }
    }
}

impl ActionMapper for SplitPhaseMapper {
    fn name(&self) -> &'static str {
        "split_phase"
    }

    fn map(&self, action: &str) -> MappedAction {
        let mut parts = action.splitn(2, '_');
        let button = parts.next().map(|t| self.button_index(t)).unwrap_or(0);
        MappedAction::new(button, Self::phase(parts.next()))
    }
}

/// Mapper for single-button sensors that report the gesture directly
/// (`single`, `double`, `long`). Always targets button 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectReportMapper;

impl ActionMapper for DirectReportMapper {
    fn name(&self) -> &'static str {
        "direct_report"
    }

    fn map(&self, action: &str) -> MappedAction {
        let action = match action {
            "single" => ButtonAction::Single,
            "double" => ButtonAction::Double,
            "long" => ButtonAction::Long,
            _ => ButtonAction::None,
        };
        MappedAction::new(0, action)
    }
}
