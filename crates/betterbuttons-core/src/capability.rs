//! Capability registry: which sensors are supported and how.
//!
//! Maps an exact `(manufacturer, model)` pair to the button layout of the
//! device and the mapper that parses its telemetry. There is no fuzzy
//! matching; an unknown pair simply resolves to `None`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mapper::{ActionMapper, DirectReportMapper, SplitPhaseMapper};

/// Lookup key of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceModel {
    pub manufacturer: String,
    pub model: String,
}

impl DeviceModel {
    pub fn new(manufacturer: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
        }
    }
}

/// Static description of one physical button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub name: String,
    pub supports_single: bool,
    pub supports_double: bool,
    pub supports_long: bool,
}

impl ButtonSpec {
    /// A button supporting all three gestures.
    pub fn all_gestures(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports_single: true,
            supports_double: true,
            supports_long: true,
        }
    }
}

/// Ordered buttons of a device plus its battery capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonLayout {
    pub buttons: Vec<ButtonSpec>,
    pub supports_battery: bool,
}

impl ButtonLayout {
    pub fn new(buttons: Vec<ButtonSpec>) -> Self {
        Self {
            buttons,
            supports_battery: false,
        }
    }

    pub fn with_battery(mut self) -> Self {
        self.supports_battery = true;
        self
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }
}

/// Registry entry: layout and mapper for one model.
#[derive(Debug, Clone)]
pub struct Capability {
    pub layout: ButtonLayout,
    pub mapper: Arc<dyn ActionMapper>,
}

impl Capability {
    pub fn new(layout: ButtonLayout, mapper: Arc<dyn ActionMapper>) -> Self {
        Self { layout, mapper }
    }
}

/// Lookup table of supported sensor models.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    entries: HashMap<DeviceModel, Capability>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every built-in sensor model.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        let hue_dimmer = Capability::new(
            hue_dimmer_layout(),
            Arc::new(SplitPhaseMapper::hue_dimmer()),
        );
        registry.register(DeviceModel::new("Philips", "RWL021"), hue_dimmer.clone());
        registry.register(
            DeviceModel::new("Signify Netherlands B.V.", "RWL022"),
            hue_dimmer,
        );

        registry.register(
            DeviceModel::new("eWeLink", "SNZB-01P"),
            Capability::new(
                ButtonLayout::new(vec![ButtonSpec::all_gestures("Button")]).with_battery(),
                Arc::new(DirectReportMapper),
            ),
        );

        registry
    }

    /// Add or replace an entry.
    pub fn register(&mut self, model: DeviceModel, capability: Capability) {
        self.entries.insert(model, capability);
    }

    /// Exact-match lookup.
    pub fn resolve(&self, manufacturer: &str, model: &str) -> Option<&Capability> {
        self.entries.get(&DeviceModel::new(manufacturer, model))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All supported models, sorted for stable output.
    pub fn models(&self) -> Vec<DeviceModel> {
        let mut models: Vec<_> = self.entries.keys().cloned().collect();
        models.sort_by(|a, b| (&a.manufacturer, &a.model).cmp(&(&b.manufacturer, &b.model)));
        models
    }
}

fn hue_dimmer_layout() -> ButtonLayout {
    ButtonLayout::new(vec![
        ButtonSpec::all_gestures("On"),
        ButtonSpec::all_gestures("Up"),
        ButtonSpec::all_gestures("Down"),
        ButtonSpec::all_gestures("Off"),
    ])
    .with_battery()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ButtonAction;

    #[test]
    fn test_builtin_hue_dimmer() {
        let registry = CapabilityRegistry::builtin();
        let capability = registry.resolve("Philips", "RWL021").unwrap();

        let names: Vec<_> = capability
            .layout
            .buttons
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(names, ["On", "Up", "Down", "Off"]);
        assert!(capability.layout.supports_battery);
        assert_eq!(capability.mapper.name(), "split_phase");

        let signify = registry
            .resolve("Signify Netherlands B.V.", "RWL022")
            .unwrap();
        assert_eq!(signify.layout, capability.layout);
    }

    #[test]
    fn test_builtin_ewelink() {
        let registry = CapabilityRegistry::builtin();
        let capability = registry.resolve("eWeLink", "SNZB-01P").unwrap();

        assert_eq!(capability.layout.len(), 1);
        assert_eq!(capability.mapper.map("long").action, ButtonAction::Long);
    }

    #[test]
    fn test_resolve_is_exact_match() {
        let registry = CapabilityRegistry::builtin();

        assert!(registry.resolve("Philips", "RWL022").is_none());
        assert!(registry.resolve("philips", "RWL021").is_none());
        assert!(registry.resolve("Philips", "RWL02").is_none());
        assert!(registry.resolve("", "").is_none());
    }

    #[test]
    fn test_register_custom_model() {
        let mut registry = CapabilityRegistry::new();
        assert!(registry.is_empty());

        registry.register(
            DeviceModel::new("Acme", "B1"),
            Capability::new(
                ButtonLayout::new(vec![ButtonSpec::all_gestures("Main")]),
                Arc::new(DirectReportMapper),
            ),
        );

        assert_eq!(registry.len(), 1);
        assert!(!registry.resolve("Acme", "B1").unwrap().layout.supports_battery);
        assert_eq!(registry.models(), vec![DeviceModel::new("Acme", "B1")]);
    }
}
