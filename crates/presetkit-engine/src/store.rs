use crate::error::PresetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The externally owned state a preset captures.
///
/// The engine never interprets the payload; it only moves whole snapshots
/// between the store and disk and keeps track of which file the store was
/// last loaded from or saved to.
pub trait StateStore {
    /// Absolute path of the current preset, or empty when none is selected
    fn current_preset_path(&self) -> String;

    fn set_current_preset_path(&mut self, path: &str);

    /// Serialize the entire store content
    fn serialize(&self) -> Result<String, PresetError>;

    /// Replace the entire store content with a serialized snapshot.
    ///
    /// Implementations must leave the store untouched when the payload is rejected.
    fn replace_state(&mut self, payload: &str) -> Result<(), PresetError>;

    /// Counter bumped every time the owner swaps out the store root wholesale
    fn root_revision(&self) -> u64;
}

/// How a parameter's value is interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    Float { min: f64, max: f64, step: f64 },
    Choice(Vec<String>),
    Toggle,
}

/// Definition of one parameter held by a `ParameterStore`
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub id: String,
    pub name: String,
    pub kind: ParameterKind,
    pub default: f64,
}

impl ParameterSpec {
    pub fn float(id: &str, name: &str, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ParameterKind::Float { min, max, step },
            default,
        }
    }

    pub fn choice(id: &str, name: &str, options: &[&str], default: usize) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ParameterKind::Choice(options.iter().map(|o| o.to_string()).collect()),
            default: default as f64,
        }
    }

    pub fn toggle(id: &str, name: &str, default: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ParameterKind::Toggle,
            default: if default { 1.0 } else { 0.0 },
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default;
        }
        match &self.kind {
            ParameterKind::Float { min, max, .. } => value.clamp(*min, *max),
            ParameterKind::Choice(options) => {
                let last = options.len().saturating_sub(1) as f64;
                value.round().clamp(0.0, last)
            }
            ParameterKind::Toggle => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Move `value` one step up (`direction > 0`) or down
    pub fn nudge(&self, value: f64, direction: i32) -> f64 {
        let step = match &self.kind {
            ParameterKind::Float { step, .. } => *step,
            ParameterKind::Choice(_) => 1.0,
            ParameterKind::Toggle => return if value >= 0.5 { 0.0 } else { 1.0 },
        };
        self.clamp(value + step * f64::from(direction.signum()))
    }

    pub fn display(&self, value: f64) -> String {
        match &self.kind {
            ParameterKind::Float { .. } => format!("{value:.2}"),
            ParameterKind::Choice(options) => options
                .get(value.round().max(0.0) as usize)
                .cloned()
                .unwrap_or_default(),
            ParameterKind::Toggle => {
                if value >= 0.5 {
                    "On".to_string()
                } else {
                    "Off".to_string()
                }
            }
        }
    }
}

/// Serialized form of a `ParameterStore`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTree {
    #[serde(default)]
    pub preset_path: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

/// In-memory parameter state with a fixed layout, persisted as TOML
#[derive(Debug, Clone)]
pub struct ParameterStore {
    layout: Vec<ParameterSpec>,
    tree: StateTree,
    revision: u64,
}

impl ParameterStore {
    /// Create a store with every parameter at its default value
    pub fn new(layout: Vec<ParameterSpec>, version: &str) -> Self {
        let parameters = layout
            .iter()
            .map(|spec| (spec.id.clone(), spec.default))
            .collect();
        Self {
            layout,
            tree: StateTree {
                preset_path: String::new(),
                version: version.to_string(),
                parameters,
            },
            revision: 0,
        }
    }

    pub fn layout(&self) -> &[ParameterSpec] {
        &self.layout
    }

    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    pub fn value(&self, id: &str) -> Option<f64> {
        self.tree.parameters.get(id).copied()
    }

    /// Set a parameter, clamped to its range. Unknown ids are ignored.
    pub fn set_value(&mut self, id: &str, value: f64) -> bool {
        let Some(spec) = self.layout.iter().find(|spec| spec.id == id) else {
            return false;
        };
        let clamped = spec.clamp(value);
        self.tree.parameters.insert(spec.id.clone(), clamped);
        true
    }

    /// Swap in a whole new root, as a host does when restoring a session.
    ///
    /// This bumps the root revision so bound observers re-resolve.
    pub fn replace_root(&mut self, tree: StateTree) {
        self.tree = self.normalize(tree);
        self.revision += 1;
    }

    /// Restore a session payload previously produced by `serialize`
    pub fn restore_session(&mut self, payload: &str) -> Result<(), PresetError> {
        let tree = Self::parse(payload)?;
        self.replace_root(tree);
        Ok(())
    }

    fn parse(payload: &str) -> Result<StateTree, PresetError> {
        toml::from_str(payload).map_err(|e| PresetError::Snapshot(e.to_string()))
    }

    // Parameters missing from the snapshot fall back to defaults; unknown ones are dropped
    fn normalize(&self, tree: StateTree) -> StateTree {
        let parameters = self
            .layout
            .iter()
            .map(|spec| {
                let value = tree
                    .parameters
                    .get(&spec.id)
                    .map(|v| spec.clamp(*v))
                    .unwrap_or(spec.default);
                (spec.id.clone(), value)
            })
            .collect();
        StateTree {
            preset_path: tree.preset_path,
            version: tree.version,
            parameters,
        }
    }
}

impl StateStore for ParameterStore {
    fn current_preset_path(&self) -> String {
        self.tree.preset_path.clone()
    }

    fn set_current_preset_path(&mut self, path: &str) {
        self.tree.preset_path = path.to_string();
    }

    fn serialize(&self) -> Result<String, PresetError> {
        toml::to_string_pretty(&self.tree).map_err(|e| PresetError::Snapshot(e.to_string()))
    }

    fn replace_state(&mut self, payload: &str) -> Result<(), PresetError> {
        let tree = Self::parse(payload)?;
        self.tree = self.normalize(tree);
        Ok(())
    }

    fn root_revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn layout() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::float("mix", "Mix", 0.0, 1.0, 0.01, 0.5),
            ParameterSpec::choice("type", "Type", &["Tape", "Digital"], 0),
            ParameterSpec::toggle("sync", "Sync", false),
        ]
    }

    #[test]
    fn test_new_store_uses_defaults() {
        let store = ParameterStore::new(layout(), "1.0.0");
        assert_eq!(store.value("mix"), Some(0.5));
        assert_eq!(store.value("type"), Some(0.0));
        assert_eq!(store.value("sync"), Some(0.0));
        assert_eq!(store.current_preset_path(), "");
        assert_eq!(store.tree().version, "1.0.0");
    }

    #[test]
    fn test_set_value_clamps_and_rejects_unknown() {
        let mut store = ParameterStore::new(layout(), "1.0.0");
        assert!(store.set_value("mix", 4.0));
        assert_eq!(store.value("mix"), Some(1.0));
        assert!(!store.set_value("nope", 1.0));
        assert_eq!(store.value("nope"), None);
    }

    #[test]
    fn test_serialize_replace_reproduces_state() {
        let mut original = ParameterStore::new(layout(), "1.0.0");
        original.set_value("mix", 0.25);
        original.set_value("sync", 1.0);
        original.set_current_preset_path("/presets/a.preset");
        let payload = original.serialize().unwrap();

        let mut other = ParameterStore::new(layout(), "1.0.0");
        other.replace_state(&payload).unwrap();

        assert_eq!(other.tree(), original.tree());
        assert_eq!(other.serialize().unwrap(), payload);
    }

    #[test]
    fn test_replace_state_fills_missing_and_drops_unknown() {
        let mut store = ParameterStore::new(layout(), "1.0.0");
        store.set_value("mix", 0.9);

        store
            .replace_state("version = \"0.9\"\n[parameters]\nsync = 1.0\nghost = 3.0\n")
            .unwrap();

        assert_eq!(store.value("mix"), Some(0.5));
        assert_eq!(store.value("sync"), Some(1.0));
        assert_eq!(store.value("ghost"), None);
        assert_eq!(store.tree().version, "0.9");
    }

    #[test]
    fn test_rejected_payload_leaves_store_untouched() {
        let mut store = ParameterStore::new(layout(), "1.0.0");
        store.set_value("mix", 0.75);
        let before = store.tree().clone();

        let result = store.replace_state("this is = = not toml");

        assert!(matches!(result, Err(PresetError::Snapshot(_))));
        assert_eq!(store.tree(), &before);
    }

    #[test]
    fn test_replace_state_keeps_revision_but_replace_root_bumps_it() {
        let mut store = ParameterStore::new(layout(), "1.0.0");
        let payload = store.serialize().unwrap();

        store.replace_state(&payload).unwrap();
        assert_eq!(store.root_revision(), 0);

        store.restore_session(&payload).unwrap();
        assert_eq!(store.root_revision(), 1);
    }

    #[rstest]
    #[case(0, 0.5, 1, 0.51)]
    #[case(0, 1.0, 1, 1.0)]
    #[case(1, 0.0, -1, 0.0)]
    #[case(1, 0.0, 1, 1.0)]
    #[case(2, 0.0, 1, 1.0)]
    #[case(2, 1.0, 1, 0.0)]
    fn test_nudge(
        #[case] index: usize,
        #[case] value: f64,
        #[case] direction: i32,
        #[case] expected: f64,
    ) {
        let spec = &layout()[index];
        let nudged = spec.nudge(value, direction);
        assert!((nudged - expected).abs() < 1e-9, "{nudged} != {expected}");
    }

    #[test]
    fn test_display() {
        let specs = layout();
        assert_eq!(specs[0].display(0.5), "0.50");
        assert_eq!(specs[1].display(1.0), "Digital");
        assert_eq!(specs[2].display(1.0), "On");
    }
}
