// Copyright (c) 2026 rezky_nightky

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{BundleError, ValidationError};
use crate::glyphs;
use crate::params::{application_order, ParamKey, RainParameters};
use crate::validate::{self, Siblings};

const EMBEDDED_BUNDLE: &str = include_str!("../data/rain.json");

/// Raw `{ defaultConfig, glyphs, presets }` data as shipped or supplied by the user.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RainBundle {
    pub default_config: Option<Map<String, Value>>,
    pub glyphs: Option<String>,
    pub presets: Option<Map<String, Value>>,
}

impl RainBundle {
    pub fn from_json_str(what: &str, text: &str) -> Result<RainBundle, BundleError> {
        serde_json::from_str(text).map_err(|source| BundleError::Parse {
            what: what.to_string(),
            source,
        })
    }

    pub fn embedded() -> RainBundle {
        match RainBundle::from_json_str("embedded rain bundle", EMBEDDED_BUNDLE) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "embedded rain bundle unusable, using built-in defaults");
                RainBundle::default()
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<RainBundle, BundleError> {
        let text = std::fs::read_to_string(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        RainBundle::from_json_str(&path.display().to_string(), &text)
    }

    /// External bundle if given and readable, otherwise the embedded one.
    pub fn load(path: Option<&Path>) -> RainBundle {
        let Some(path) = path else {
            return RainBundle::embedded();
        };
        match RainBundle::from_path(path) {
            Ok(b) => {
                tracing::info!(path = %path.display(), "loaded rain bundle");
                b
            }
            Err(e) => {
                tracing::warn!(error = %e, "falling back to embedded rain bundle");
                RainBundle::embedded()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Preset {
    Reset {
        description: String,
    },
    Config {
        config: Map<String, Value>,
        description: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPreset {
    #[serde(default)]
    is_reset: bool,
    config: Option<Map<String, Value>>,
    #[serde(default)]
    description: String,
}

impl Preset {
    pub fn from_value(v: &Value) -> Option<Preset> {
        let raw: RawPreset = serde_json::from_value(v.clone()).ok()?;
        if raw.is_reset {
            return Some(Preset::Reset {
                description: raw.description,
            });
        }
        raw.config.map(|config| Preset::Config {
            config,
            description: raw.description,
        })
    }

    pub fn description(&self) -> &str {
        match self {
            Preset::Reset { description } | Preset::Config { description, .. } => description,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyStatus {
    AllOk,
    Partial,
    AllFailed,
    NoOp,
}

/// Per-field tally of a batch application.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplyReport {
    pub applied: Vec<ParamKey>,
    pub failed: Vec<(String, ValidationError)>,
}

impl ApplyReport {
    pub fn status(&self) -> ApplyStatus {
        match (self.applied.len(), self.failed.len()) {
            (0, 0) => ApplyStatus::NoOp,
            (_, 0) => ApplyStatus::AllOk,
            (0, _) => ApplyStatus::AllFailed,
            _ => ApplyStatus::Partial,
        }
    }

    pub fn total(&self) -> usize {
        self.applied.len() + self.failed.len()
    }
}

/// Owns the active and default parameter sets plus the named presets.
#[derive(Clone, Debug)]
pub struct RainConfigStore {
    active: RainParameters,
    defaults: RainParameters,
    presets: BTreeMap<String, Preset>,
    glyphs: Vec<char>,
}

impl RainConfigStore {
    pub fn new(bundle: RainBundle) -> Self {
        let mut defaults = RainParameters::default();
        if let Some(config) = &bundle.default_config {
            let report = apply_batch(&mut defaults, config);
            for (name, err) in &report.failed {
                tracing::warn!(param = %name, error = %err, "ignoring bundle default");
            }
            for (name, target) in [("baseCol", &mut defaults.base_col), ("headCol", &mut defaults.head_col)] {
                if let Some(Value::String(s)) = config.get(name) {
                    *target = s.clone();
                }
            }
        }

        let mut presets = BTreeMap::new();
        for (name, v) in bundle.presets.iter().flatten() {
            match Preset::from_value(v) {
                Some(p) => {
                    presets.insert(name.trim().to_lowercase(), p);
                }
                None => tracing::warn!(preset = %name, "skipping malformed preset"),
            }
        }
        presets.entry("default".to_string()).or_insert(Preset::Reset {
            description: "Restore the default rain".to_string(),
        });

        let glyphs = bundle
            .glyphs
            .as_deref()
            .map(glyphs::from_text)
            .filter(|g| !g.is_empty())
            .unwrap_or_else(glyphs::fallback);

        Self {
            active: defaults.clone(),
            defaults,
            presets,
            glyphs,
        }
    }

    pub fn builtin() -> Self {
        RainConfigStore::new(RainBundle::embedded())
    }

    /// Borrowed read snapshot; mutation only goes through `update`.
    pub fn active(&self) -> &RainParameters {
        &self.active
    }

    pub fn get_active(&self) -> RainParameters {
        self.active.clone()
    }

    pub fn get_defaults(&self) -> RainParameters {
        self.defaults.clone()
    }

    pub fn get_presets(&self) -> &BTreeMap<String, Preset> {
        &self.presets
    }

    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(&name.trim().to_lowercase())
    }

    pub fn preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn set_glyphs(&mut self, glyphs: Vec<char>) {
        if !glyphs.is_empty() {
            self.glyphs = glyphs;
        }
    }

    pub fn update(&mut self, name: &str, raw: &Value, siblings: Option<&Map<String, Value>>) -> bool {
        self.try_update(name, raw, siblings).is_ok()
    }

    pub fn try_update(
        &mut self,
        name: &str,
        raw: &Value,
        siblings: Option<&Map<String, Value>>,
    ) -> Result<ParamKey, ValidationError> {
        let (key, value) =
            validate::validate_named(name, raw, &Siblings::new(&self.active, siblings))?;
        self.active.set(key, value);
        Ok(key)
    }

    pub fn reset_to_defaults(&mut self) {
        self.active = self.defaults.clone();
    }

    /// Applies every field of a preset config, bounds before dependents.
    pub fn apply_config(&mut self, config: &Map<String, Value>) -> ApplyReport {
        apply_batch(&mut self.active, config)
    }

    /// Theme-driven colours bypass validation.
    pub fn set_colors(&mut self, base: &str, head: &str) {
        self.active.base_col = base.to_string();
        self.active.head_col = head.to_string();
    }
}

fn apply_batch(target: &mut RainParameters, config: &Map<String, Value>) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut known: Vec<(ParamKey, &Value)> = Vec::new();
    for (name, raw) in config {
        match validate::resolve_key(name) {
            Ok(key) => known.push((key, raw)),
            // Colours ride along in bundle defaults; they are not batch fields.
            Err(ValidationError::NotTunable(_)) => {}
            Err(e) => report.failed.push((name.clone(), e)),
        }
    }

    // Rejected fields leave the batch so later siblings check against the
    // active value instead.
    let mut pending = config.clone();
    let keys: Vec<ParamKey> = known.iter().map(|(k, _)| *k).collect();
    for key in application_order(&keys) {
        let Some((_, raw)) = known.iter().find(|(k, _)| *k == key) else {
            continue;
        };
        match validate::validate(key, raw, &Siblings::new(target, Some(&pending))) {
            Ok(value) => {
                target.set(key, value);
                report.applied.push(key);
            }
            Err(e) => {
                pending.retain(|name, _| ParamKey::from_name(name) != Some(key));
                report.failed.push((key.name().to_string(), e));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn bundle(default_config: Value) -> RainBundle {
        RainBundle {
            default_config: default_config.as_object().cloned(),
            glyphs: Some("01".to_string()),
            presets: json!({
                "storm": {"config": {"layers": 3, "layerOp": [1, 0.5, 0.2], "maxTrail": 50, "minTrail": 20}, "description": "heavy"},
                "Default": {"isReset": true},
                "broken": {"description": "no config"},
            })
            .as_object()
            .cloned(),
        }
    }

    fn store() -> RainConfigStore {
        RainConfigStore::new(bundle(json!({
            "minTrail": 10, "maxTrail": 30, "layers": 1, "layerOp": [1]
        })))
    }

    #[test]
    fn rejected_update_leaves_state_untouched() {
        let mut s = store();
        assert!(!s.update("minTrail", &json!(40), None));
        assert_eq!(s.active().min_trail, 10);
        assert_eq!(s.get_active(), s.get_defaults());
    }

    #[test]
    fn accepted_update_writes_canonical_key() {
        let mut s = store();
        assert!(s.update("SPEED", &json!("120"), None));
        assert_eq!(s.active().speed, 120);
        assert_eq!(s.get_defaults().speed, RainParameters::default().speed);
    }

    #[test]
    fn reset_round_trips_to_defaults() {
        let mut s = store();
        assert!(s.update("density", &json!(1.5), None));
        s.set_colors("#ffffff", "#000000");
        s.reset_to_defaults();
        assert_eq!(s.get_active(), s.get_defaults());
    }

    #[test]
    fn preset_with_coupled_fields_applies_fully() {
        let mut s = store();
        let Some(Preset::Config { config, .. }) = s.preset("STORM").cloned() else {
            panic!("storm preset missing");
        };
        let report = s.apply_config(&config);
        assert_eq!(report.status(), ApplyStatus::AllOk);
        assert_eq!(report.applied.len(), 4);
        let a = s.active();
        assert_eq!((a.layers, a.min_trail, a.max_trail), (3, 20, 50));
        assert_eq!(a.layer_op, vec![1.0, 0.5, 0.2]);
    }

    #[test]
    fn rejected_bounds_do_not_vouch_for_their_dependents() {
        let mut s = store();
        let batch = json!({
            "maxTrail": 200,
            "minTrail": 50,
            "layers": 12,
            "layerOp": vec![1.0; 12],
        });
        let report = s.apply_config(batch.as_object().unwrap());
        assert_eq!(report.status(), ApplyStatus::AllFailed);
        let failed: Vec<&str> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
        for name in ["maxTrail", "minTrail", "layers", "layerOp"] {
            assert!(failed.contains(&name), "{name} should be rejected");
        }
        let a = s.active();
        assert!(a.min_trail <= a.max_trail);
        assert_eq!((a.min_trail, a.max_trail), (10, 30));
        assert_eq!(a.layers, 1);
        assert_eq!(a.layer_op.len(), a.layers as usize);
    }

    #[test]
    fn dependent_checks_against_active_once_its_bound_fails() {
        let mut s = store();
        let batch = json!({"layers": 0, "layerOp": [0.4]});
        let report = s.apply_config(batch.as_object().unwrap());
        assert_eq!(report.status(), ApplyStatus::Partial);
        assert_eq!(report.applied, vec![ParamKey::LayerOp]);
        assert_eq!(s.active().layers, 1);
        assert_eq!(s.active().layer_op, vec![0.4]);
    }

    #[test]
    fn partial_and_failed_batches_are_tallied() {
        let mut s = store();
        let partial = json!({"speed": 40, "fadeSpeed": 7, "glitter": 1});
        let report = s.apply_config(partial.as_object().unwrap());
        assert_eq!(report.status(), ApplyStatus::Partial);
        assert_eq!(report.applied, vec![ParamKey::Speed]);
        assert_eq!(report.failed.len(), 2);

        let failed = json!({"speed": 1});
        let report = s.apply_config(failed.as_object().unwrap());
        assert_eq!(report.status(), ApplyStatus::AllFailed);

        assert_eq!(s.apply_config(&Map::new()).status(), ApplyStatus::NoOp);
    }

    #[test]
    fn malformed_bundle_parts_fall_back() {
        let s = RainConfigStore::new(RainBundle {
            default_config: json!({"speed": 9999, "font": 20, "baseCol": "#123456"})
                .as_object()
                .cloned(),
            glyphs: Some(String::new()),
            presets: None,
        });
        let d = s.get_defaults();
        assert_eq!(d.speed, RainParameters::default().speed);
        assert_eq!(d.font, 20);
        assert_eq!(d.base_col, "#123456");
        assert!(!s.glyphs().is_empty());
        assert!(matches!(s.preset("default"), Some(Preset::Reset { .. })));
    }

    #[test]
    fn malformed_presets_are_skipped_and_names_fold_case() {
        let s = store();
        assert!(s.preset("broken").is_none());
        assert!(s.preset("default").is_some());
        assert!(s.preset(" Storm ").is_some());
    }

    #[test]
    fn external_bundle_loads_and_bad_path_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rain.json");
        std::fs::write(&path, r#"{"defaultConfig": {"speed": 77}, "glyphs": "ab"}"#).unwrap();
        let s = RainConfigStore::new(RainBundle::load(Some(&path)));
        assert_eq!(s.active().speed, 77);
        assert_eq!(s.glyphs(), &['a', 'b']);

        std::fs::write(&path, "{not json").unwrap();
        assert!(RainBundle::from_path(&path).is_err());
        let s = RainConfigStore::new(RainBundle::load(Some(&path)));
        assert!(s.preset("default").is_some());
    }

    #[test]
    fn embedded_bundle_is_valid() {
        let b = RainBundle::embedded();
        assert!(b.default_config.is_some());
        let s = RainConfigStore::new(b);
        assert!(s.get_presets().len() > 3);
        for (name, preset) in s.get_presets() {
            if let Preset::Config { config, .. } = preset {
                let mut probe = s.clone();
                let report = probe.apply_config(config);
                assert_eq!(report.status(), ApplyStatus::AllOk, "preset {name}: {report:?}");
            }
        }
    }

    fn shuffled_batch(min: u32, max: u32, gmin: u32, gmax: u32, seed: u64) -> Map<String, Value> {
        let mut entries = vec![
            ("minTrail", json!(min)),
            ("maxTrail", json!(max)),
            ("headGlowMin", json!(gmin)),
            ("headGlowMax", json!(gmax)),
            ("layers", json!(2)),
            ("layerOp", json!([1, 0.4])),
        ];
        let n = entries.len();
        for i in 0..n {
            let j = ((seed >> (i * 5)) as usize + i) % n;
            entries.swap(i, j);
        }
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    proptest! {
        #[test]
        fn ordered_pairs_apply_regardless_of_key_order(
            min in 1u32..=100, span in 0u32..=99, gmin in 0u32..=20, gspan in 0u32..=20, seed in any::<u64>()
        ) {
            let max = (min + span).min(100);
            let gmax = (gmin + gspan).min(20);
            let mut s = store();
            let report = s.apply_config(&shuffled_batch(min, max, gmin, gmax, seed));
            prop_assert_eq!(report.status(), ApplyStatus::AllOk);
            prop_assert_eq!(s.active().min_trail, min);
            prop_assert_eq!(s.active().max_trail, max);
            prop_assert_eq!(s.active().head_glow_max, gmax);
        }
    }
}
