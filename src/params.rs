// Copyright (c) 2026 rezky_nightky

use serde::{Deserialize, Serialize};

/// The full set of animation parameters driving the rain. Replaced as a unit on
/// reset; individual fields only change through the validated store entry point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RainParameters {
    pub speed: u32,
    pub font: u32,
    pub line_height: f32,
    pub density: f32,
    pub min_trail: u32,
    pub max_trail: u32,
    pub head_glow_min: u32,
    pub head_glow_max: u32,
    pub glow_blur: f32,
    pub trail_mutation_speed: u32,
    pub fade_speed: f32,
    pub decay_rate: f32,
    pub font_family: String,
    pub layers: u32,
    pub layer_op: Vec<f32>,
    pub eraser_chance: f32,
    pub base_col: String,
    pub head_col: String,
}

impl Default for RainParameters {
    fn default() -> Self {
        Self {
            speed: 50,
            font: 16,
            line_height: 1.0,
            density: 0.9,
            min_trail: 10,
            max_trail: 30,
            head_glow_min: 1,
            head_glow_max: 3,
            glow_blur: 8.0,
            trail_mutation_speed: 60,
            fade_speed: 0.08,
            decay_rate: 0.9,
            font_family: "monospace".to_string(),
            layers: 1,
            layer_op: vec![1.0],
            eraser_chance: 0.05,
            base_col: "#00ff41".to_string(),
            head_col: "#d7ffd7".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKey {
    Speed,
    Font,
    LineHeight,
    Density,
    MinTrail,
    MaxTrail,
    HeadGlowMin,
    HeadGlowMax,
    GlowBlur,
    TrailMutationSpeed,
    FadeSpeed,
    DecayRate,
    FontFamily,
    Layers,
    LayerOp,
    EraserChance,
}

/// How a raw value for a parameter is checked and coerced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rule {
    Int { min: f64, max: f64 },
    Float { min: f64, max: f64 },
    FontFamily,
    Opacities,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Int(u32),
    Float(f32),
    Text(String),
    List(Vec<f32>),
}

impl ParamKey {
    pub const ALL: [ParamKey; 16] = [
        ParamKey::Speed,
        ParamKey::Font,
        ParamKey::LineHeight,
        ParamKey::Density,
        ParamKey::MinTrail,
        ParamKey::MaxTrail,
        ParamKey::HeadGlowMin,
        ParamKey::HeadGlowMax,
        ParamKey::GlowBlur,
        ParamKey::TrailMutationSpeed,
        ParamKey::FadeSpeed,
        ParamKey::DecayRate,
        ParamKey::FontFamily,
        ParamKey::Layers,
        ParamKey::LayerOp,
        ParamKey::EraserChance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamKey::Speed => "speed",
            ParamKey::Font => "font",
            ParamKey::LineHeight => "lineHeight",
            ParamKey::Density => "density",
            ParamKey::MinTrail => "minTrail",
            ParamKey::MaxTrail => "maxTrail",
            ParamKey::HeadGlowMin => "headGlowMin",
            ParamKey::HeadGlowMax => "headGlowMax",
            ParamKey::GlowBlur => "glowBlur",
            ParamKey::TrailMutationSpeed => "trailMutationSpeed",
            ParamKey::FadeSpeed => "fadeSpeed",
            ParamKey::DecayRate => "decayRate",
            ParamKey::FontFamily => "fontFamily",
            ParamKey::Layers => "layers",
            ParamKey::LayerOp => "layerOp",
            ParamKey::EraserChance => "eraserChance",
        }
    }

    /// Case-insensitive lookup that also tolerates `snake_case` and `kebab-case`.
    pub fn from_name(name: &str) -> Option<ParamKey> {
        let folded: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        ParamKey::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(&folded))
    }

    pub fn rule(self) -> Rule {
        match self {
            ParamKey::Speed => Rule::Int {
                min: 10.0,
                max: 500.0,
            },
            ParamKey::Font => Rule::Int {
                min: 8.0,
                max: 40.0,
            },
            ParamKey::LineHeight => Rule::Float { min: 0.5, max: 2.0 },
            ParamKey::Density => Rule::Float { min: 0.1, max: 2.0 },
            ParamKey::MinTrail | ParamKey::MaxTrail => Rule::Int {
                min: 1.0,
                max: 100.0,
            },
            ParamKey::HeadGlowMin | ParamKey::HeadGlowMax => Rule::Int {
                min: 0.0,
                max: 20.0,
            },
            ParamKey::GlowBlur => Rule::Float {
                min: 0.0,
                max: 20.0,
            },
            ParamKey::TrailMutationSpeed => Rule::Int {
                min: 10.0,
                max: 1000.0,
            },
            ParamKey::FadeSpeed => Rule::Float {
                min: 0.01,
                max: 1.0,
            },
            ParamKey::DecayRate => Rule::Float {
                min: 0.7,
                max: 0.99,
            },
            ParamKey::FontFamily => Rule::FontFamily,
            ParamKey::Layers => Rule::Int {
                min: 1.0,
                max: 10.0,
            },
            ParamKey::LayerOp => Rule::Opacities,
            ParamKey::EraserChance => Rule::Float { min: 0.0, max: 1.0 },
        }
    }

    /// The field this one is validated against and therefore must be applied after
    /// when both arrive in the same batch.
    pub fn depends_on(self) -> Option<ParamKey> {
        match self {
            ParamKey::LayerOp => Some(ParamKey::Layers),
            ParamKey::MinTrail => Some(ParamKey::MaxTrail),
            ParamKey::HeadGlowMin => Some(ParamKey::HeadGlowMax),
            _ => None,
        }
    }

    /// Changing these invalidates column geometry, so the engine relayouts.
    pub fn affects_layout(self) -> bool {
        matches!(
            self,
            ParamKey::Font | ParamKey::LineHeight | ParamKey::Density | ParamKey::FontFamily
        )
    }

    pub fn range_label(self) -> String {
        match self.rule() {
            Rule::Int { min, max } | Rule::Float { min, max } => format!("{min}-{max}"),
            Rule::FontFamily => "letters, digits, spaces, commas, hyphens".to_string(),
            Rule::Opacities => "one 0-1 value per layer".to_string(),
        }
    }
}

/// Orders a batch so every field is applied after the field it validates against.
pub fn application_order(keys: &[ParamKey]) -> Vec<ParamKey> {
    let mut pending: Vec<ParamKey> = keys.to_vec();
    pending.sort();
    pending.dedup();

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready: Vec<ParamKey> = pending
            .iter()
            .copied()
            .filter(|k| k.depends_on().map_or(true, |dep| !pending.contains(&dep)))
            .collect();
        if ready.is_empty() {
            // A cycle cannot be built from depends_on, but never spin.
            ordered.append(&mut pending);
            break;
        }
        pending.retain(|k| !ready.contains(k));
        ordered.extend(ready);
    }
    ordered
}

impl RainParameters {
    pub fn number(&self, key: ParamKey) -> f64 {
        match key {
            ParamKey::Speed => self.speed as f64,
            ParamKey::Font => self.font as f64,
            ParamKey::LineHeight => self.line_height as f64,
            ParamKey::Density => self.density as f64,
            ParamKey::MinTrail => self.min_trail as f64,
            ParamKey::MaxTrail => self.max_trail as f64,
            ParamKey::HeadGlowMin => self.head_glow_min as f64,
            ParamKey::HeadGlowMax => self.head_glow_max as f64,
            ParamKey::GlowBlur => self.glow_blur as f64,
            ParamKey::TrailMutationSpeed => self.trail_mutation_speed as f64,
            ParamKey::FadeSpeed => self.fade_speed as f64,
            ParamKey::DecayRate => self.decay_rate as f64,
            ParamKey::Layers => self.layers as f64,
            ParamKey::EraserChance => self.eraser_chance as f64,
            ParamKey::FontFamily | ParamKey::LayerOp => f64::NAN,
        }
    }

    pub fn display_value(&self, key: ParamKey) -> String {
        match key {
            ParamKey::FontFamily => self.font_family.clone(),
            ParamKey::LayerOp => self
                .layer_op
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            _ => self.number(key).to_string(),
        }
    }

    /// Writes an already validated value. Mismatched value kinds are ignored.
    pub fn set(&mut self, key: ParamKey, value: ParamValue) {
        match (key, value) {
            (ParamKey::Speed, ParamValue::Int(v)) => self.speed = v,
            (ParamKey::Font, ParamValue::Int(v)) => self.font = v,
            (ParamKey::LineHeight, ParamValue::Float(v)) => self.line_height = v,
            (ParamKey::Density, ParamValue::Float(v)) => self.density = v,
            (ParamKey::MinTrail, ParamValue::Int(v)) => self.min_trail = v,
            (ParamKey::MaxTrail, ParamValue::Int(v)) => self.max_trail = v,
            (ParamKey::HeadGlowMin, ParamValue::Int(v)) => self.head_glow_min = v,
            (ParamKey::HeadGlowMax, ParamValue::Int(v)) => self.head_glow_max = v,
            (ParamKey::GlowBlur, ParamValue::Float(v)) => self.glow_blur = v,
            (ParamKey::TrailMutationSpeed, ParamValue::Int(v)) => self.trail_mutation_speed = v,
            (ParamKey::FadeSpeed, ParamValue::Float(v)) => self.fade_speed = v,
            (ParamKey::DecayRate, ParamValue::Float(v)) => self.decay_rate = v,
            (ParamKey::FontFamily, ParamValue::Text(v)) => self.font_family = v,
            (ParamKey::Layers, ParamValue::Int(v)) => self.layers = v,
            (ParamKey::LayerOp, ParamValue::List(v)) => self.layer_op = v,
            (ParamKey::EraserChance, ParamValue::Float(v)) => self.eraser_chance = v,
            (key, value) => {
                tracing::warn!(param = key.name(), ?value, "ignoring mismatched value kind")
            }
        }
    }
}
