// Copyright (c) 2026 rezky_nightky

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::params::{ParamKey, ParamValue, RainParameters, Rule};

/// Where the value of a sibling field comes from when a cross-field rule is
/// checked: an in-flight batch first, then the active configuration.
#[derive(Clone, Copy)]
pub struct Siblings<'a> {
    active: &'a RainParameters,
    pending: Option<&'a Map<String, Value>>,
}

impl<'a> Siblings<'a> {
    pub fn new(active: &'a RainParameters, pending: Option<&'a Map<String, Value>>) -> Self {
        Self { active, pending }
    }

    #[cfg(test)]
    pub fn active_only(active: &'a RainParameters) -> Self {
        Self::new(active, None)
    }

    /// Effective numeric value of `key`. A pending value that does not coerce or
    /// falls outside its declared range is ignored in favour of the active one;
    /// its own validation reports it.
    pub fn number(&self, key: ParamKey) -> f64 {
        self.pending
            .and_then(|batch| pending_value(batch, key))
            .and_then(|raw| coerce_number(key, raw).ok())
            .map(|v| match key.rule() {
                Rule::Int { .. } => v.trunc(),
                _ => v,
            })
            .filter(|&v| in_declared_range(key, v))
            .unwrap_or_else(|| self.active.number(key))
    }
}

fn in_declared_range(key: ParamKey, v: f64) -> bool {
    match key.rule() {
        Rule::Int { min, max } | Rule::Float { min, max } => check_range(key, v, min, max).is_ok(),
        _ => true,
    }
}

fn pending_value(batch: &Map<String, Value>, key: ParamKey) -> Option<&Value> {
    batch
        .iter()
        .find(|(name, _)| ParamKey::from_name(name) == Some(key))
        .map(|(_, v)| v)
}

/// Validates and coerces a raw value for the parameter called `name`.
pub fn validate_named(
    name: &str,
    raw: &Value,
    siblings: &Siblings<'_>,
) -> Result<(ParamKey, ParamValue), ValidationError> {
    let key = resolve_key(name)?;
    validate(key, raw, siblings).map(|v| (key, v))
}

pub fn resolve_key(name: &str) -> Result<ParamKey, ValidationError> {
    if let Some(key) = ParamKey::from_name(name) {
        return Ok(key);
    }
    match name.trim().to_ascii_lowercase().as_str() {
        "basecol" | "base_col" => Err(ValidationError::NotTunable("baseCol")),
        "headcol" | "head_col" => Err(ValidationError::NotTunable("headCol")),
        _ => Err(ValidationError::UnknownParameter(name.trim().to_string())),
    }
}

pub fn validate(
    key: ParamKey,
    raw: &Value,
    siblings: &Siblings<'_>,
) -> Result<ParamValue, ValidationError> {
    match key.rule() {
        Rule::Int { min, max } => {
            let v = coerce_number(key, raw)?.trunc();
            check_range(key, v, min, max)?;
            check_bounds(key, v, siblings)?;
            Ok(ParamValue::Int(v as u32))
        }
        Rule::Float { min, max } => {
            let v = coerce_number(key, raw)?;
            check_range(key, v, min, max)?;
            Ok(ParamValue::Float(v as f32))
        }
        Rule::FontFamily => {
            let Value::String(s) = raw else {
                return Err(ValidationError::NotAString {
                    name: key.name(),
                    got: raw.to_string(),
                });
            };
            let s = s.trim();
            let allowed = |c: char| c.is_ascii_alphanumeric() || c == ',' || c == '-' || c.is_whitespace();
            if s.is_empty() || !s.chars().all(allowed) {
                return Err(ValidationError::InvalidFontFamily);
            }
            Ok(ParamValue::Text(s.to_string()))
        }
        Rule::Opacities => validate_layer_op(raw, siblings).map(ParamValue::List),
    }
}

/// Locale-independent numeric coercion: JSON numbers pass through, strings are
/// parsed after trimming.
pub fn coerce_number(key: ParamKey, raw: &Value) -> Result<f64, ValidationError> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::NotANumber {
            name: key.name(),
            got: display_raw(raw),
        }),
    }
}

fn check_range(key: ParamKey, v: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if v < min || v > max {
        return Err(ValidationError::OutOfRange {
            name: key.name(),
            got: v,
            min,
            max,
        });
    }
    Ok(())
}

/// Min/max pairs: the candidate is checked against the other field's effective value.
fn check_bounds(key: ParamKey, v: f64, siblings: &Siblings<'_>) -> Result<(), ValidationError> {
    let (min_key, min, max_key, max) = match key {
        ParamKey::MinTrail => (key, v, ParamKey::MaxTrail, siblings.number(ParamKey::MaxTrail)),
        ParamKey::MaxTrail => (ParamKey::MinTrail, siblings.number(ParamKey::MinTrail), key, v),
        ParamKey::HeadGlowMin => (
            key,
            v,
            ParamKey::HeadGlowMax,
            siblings.number(ParamKey::HeadGlowMax),
        ),
        ParamKey::HeadGlowMax => (
            ParamKey::HeadGlowMin,
            siblings.number(ParamKey::HeadGlowMin),
            key,
            v,
        ),
        _ => return Ok(()),
    };
    if min > max {
        return Err(ValidationError::MinExceedsMax {
            min_name: min_key.name(),
            min,
            max_name: max_key.name(),
            max,
        });
    }
    Ok(())
}

fn validate_layer_op(raw: &Value, siblings: &Siblings<'_>) -> Result<Vec<f32>, ValidationError> {
    let Value::Array(items) = raw else {
        return Err(ValidationError::NotAnArray {
            got: display_raw(raw),
        });
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let v = coerce_number(ParamKey::LayerOp, item).map_err(|_| ValidationError::LayerOpacity {
            index,
            got: display_raw(item),
        })?;
        if !(0.0..=1.0).contains(&v) {
            return Err(ValidationError::LayerOpacity {
                index,
                got: display_raw(item),
            });
        }
        out.push(v as f32);
    }

    let expected = siblings.number(ParamKey::Layers).max(0.0) as usize;
    if out.len() != expected {
        return Err(ValidationError::LayerCount {
            expected,
            got: out.len(),
        });
    }
    Ok(out)
}

fn display_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

/// Turns typed command text into the JSON shape the validator expects for `key`.
/// Opacity lists are comma or space separated, optionally bracketed.
pub fn raw_from_text(key: ParamKey, text: &str) -> Value {
    match key.rule() {
        Rule::Opacities => {
            let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
            Value::Array(
                inner
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(|s| match s.parse::<f64>() {
                        Ok(v) => serde_json::Number::from_f64(v)
                            .map(Value::Number)
                            .unwrap_or_else(|| Value::String(s.to_string())),
                        Err(_) => Value::String(s.to_string()),
                    })
                    .collect(),
            )
        }
        _ => Value::String(text.to_string()),
    }
}
