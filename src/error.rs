// Copyright (c) 2026 rezky_nightky

use std::path::PathBuf;

use thiserror::Error;

/// Rejection reasons for a single rain parameter. The messages are shown to the
/// user verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown parameter '{0}' (see 'rainconfig' for tunable names)")]
    UnknownParameter(String),

    #[error("'{0}' follows the active theme and cannot be set directly (use 'theme')")]
    NotTunable(&'static str),

    #[error("{name} must be a number (got {got})")]
    NotANumber { name: &'static str, got: String },

    #[error("{name} must be between {min} and {max} (got {got})")]
    OutOfRange {
        name: &'static str,
        got: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be text (got {got})")]
    NotAString { name: &'static str, got: String },

    #[error("fontFamily may only contain letters, digits, spaces, commas and hyphens")]
    InvalidFontFamily,

    #[error("layerOp must be a list of opacities, e.g. 1,0.5,0.2 (got {got})")]
    NotAnArray { got: String },

    #[error("layerOp[{index}] must be a number between 0 and 1 (got {got})")]
    LayerOpacity { index: usize, got: String },

    #[error("layerOp needs exactly {expected} value(s), one per layer (got {got})")]
    LayerCount { expected: usize, got: usize },

    #[error("{min_name} ({min}) cannot exceed {max_name} ({max})")]
    MinExceedsMax {
        min_name: &'static str,
        min: f64,
        max_name: &'static str,
        max: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RainError {
    #[error("unknown preset '{name}'. Available: {available}")]
    UnknownPreset { name: String, available: String },
}

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}
