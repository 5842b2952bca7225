// Copyright (c) 2026 rezky_nightky

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Mono,
    Color16,
    Color256,
    TrueColor,
}

impl ColorMode {
    pub fn label(self) -> &'static str {
        match self {
            ColorMode::TrueColor => "24-bit truecolor",
            ColorMode::Color256 => "8-bit (256-color)",
            ColorMode::Color16 => "16-color",
            ColorMode::Mono => "mono",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextWeight {
    #[default]
    Normal,
    Bold,
    Dim,
}

impl TextWeight {
    pub const NAMES: &'static [&'static str] = &["normal", "bold", "dim"];

    pub fn from_name(s: &str) -> Option<TextWeight> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "regular" => Some(TextWeight::Normal),
            "bold" | "bright" => Some(TextWeight::Bold),
            "dim" | "faint" => Some(TextWeight::Dim),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextWeight::Normal => "normal",
            TextWeight::Bold => "bold",
            TextWeight::Dim => "dim",
        }
    }
}
