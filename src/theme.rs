// Copyright (c) 2026 rezky_nightky

use crate::color::Rgb;

/// Colour strings a theme exposes to the rain and the console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemeColors {
    pub primary: &'static str,
    pub glow: &'static str,
    pub background: &'static str,
}

impl ThemeColors {
    pub fn primary_rgb(&self) -> Rgb {
        Rgb::parse_hex(self.primary).unwrap_or(Rgb::new(0, 255, 65))
    }

    pub fn glow_rgb(&self) -> Rgb {
        Rgb::parse_hex(self.glow).unwrap_or(Rgb::new(215, 255, 215))
    }

    pub fn background_rgb(&self) -> Rgb {
        Rgb::parse_hex(self.background).unwrap_or(Rgb::BLACK)
    }
}

pub trait ThemeProvider {
    fn theme_colors(&self) -> ThemeColors;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Matrix,
    Amber,
    Cyan,
    Crimson,
    Violet,
    Mono,
    Synthwave,
}

impl Theme {
    pub const ALL: [Theme; 7] = [
        Theme::Matrix,
        Theme::Amber,
        Theme::Cyan,
        Theme::Crimson,
        Theme::Violet,
        Theme::Mono,
        Theme::Synthwave,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Matrix => "matrix",
            Theme::Amber => "amber",
            Theme::Cyan => "cyan",
            Theme::Crimson => "crimson",
            Theme::Violet => "violet",
            Theme::Mono => "mono",
            Theme::Synthwave => "synthwave",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Theme::Matrix => "classic phosphor green",
            Theme::Amber => "warm monochrome amber",
            Theme::Cyan => "cold cyan glass",
            Theme::Crimson => "deep red alert",
            Theme::Violet => "ultraviolet haze",
            Theme::Mono => "plain grey on black",
            Theme::Synthwave => "pink and purple neon",
        }
    }

    pub fn from_name(name: &str) -> Option<Theme> {
        match name.trim().to_ascii_lowercase().as_str() {
            "matrix" | "green" | "default" => Some(Theme::Matrix),
            "amber" | "orange" | "retro" => Some(Theme::Amber),
            "cyan" | "blue" | "ice" => Some(Theme::Cyan),
            "crimson" | "red" => Some(Theme::Crimson),
            "violet" | "purple" => Some(Theme::Violet),
            "mono" | "grey" | "gray" | "white" => Some(Theme::Mono),
            "synthwave" | "synth" | "pink" => Some(Theme::Synthwave),
            _ => None,
        }
    }

    pub fn names() -> Vec<&'static str> {
        Theme::ALL.iter().map(|t| t.name()).collect()
    }
}

impl ThemeProvider for Theme {
    fn theme_colors(&self) -> ThemeColors {
        let (primary, glow, background) = match self {
            Theme::Matrix => ("#00ff41", "#d7ffd7", "#000000"),
            Theme::Amber => ("#ffb000", "#fff1c2", "#0d0800"),
            Theme::Cyan => ("#00e5ff", "#e0fbff", "#00080d"),
            Theme::Crimson => ("#ff2a3d", "#ffd6da", "#0d0002"),
            Theme::Violet => ("#b266ff", "#f0e0ff", "#06000d"),
            Theme::Mono => ("#c0c0c0", "#ffffff", "#000000"),
            Theme::Synthwave => ("#ff4fd8", "#ffe0fa", "#0b0014"),
        };
        ThemeColors {
            primary,
            glow,
            background,
        }
    }
}
