// Copyright (c) 2026 rezky_nightky

use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;

use crate::glyphs::CHARSET_NAMES;
use crate::runtime::ColorMode;
use crate::store::RainConfigStore;
use crate::theme::Theme;

pub const USAGE_EXAMPLE: &str = "EXAMPLE:\n  glyphfall --theme amber --preset storm -e whoami -e skills";

pub fn color_enabled_stdout() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if matches!(env::var("CLICOLOR").ok().as_deref(), Some("0")) {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn heading(text: &str) {
    if color_enabled_stdout() {
        println!("\x1b[1;36m{text}\x1b[0m");
    } else {
        println!("{text}");
    }
}

fn note(text: &str) {
    if color_enabled_stdout() {
        println!("\x1b[2m{text}\x1b[0m");
    } else {
        println!("{text}");
    }
}

pub fn usage_for_help() -> String {
    if !color_enabled_stdout() {
        return USAGE_EXAMPLE.to_string();
    }
    USAGE_EXAMPLE
        .replacen("EXAMPLE:", "\x1b[1;36mEXAMPLE:\x1b[0m", 1)
        .replacen("  glyphfall", "  \x1b[1;34mglyphfall\x1b[0m", 1)
}

#[derive(Parser, Debug, Clone)]
#[command(name = "glyphfall", version, about, disable_version_flag = true)]
pub struct Args {
    #[arg(
        short = 'f',
        long = "fps",
        default_value_t = 60,
        help_heading = "GENERAL",
        help = "Frame callback rate (min 1 max 240)"
    )]
    pub fps: u32,

    #[arg(
        short = 'e',
        long = "exec",
        value_name = "CMD",
        help_heading = "GENERAL",
        help = "Run a console command at startup (repeatable, runs in order)"
    )]
    pub exec: Vec<String>,

    #[arg(
        long = "seed",
        help_heading = "GENERAL",
        help = "Seed the rain's random source for a repeatable run"
    )]
    pub seed: Option<u64>,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        help_heading = "GENERAL",
        help = "Write logs to PATH (filter with RUST_LOG)"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long = "rain-config",
        value_name = "PATH",
        help_heading = "RAIN",
        help = "Rain bundle JSON (defaultConfig, glyphs, presets); falls back to the built-in one"
    )]
    pub rain_config: Option<PathBuf>,

    #[arg(
        long = "preset",
        help_heading = "RAIN",
        help = "Preset applied at startup (see --list-presets)"
    )]
    pub preset: Option<String>,

    #[arg(
        long = "charset",
        help_heading = "RAIN",
        help = "Replace the glyph alphabet with a named charset (see --list-charsets)"
    )]
    pub charset: Option<String>,

    #[arg(
        long = "no-rain",
        help_heading = "RAIN",
        help = "Run without a rain surface"
    )]
    pub no_rain: bool,

    #[arg(
        long = "theme",
        default_value = "matrix",
        help_heading = "APPEARANCE",
        help = "Colour theme (see --list-themes)"
    )]
    pub theme: String,

    #[arg(
        long = "colormode",
        help_heading = "APPEARANCE",
        help = "Force colour mode (allowed: 0,16,256,24). Default: 24-bit if COLORTERM says so, else 256-color"
    )]
    pub colormode: Option<u16>,

    #[arg(
        long = "content",
        value_name = "PATH",
        help_heading = "CONSOLE",
        help = "Portfolio content JSON; falls back to the built-in one"
    )]
    pub content: Option<PathBuf>,

    #[arg(
        long = "list-presets",
        help_heading = "HELP",
        help = "List rain presets and exit"
    )]
    pub list_presets: bool,

    #[arg(
        long = "list-themes",
        help_heading = "HELP",
        help = "List colour themes and exit"
    )]
    pub list_themes: bool,

    #[arg(
        long = "list-charsets",
        help_heading = "HELP",
        help = "List charsets and exit"
    )]
    pub list_charsets: bool,

    #[arg(
        long = "info",
        short = 'i',
        help_heading = "HELP",
        help = "Print version info and exit"
    )]
    pub info: bool,

    #[arg(
        long = "version",
        short = 'v',
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

impl Args {
    /// Checks what clap cannot, in the order a user reads the flags.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=240).contains(&self.fps) {
            return Err(format!("failed to apply --fps {} (min 1 max 240)", self.fps));
        }
        self.color_mode_override()?;
        self.theme()?;
        Ok(())
    }

    pub fn theme(&self) -> Result<Theme, String> {
        Theme::from_name(&self.theme).ok_or_else(|| {
            format!(
                "invalid theme: {} (available: {})",
                self.theme,
                Theme::names().join(", ")
            )
        })
    }

    pub fn color_mode_override(&self) -> Result<Option<ColorMode>, String> {
        let Some(m) = self.colormode else {
            return Ok(None);
        };
        match m {
            0 => Ok(Some(ColorMode::Mono)),
            16 => Ok(Some(ColorMode::Color16)),
            8 | 256 => Ok(Some(ColorMode::Color256)),
            24 | 32 => Ok(Some(ColorMode::TrueColor)),
            _ => Err(format!("invalid --colormode: {m} (allowed: 0,16,256,24)")),
        }
    }

    pub fn color_mode(&self) -> Result<ColorMode, String> {
        Ok(self
            .color_mode_override()?
            .unwrap_or_else(|| detect_color_mode(env_var("COLORTERM"), env_var("TERM"))))
    }
}

fn env_var(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

pub fn detect_color_mode(colorterm: String, term: String) -> ColorMode {
    let colorterm = colorterm.to_ascii_lowercase();
    if colorterm.contains("truecolor") || colorterm.contains("24bit") {
        return ColorMode::TrueColor;
    }
    let term = term.to_ascii_lowercase();
    if term == "dumb" {
        return ColorMode::Mono;
    }
    if term.contains("256color") {
        return ColorMode::Color256;
    }
    if term == "linux" || term.starts_with("vt") {
        return ColorMode::Color16;
    }
    ColorMode::Color256
}

pub fn print_list_presets(store: &RainConfigStore) {
    heading("AVAILABLE RAIN PRESETS:");
    note("NOTE: Use only the VALUE (left side) with --preset or `rainpreset`.");
    println!();
    println!("VALUE        DESCRIPTION");
    for (name, preset) in store.get_presets() {
        println!("{name:<12} {}", preset.description());
    }
}

pub fn print_list_themes() {
    heading("AVAILABLE THEMES:");
    note("NOTE: Use only the VALUE (left side) with --theme or `theme`.");
    println!();
    println!("VALUE        DESCRIPTION");
    for t in Theme::ALL {
        println!("{:<12} {}", t.name(), t.description());
    }
}

pub fn print_list_charsets() {
    heading("AVAILABLE CHARSETS:");
    note("NOTE: Use only the VALUE (left side) with --charset.");
    println!();
    println!("VALUE        DESCRIPTION");
    for (name, desc) in CHARSET_NAMES {
        println!("{name:<12} {desc}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("glyphfall").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let a = parse(&[]);
        assert_eq!(a.fps, 60);
        assert_eq!(a.theme().unwrap(), Theme::Matrix);
        assert!(a.exec.is_empty());
        assert!(a.validate().is_ok());
    }

    #[test]
    fn exec_is_repeatable_and_ordered() {
        let a = parse(&["-e", "whoami", "--exec", "rainpreset storm", "-e", "skills"]);
        assert_eq!(a.exec, ["whoami", "rainpreset storm", "skills"]);
    }

    #[test]
    fn out_of_range_and_unknown_values_are_rejected() {
        assert!(parse(&["--fps", "0"]).validate().is_err());
        assert!(parse(&["--fps", "241"]).validate().is_err());
        assert!(parse(&["--fps", "240"]).validate().is_ok());
        let err = parse(&["--theme", "plaid"]).validate().unwrap_err();
        assert!(err.contains("matrix"));
        assert!(parse(&["--colormode", "7"]).validate().is_err());
    }

    #[test]
    fn colormode_override_wins() {
        assert_eq!(parse(&["--colormode", "0"]).color_mode().unwrap(), ColorMode::Mono);
        assert_eq!(parse(&["--colormode", "16"]).color_mode().unwrap(), ColorMode::Color16);
        assert_eq!(parse(&["--colormode", "256"]).color_mode().unwrap(), ColorMode::Color256);
        assert_eq!(parse(&["--colormode", "24"]).color_mode().unwrap(), ColorMode::TrueColor);
    }

    #[test]
    fn color_mode_detection_reads_colorterm_then_term() {
        let d = |ct: &str, t: &str| detect_color_mode(ct.to_string(), t.to_string());
        assert_eq!(d("truecolor", "xterm"), ColorMode::TrueColor);
        assert_eq!(d("", "xterm-256color"), ColorMode::Color256);
        assert_eq!(d("", "dumb"), ColorMode::Mono);
        assert_eq!(d("", "linux"), ColorMode::Color16);
        assert_eq!(d("", ""), ColorMode::Color256);
    }
}
