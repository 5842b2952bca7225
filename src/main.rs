// Copyright (c) 2026 rezky_nightky

mod canvas;
mod cell;
mod color;
mod commands;
mod completion;
mod config;
mod content;
mod effects;
mod engine;
mod error;
mod frame;
mod glyphs;
mod history;
mod logging;
mod params;
mod registry;
mod render;
mod runtime;
mod session;
mod store;
mod stream;
mod terminal;
mod theme;
mod tokenize;
mod validate;

use std::env;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::thread;

use clap::builder::styling::{AnsiColor as ClapAnsiColor, Color as ClapColor};
use clap::builder::styling::{Effects as ClapEffects, Style as ClapStyle};
use clap::builder::Styles as ClapStyles;
use clap::{CommandFactory, FromArgMatches};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[cfg(unix)]
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::canvas::CellCanvas;
use crate::config::{
    color_enabled_stdout, print_list_charsets, print_list_presets, print_list_themes,
    usage_for_help, Args,
};
use crate::content::Content;
use crate::engine::{RainControl, RainEngine};
use crate::frame::Frame;
use crate::registry::CommandRegistry;
use crate::render::Renderer;
use crate::session::{ConsoleDisplay, InputKey, RuntimeInfo, Session};
use crate::store::{RainBundle, RainConfigStore};
use crate::terminal::{restore_terminal_best_effort, Terminal};
use crate::tokenize::quote;

const HELP_TEMPLATE_PLAIN: &str = "\
{before-help}{about-with-newline}
USAGE:
  {usage}

{all-args}{after-help}";

const HELP_TEMPLATE_COLOR: &str = "\
{before-help}{about-with-newline}
\x1b[1;36mUSAGE:\x1b[0m
  {usage}

{all-args}{after-help}";

fn build_info() -> &'static str {
    env!("GLYPHFALL_BUILD")
}

fn git_sha() -> &'static str {
    match env!("GLYPHFALL_GIT_SHA") {
        "" => "unknown",
        sha => sha,
    }
}

fn clap_styles() -> ClapStyles {
    ClapStyles::styled()
        .header(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Cyan))),
        )
        .usage(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Green))),
        )
        .literal(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Yellow))))
        .placeholder(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Magenta))))
}

fn exit_with(msg: &str) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

/// What a key press means to the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeyAction {
    Input(InputKey),
    ToggleConsole,
    Quit,
}

fn map_key(k: KeyEvent) -> Option<KeyAction> {
    if k.modifiers.contains(KeyModifiers::CONTROL) {
        return match k.code {
            KeyCode::Char('c') | KeyCode::Char('d') => Some(KeyAction::Quit),
            KeyCode::Char('u') => Some(KeyAction::Input(InputKey::ClearLine)),
            KeyCode::Char('a') => Some(KeyAction::Input(InputKey::Home)),
            KeyCode::Char('e') => Some(KeyAction::Input(InputKey::End)),
            _ => None,
        };
    }
    let key = match k.code {
        KeyCode::F(2) => return Some(KeyAction::ToggleConsole),
        KeyCode::Char(c) => InputKey::Char(c),
        KeyCode::Backspace => InputKey::Backspace,
        KeyCode::Delete => InputKey::Delete,
        KeyCode::Left => InputKey::Left,
        KeyCode::Right => InputKey::Right,
        KeyCode::Home => InputKey::Home,
        KeyCode::End => InputKey::End,
        KeyCode::Up => InputKey::Up,
        KeyCode::Down => InputKey::Down,
        KeyCode::Tab => InputKey::Tab,
        KeyCode::Enter => InputKey::Enter,
        KeyCode::PageUp => InputKey::PageUp,
        KeyCode::PageDown => InputKey::PageDown,
        KeyCode::Esc => InputKey::ClearLine,
        _ => return None,
    };
    Some(KeyAction::Input(key))
}

fn main() -> std::io::Result<()> {
    std::panic::set_hook(Box::new(|info| {
        // The dispatcher reports handler panics in the console and carries on.
        if session::in_handler() {
            tracing::error!(panic = %info, "command handler panicked");
            return;
        }
        restore_terminal_best_effort();
        eprintln!("{}", info);
    }));

    #[cfg(unix)]
    {
        if let Ok(mut signals) = Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            thread::spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    restore_terminal_best_effort();
                    std::process::exit(128 + sig);
                }
            });
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = ctrlc::set_handler(|| {
            restore_terminal_best_effort();
            std::process::exit(130);
        }) {
            eprintln!("failed to install Ctrl-C handler: {}", e);
        }
    }

    let mut cmd = Args::command();
    cmd = cmd.styles(clap_styles());
    cmd = cmd.after_help(usage_for_help());
    let help_template = if color_enabled_stdout() {
        HELP_TEMPLATE_COLOR
    } else {
        HELP_TEMPLATE_PLAIN
    };
    cmd = cmd.help_template(help_template);
    cmd.build();
    if cmd.get_arguments().any(|a| a.get_id().as_str() == "help") {
        cmd = cmd.mut_arg("help", |a| a.help_heading("HELP"));
    }

    let matches = cmd.get_matches_from(env::args_os());
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.info {
        println!("Version: v{}", env!("CARGO_PKG_VERSION"));
        println!("Build: {}", build_info());
        println!("Commit: {}", git_sha());
        println!("Copyright: (c) 2026 {}", env!("CARGO_PKG_AUTHORS"));
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        println!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
        return Ok(());
    }

    if args.list_themes {
        print_list_themes();
        return Ok(());
    }

    if args.list_charsets {
        print_list_charsets();
        return Ok(());
    }

    if let Err(e) = args.validate() {
        exit_with(&e);
    }

    match logging::init(args.log_file.as_deref()) {
        Ok(true) => tracing::info!(version = env!("CARGO_PKG_VERSION"), "glyphfall starting"),
        Ok(false) => {}
        Err(e) => eprintln!("failed to open log file: {e}"),
    }

    let store = RainConfigStore::new(RainBundle::load(args.rain_config.as_deref()));
    if args.list_presets {
        print_list_presets(&store);
        return Ok(());
    }

    let glyph_override = match args.charset.as_deref().map(glyphs::charset_from_str) {
        Some(Ok(cs)) => Some(glyphs::build_chars(cs)),
        Some(Err(e)) => exit_with(&e),
        None => None,
    };
    let theme = args.theme().unwrap_or_else(|e| exit_with(&e));
    let color_mode = args.color_mode().unwrap_or_else(|e| exit_with(&e));
    let content = Content::load(args.content.as_deref());

    let mut term = Terminal::new()?;
    let (w, h) = term.size()?;

    let canvas = (!args.no_rain).then(|| CellCanvas::new(w, h));
    let mut engine = RainEngine::new(canvas, store, args.seed);
    if let Some(glyphs) = glyph_override {
        engine.set_glyphs(glyphs);
    }
    engine.start(&theme);

    let info = RuntimeInfo {
        version: env!("CARGO_PKG_VERSION"),
        build: build_info().to_string(),
        git_sha: git_sha().to_string(),
        color_mode,
        fps: args.fps,
    };
    let display = ConsoleDisplay {
        theme,
        ..ConsoleDisplay::default()
    };
    let mut session = Session::new(
        CommandRegistry::new(commands::builtin()),
        content,
        display,
        info,
    );
    session.greet();

    let startup = args
        .preset
        .iter()
        .map(|p| format!("rainpreset {}", quote(p)))
        .chain(args.exec.iter().cloned());
    for line in startup {
        session.submit(&line, &mut engine, Instant::now());
    }

    let mut frame = Frame::new(w, h, None);
    let mut renderer = Renderer::new(color_mode, args.seed);
    let frame_period = Duration::from_secs_f64(1.0 / args.fps as f64);
    let mut next_frame = Instant::now();
    let mut quit = false;

    while !quit && !session.should_quit() {
        let mut pending_resize: Option<(u16, u16)> = None;

        loop {
            while Terminal::poll_event(Duration::from_millis(0))? {
                match Terminal::read_event()? {
                    Event::Resize(nw, nh) => pending_resize = Some((nw, nh)),
                    Event::Key(k) if k.kind == KeyEventKind::Press => match map_key(k) {
                        Some(KeyAction::Quit) => quit = true,
                        Some(KeyAction::ToggleConsole) => session.display_mut().toggle_visible(),
                        Some(KeyAction::Input(key)) => {
                            session.handle_key(key, &mut engine, Instant::now())
                        }
                        None => {}
                    },
                    _ => {}
                }
            }

            if quit || session.should_quit() || pending_resize.is_some() {
                break;
            }
            let now = Instant::now();
            if now >= next_frame {
                break;
            }
            let _ = Terminal::poll_event(next_frame - now)?;
        }

        if quit || session.should_quit() {
            break;
        }

        if let Some((nw, nh)) = pending_resize {
            let (pw, ph) = CellCanvas::px_for_cells(nw, nh);
            engine.resize(pw, ph);
            frame.resize(nw, nh);
            frame.mark_all_dirty();
        }

        let now = Instant::now();
        engine.on_frame(now);
        session.poll(&mut engine, now);
        renderer.compose(&mut frame, engine.canvas(), &session);
        if frame.is_dirty_all() || !frame.dirty_indices().is_empty() {
            term.draw(&mut frame)?;
        }

        next_frame += frame_period;
        let now = Instant::now();
        if now > next_frame {
            next_frame = now;
        }
    }

    tracing::info!("glyphfall exiting");
    Ok(())
}
