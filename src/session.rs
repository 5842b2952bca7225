// Copyright (c) 2026 rezky_nightky

use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::completion::{Completion, CompletionSource};
use crate::content::Content;
use crate::engine::RainControl;
use crate::history::History;
use crate::params::ParamKey;
use crate::registry::{ArgSource, CommandRegistry};
use crate::runtime::{ColorMode, TextWeight};
use crate::store::RainConfigStore;
use crate::theme::Theme;
use crate::tokenize::tokenize;

pub const PROMPT: &str = "guest@glyphfall:~$";
const SCROLLBACK_CAP: usize = 1000;

thread_local! {
    static IN_HANDLER: Cell<bool> = const { Cell::new(false) };
}

/// True while a command handler runs on this thread. Its panics are caught
/// by the dispatcher, so the panic hook must leave the terminal alone.
pub fn in_handler() -> bool {
    IN_HANDLER.with(Cell::get)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let msg = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("panicked: {msg}")
}

pub fn escape(text: &str) -> String {
    v_htmlescape::escape(text).to_string()
}

/// Drops tags and decodes the entities `escape` produces.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(c) = rest.chars().next() {
        match c {
            '<' => match rest.find('>') {
                Some(end) => rest = &rest[end + 1..],
                None => {
                    out.push_str(rest);
                    break;
                }
            },
            '&' => {
                let decoded = [
                    ("&amp;", '&'),
                    ("&lt;", '<'),
                    ("&gt;", '>'),
                    ("&quot;", '"'),
                    ("&#x27;", '\''),
                    ("&#39;", '\''),
                    ("&#x2f;", '/'),
                    ("&#x2F;", '/'),
                    ("&nbsp;", ' '),
                ]
                .into_iter()
                .find(|(entity, _)| rest.starts_with(entity));
                match decoded {
                    Some((entity, ch)) => {
                        out.push(ch);
                        rest = &rest[entity.len()..];
                    }
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                    }
                }
            }
            c => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

/// One scrollback entry: an HTML fragment and an optional wrapper class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLine {
    pub html: String,
    pub class: Option<String>,
}

impl OutputLine {
    pub fn text(&self) -> String {
        html_to_text(&self.html)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class.as_deref() == Some(class)
    }
}

#[derive(Clone, Debug)]
pub struct Scrollback {
    lines: VecDeque<OutputLine>,
    cap: usize,
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::with_capacity(SCROLLBACK_CAP)
    }
}

impl Scrollback {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, html: impl Into<String>, class: Option<&str>) {
        if self.lines.len() == self.cap {
            self.lines.pop_front();
        }
        self.lines.push_back(OutputLine {
            html: html.into(),
            class: class.map(str::to_string),
        });
    }

    pub fn push_class(&mut self, html: impl Into<String>, class: &str) {
        self.push(html, Some(class));
    }

    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &OutputLine> + ExactSizeIterator {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// How the console panel is shown over the rain.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsoleDisplay {
    pub visible: bool,
    pub width_pct: u8,
    pub height_pct: u8,
    pub opacity: f32,
    pub weight: TextWeight,
    pub theme: Theme,
    /// 0 is calm; above 0 the renderer scrambles that share of panel cells.
    pub glitch: f32,
    /// Lines scrolled back from the newest output.
    pub scroll: usize,
}

impl ConsoleDisplay {
    pub const MIN_PCT: u8 = 20;
    pub const MAX_PCT: u8 = 100;
    pub const DEFAULT_WIDTH_PCT: u8 = 80;
    pub const DEFAULT_HEIGHT_PCT: u8 = 70;
    pub const MIN_OPACITY: f32 = 0.1;

    pub fn toggle_visible(&mut self) {
        self.visible = !self.visible;
    }

    pub fn reset_size(&mut self) {
        self.width_pct = Self::DEFAULT_WIDTH_PCT;
        self.height_pct = Self::DEFAULT_HEIGHT_PCT;
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self {
            visible: true,
            width_pct: Self::DEFAULT_WIDTH_PCT,
            height_pct: Self::DEFAULT_HEIGHT_PCT,
            opacity: 0.85,
            weight: TextWeight::Normal,
            theme: Theme::Matrix,
            glitch: 0.0,
            scroll: 0,
        }
    }
}

/// Static facts the `info` command reports.
#[derive(Clone, Debug)]
pub struct RuntimeInfo {
    pub version: &'static str,
    pub build: String,
    pub git_sha: String,
    pub color_mode: ColorMode,
    pub fps: u32,
}

impl Default for RuntimeInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build: String::from("unknown"),
            git_sha: String::from("unknown"),
            color_mode: ColorMode::Mono,
            fps: 60,
        }
    }
}

/// Work a command left running; polled until it reports completion.
pub trait PendingEffect {
    fn poll(&mut self, now: Instant, display: &mut ConsoleDisplay, out: &mut Scrollback) -> bool;
}

pub enum Outcome {
    Done,
    Pending(Box<dyn PendingEffect>),
    Quit,
}

/// Everything a handler may touch. Fields are the whole capability set.
pub struct CommandContext<'a> {
    pub out: &'a mut Scrollback,
    pub rain: &'a mut dyn RainControl,
    pub display: &'a mut ConsoleDisplay,
    pub content: &'a Content,
    pub history: &'a [String],
    pub registry: &'a CommandRegistry,
    pub info: &'a RuntimeInfo,
    pub now: Instant,
}

impl CommandContext<'_> {
    pub fn html(&mut self, html: impl Into<String>) {
        self.out.push(html, None);
    }

    pub fn html_class(&mut self, html: impl Into<String>, class: &str) {
        self.out.push_class(html, class);
    }

    pub fn text(&mut self, text: &str) {
        self.out.push(escape(text), None);
    }

    pub fn error(&mut self, text: &str) {
        self.out.push_class(escape(text), "error");
    }

    pub fn hint(&mut self, text: &str) {
        self.out.push_class(escape(text), "hint");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKey {
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Up,
    Down,
    Tab,
    Enter,
    PageUp,
    PageDown,
    ClearLine,
}

struct Candidates<'a> {
    registry: &'a CommandRegistry,
    store: &'a RainConfigStore,
    content: &'a Content,
}

impl CompletionSource for Candidates<'_> {
    fn command_names(&self) -> Vec<String> {
        self.registry.names().map(String::from).collect()
    }

    fn argument_candidates(&self, command: &str) -> Option<Vec<String>> {
        let spec = self.registry.get(command)?;
        let mut out: Vec<String> = match spec.args {
            ArgSource::None => Vec::new(),
            ArgSource::Static(list) => list.iter().map(|s| s.to_string()).collect(),
            ArgSource::Themes => Theme::names().into_iter().map(String::from).collect(),
            ArgSource::Presets => self.store.preset_names(),
            ArgSource::Params => ParamKey::ALL.iter().map(|k| k.name().to_string()).collect(),
            ArgSource::ManPages => self.content.man.keys().cloned().collect(),
            ArgSource::SkillPaths => self.content.skill_paths(),
        };
        if matches!(spec.args, ArgSource::Themes | ArgSource::Presets) {
            out.push("list".to_string());
        }
        Some(out)
    }
}

/// The console's input state machine: line editing, history, completion,
/// dispatch and the queue of lines typed while an effect is pending.
pub struct Session {
    registry: CommandRegistry,
    content: Content,
    info: RuntimeInfo,
    history: History,
    completion: Completion,
    scrollback: Scrollback,
    display: ConsoleDisplay,
    input: String,
    cursor: usize,
    pending: Option<Box<dyn PendingEffect>>,
    queued: VecDeque<String>,
    quit: bool,
}

impl Session {
    pub fn new(
        registry: CommandRegistry,
        content: Content,
        display: ConsoleDisplay,
        info: RuntimeInfo,
    ) -> Self {
        Self {
            registry,
            content,
            info,
            history: History::new(),
            completion: Completion::default(),
            scrollback: Scrollback::default(),
            display,
            input: String::new(),
            cursor: 0,
            pending: None,
            queued: VecDeque::new(),
            quit: false,
        }
    }

    pub fn display(&self) -> &ConsoleDisplay {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut ConsoleDisplay {
        &mut self.display
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Cursor position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn greet(&mut self) {
        self.scrollback
            .push_class(format!("glyphfall {}", escape(self.info.version)), "hint");
        self.scrollback
            .push_class("Type 'help' for commands. Tab completes, F2 hides the console.", "hint");
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn set_input(&mut self, line: String) {
        self.cursor = line.chars().count();
        self.input = line;
    }

    pub fn handle_key(&mut self, key: InputKey, rain: &mut dyn RainControl, now: Instant) {
        if !self.display.visible {
            return;
        }
        match key {
            InputKey::Tab => {
                let source = Candidates {
                    registry: &self.registry,
                    store: rain.store(),
                    content: &self.content,
                };
                if let Some(line) = self.completion.on_tab(&self.input, &source) {
                    self.set_input(line);
                }
                return;
            }
            InputKey::Enter | InputKey::Up | InputKey::Down => self.completion.clear(),
            _ => self.completion.pause(),
        }

        match key {
            InputKey::Char(c) => {
                let at = self.byte_at(self.cursor);
                self.input.insert(at, c);
                self.cursor += 1;
            }
            InputKey::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_at(self.cursor);
                    self.input.remove(at);
                }
            }
            InputKey::Delete => {
                if self.cursor < self.input.chars().count() {
                    let at = self.byte_at(self.cursor);
                    self.input.remove(at);
                }
            }
            InputKey::Left => self.cursor = self.cursor.saturating_sub(1),
            InputKey::Right => self.cursor = (self.cursor + 1).min(self.input.chars().count()),
            InputKey::Home => self.cursor = 0,
            InputKey::End => self.cursor = self.input.chars().count(),
            InputKey::ClearLine => self.set_input(String::new()),
            InputKey::Up => {
                if let Some(entry) = self.history.prev() {
                    let entry = entry.to_string();
                    self.set_input(entry);
                }
            }
            InputKey::Down => {
                let entry = self.history.next().to_string();
                self.set_input(entry);
            }
            InputKey::PageUp => {
                self.display.scroll = (self.display.scroll + 5).min(self.scrollback.len());
            }
            InputKey::PageDown => self.display.scroll = self.display.scroll.saturating_sub(5),
            InputKey::Enter => {
                let line = std::mem::take(&mut self.input);
                self.cursor = 0;
                self.submit(&line, rain, now);
            }
            InputKey::Tab => {}
        }
    }

    /// Records the line, then runs it now or queues it behind a pending effect.
    pub fn submit(&mut self, line: &str, rain: &mut dyn RainControl, now: Instant) {
        self.history.push(line);
        if self.pending.is_some() {
            self.queued.push_back(line.to_string());
            return;
        }
        self.dispatch(line, rain, now);
    }

    fn dispatch(&mut self, line: &str, rain: &mut dyn RainControl, now: Instant) {
        self.display.scroll = 0;
        self.scrollback.push_class(
            format!("<span class=\"prompt\">{PROMPT}</span> {}", escape(line)),
            "command-echo",
        );

        let tokens = tokenize(line);
        let Some((name, args)) = tokens.split_first() else {
            return;
        };
        let name = name.to_lowercase();
        let Some(spec) = self.registry.get(&name).copied() else {
            self.scrollback
                .push_class(format!("command not found: {}", escape(&name)), "error");
            let first = name.chars().next();
            let hint = match self
                .registry
                .names()
                .find(|n| first.is_some_and(|f| n.starts_with(f)))
            {
                Some(close) => format!("Type 'help' to list commands. Did you mean '{close}'?"),
                None => "Type 'help' to list commands.".to_string(),
            };
            self.scrollback.push_class(escape(&hint), "hint");
            return;
        };

        let mut ctx = CommandContext {
            out: &mut self.scrollback,
            rain: &mut *rain,
            display: &mut self.display,
            content: &self.content,
            history: self.history.entries(),
            registry: &self.registry,
            info: &self.info,
            now,
        };
        IN_HANDLER.with(|f| f.set(true));
        let result = panic::catch_unwind(AssertUnwindSafe(|| (spec.handler)(args, &mut ctx)));
        IN_HANDLER.with(|f| f.set(false));
        let failure = match result {
            Ok(Ok(Outcome::Done)) => None,
            Ok(Ok(Outcome::Pending(effect))) => {
                self.pending = Some(effect);
                None
            }
            Ok(Ok(Outcome::Quit)) => {
                self.quit = true;
                None
            }
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        if let Some(error) = failure {
            tracing::error!(command = %name, %error, "command failed");
            self.scrollback.push_class(
                format!("command error: '{}' failed unexpectedly.", escape(&name)),
                "error",
            );
        }
    }

    /// Drives a pending effect; once it completes, queued lines run in order.
    pub fn poll(&mut self, rain: &mut dyn RainControl, now: Instant) {
        if let Some(effect) = self.pending.as_mut() {
            if !effect.poll(now, &mut self.display, &mut self.scrollback) {
                return;
            }
            self.pending = None;
        }
        while self.pending.is_none() && !self.quit {
            let Some(line) = self.queued.pop_front() else {
                break;
            };
            self.dispatch(&line, rain, now);
        }
    }
}
