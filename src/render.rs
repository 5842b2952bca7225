// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use unicode_width::UnicodeWidthChar;

use crate::canvas::CellCanvas;
use crate::cell::{Cell, CONTINUATION};
use crate::color::Rgb;
use crate::completion::CompletionMode;
use crate::frame::Frame;
use crate::runtime::{ColorMode, TextWeight};
use crate::session::{ConsoleDisplay, Session, PROMPT};
use crate::theme::ThemeProvider;

const ERROR_RGB: Rgb = Rgb::new(255, 85, 85);
const GLITCH_CHARS: &[char] = &['#', '%', '&', '@', '$', '*', '!', '?', '/', '\\', '|', '<', '>'];
const TAB_WIDTH: usize = 4;
const MIN_PANEL_W: u16 = 12;
const MIN_PANEL_H: u16 = 4;

/// Console panel placement in cells, border included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

/// Centers the panel at the display's percentages; `None` when hidden or too small.
pub fn panel_rect(cols: u16, rows: u16, display: &ConsoleDisplay) -> Option<Rect> {
    if !display.visible {
        return None;
    }
    let scale = |total: u16, pct: u8| {
        let pct = pct.clamp(ConsoleDisplay::MIN_PCT, ConsoleDisplay::MAX_PCT) as u32;
        (total as u32 * pct / 100) as u16
    };
    let w = scale(cols, display.width_pct);
    let h = scale(rows, display.height_pct);
    if w < MIN_PANEL_W || h < MIN_PANEL_H {
        return None;
    }
    Some(Rect {
        x: (cols - w) / 2,
        y: (rows - h) / 2,
        w,
        h,
    })
}

/// Breaks `text` into rows no wider than `width` display columns.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(2);
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let mut row = String::new();
        let mut used = 0;
        for ch in line.chars() {
            if ch == '\t' {
                let pad = TAB_WIDTH - used % TAB_WIDTH;
                for _ in 0..pad {
                    if used == width {
                        rows.push(std::mem::take(&mut row));
                        used = 0;
                    }
                    row.push(' ');
                    used += 1;
                }
                continue;
            }
            let w = ch.width().unwrap_or(0);
            if used + w > width {
                rows.push(std::mem::take(&mut row));
                used = 0;
            }
            row.push(ch);
            used += w;
        }
        rows.push(row);
    }
    rows
}

#[derive(Clone, Copy)]
struct Pen {
    fg: Option<Color>,
    bg: Option<Color>,
    weight: TextWeight,
}

impl Pen {
    fn cell(self, ch: char) -> Cell {
        Cell {
            ch,
            fg: self.fg,
            bg: self.bg,
            weight: self.weight,
        }
    }
}

/// Composes the rain surface and the console panel into a [`Frame`].
pub struct Renderer {
    color_mode: ColorMode,
    rng: StdRng,
}

impl Renderer {
    pub fn new(color_mode: ColorMode, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self { color_mode, rng }
    }

    fn color(&self, rgb: Rgb) -> Option<Color> {
        rgb.to_color(self.color_mode)
    }

    pub fn compose(&mut self, frame: &mut Frame, rain: Option<&CellCanvas>, session: &Session) {
        let display = session.display();
        let colors = display.theme.theme_colors();
        let background = rain.map_or(colors.background_rgb(), CellCanvas::background);

        self.compose_rain(frame, rain, background);

        let Some(rect) = panel_rect(frame.width, frame.height, display) else {
            return;
        };
        self.compose_panel(frame, rain, session, rect);
        if display.glitch > 0.0 {
            self.scramble(frame, rect, display.glitch, colors.glow_rgb());
        }
    }

    fn compose_rain(&self, frame: &mut Frame, rain: Option<&CellCanvas>, background: Rgb) {
        let bg = self.color(background);
        let (width, height) = (frame.width, frame.height);
        for y in 0..height {
            let mut x = 0;
            while x < width {
                let resolved = rain.and_then(|c| c.resolve(x, y));
                let Some((ch, rgb, glow)) = resolved else {
                    frame.set(x, y, Cell::blank_with_bg(bg));
                    x += 1;
                    continue;
                };
                let pen = Pen {
                    fg: self.color(rgb),
                    bg,
                    weight: if glow {
                        TextWeight::Bold
                    } else {
                        TextWeight::Normal
                    },
                };
                x = put_char(frame, x, y, width, ch, pen);
            }
        }
    }

    fn compose_panel(
        &self,
        frame: &mut Frame,
        rain: Option<&CellCanvas>,
        session: &Session,
        rect: Rect,
    ) {
        let display = session.display();
        let colors = display.theme.theme_colors();
        let primary = colors.primary_rgb();
        let glow = colors.glow_rgb();
        let background = colors.background_rgb();
        let bg = self.color(background);

        let border = Pen {
            fg: self.color(primary),
            bg,
            weight: TextWeight::Normal,
        };
        let right = rect.x + rect.w - 1;
        let bottom = rect.y + rect.h - 1;
        for x in rect.x..=right {
            let (top_ch, bottom_ch) = match x {
                _ if x == rect.x => ('┌', '└'),
                _ if x == right => ('┐', '┘'),
                _ => ('─', '─'),
            };
            frame.set(x, rect.y, border.cell(top_ch));
            frame.set(x, bottom, border.cell(bottom_ch));
        }
        for y in rect.y + 1..bottom {
            frame.set(rect.x, y, border.cell('│'));
            frame.set(right, y, border.cell('│'));
        }
        put_text(frame, rect.x + 2, rect.y, right, " glyphfall ", border);

        // Interior: the rain shows through, faded by the panel opacity.
        let show_through = (1.0 - display.opacity).clamp(0.0, 1.0);
        for y in rect.y + 1..bottom {
            let mut x = rect.x + 1;
            while x < right {
                let seen = rain
                    .filter(|_| show_through > 0.0)
                    .and_then(|c| c.resolve(x, y));
                match seen {
                    Some((ch, rgb, _)) => {
                        let pen = Pen {
                            fg: self.color(background.lerp(rgb, show_through)),
                            bg,
                            weight: TextWeight::Dim,
                        };
                        x = put_char(frame, x, y, right, ch, pen);
                    }
                    None => {
                        frame.set(x, y, Cell::blank_with_bg(bg));
                        x += 1;
                    }
                }
            }
        }

        let inner = Rect {
            x: rect.x + 1,
            y: rect.y + 1,
            w: rect.w - 2,
            h: rect.h - 2,
        };
        let text_pen = |rgb: Rgb, weight: TextWeight| Pen {
            fg: self.color(rgb),
            bg,
            weight,
        };
        let hint_rgb = background.lerp(primary, 0.6);

        let mut rows_left = inner.h;
        let prompt_y = inner.y + inner.h - 1;
        self.compose_prompt(frame, session, inner, prompt_y, text_pen(primary, display.weight), glow);
        rows_left -= 1;

        let completion = session.completion();
        let suggesting = completion.mode() != CompletionMode::Idle && !completion.suggestions().is_empty();
        if (suggesting || session.is_busy()) && rows_left > 0 {
            let y = prompt_y - 1;
            let end = inner.x + inner.w;
            let mut x = inner.x;
            if suggesting {
                for (i, s) in completion.suggestions().iter().enumerate() {
                    let pen = if i == completion.cursor() {
                        Pen {
                            fg: self.color(background),
                            bg: self.color(primary),
                            weight: TextWeight::Bold,
                        }
                    } else {
                        text_pen(hint_rgb, TextWeight::Normal)
                    };
                    x = put_text(frame, x, y, end, &s.label, pen);
                    x = put_text(frame, x, y, end, "  ", text_pen(hint_rgb, TextWeight::Normal));
                }
            }
            if session.is_busy() {
                let status = match session.queued() {
                    0 => String::from("[busy]"),
                    n => format!("[busy, {n} queued]"),
                };
                let w = status.chars().count() as u16;
                let at = (end.saturating_sub(w)).max(x);
                put_text(frame, at, y, end, &status, text_pen(hint_rgb, TextWeight::Dim));
            }
            rows_left -= 1;
        }

        if rows_left == 0 {
            return;
        }
        // Newest output sits just above the prompt area.
        let mut rows: Vec<(String, Pen)> = Vec::with_capacity(rows_left as usize);
        for line in session.scrollback().lines().rev().skip(display.scroll) {
            let pen = if line.has_class("error") {
                text_pen(ERROR_RGB, display.weight)
            } else if line.has_class("hint") {
                text_pen(hint_rgb, TextWeight::Dim)
            } else if line.has_class("command-echo") {
                text_pen(glow, display.weight)
            } else {
                text_pen(primary, display.weight)
            };
            for row in wrap(&line.text(), inner.w as usize).into_iter().rev() {
                rows.push((row, pen));
                if rows.len() == rows_left as usize {
                    break;
                }
            }
            if rows.len() == rows_left as usize {
                break;
            }
        }
        let end = inner.x + inner.w;
        let top = inner.y + rows_left - rows.len() as u16;
        for (i, (row, pen)) in rows.iter().rev().enumerate() {
            put_text(frame, inner.x, top + i as u16, end, row, *pen);
        }
    }

    /// Prompt line with an inverted cursor; the head scrolls off to keep the cursor visible.
    fn compose_prompt(
        &self,
        frame: &mut Frame,
        session: &Session,
        inner: Rect,
        y: u16,
        pen: Pen,
        glow: Rgb,
    ) {
        let prefix: Vec<char> = PROMPT.chars().chain([' ']).collect();
        let input: Vec<char> = session.input().chars().collect();
        let cursor_at = prefix.len() + session.cursor().min(input.len());
        let mut chars: Vec<char> = prefix.iter().chain(input.iter()).copied().collect();
        if cursor_at == chars.len() {
            chars.push(' ');
        }

        let avail = inner.w as usize;
        let width_of = |cs: &[char]| cs.iter().map(|c| c.width().unwrap_or(0)).sum::<usize>();
        let mut start = 0;
        while start < cursor_at && width_of(&chars[start..=cursor_at]) > avail {
            start += 1;
        }

        let prompt_pen = Pen {
            fg: self.color(glow),
            ..pen
        };
        let cursor_pen = Pen {
            fg: pen.bg,
            bg: pen.fg.or(Some(Color::White)),
            weight: TextWeight::Bold,
        };
        let end = inner.x + inner.w;
        let mut x = inner.x;
        for (i, &ch) in chars.iter().enumerate().skip(start) {
            if x >= end {
                break;
            }
            let p = if i == cursor_at {
                cursor_pen
            } else if i < prefix.len() {
                prompt_pen
            } else {
                pen
            };
            x = put_char(frame, x, y, end, ch, p);
        }
    }

    fn scramble(&mut self, frame: &mut Frame, rect: Rect, intensity: f32, glow: Rgb) {
        let chance = (intensity * 0.5).clamp(0.0, 1.0) as f64;
        let fg = self.color(glow);
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                if !self.rng.random_bool(chance) {
                    continue;
                }
                let Some(cell) = frame.get(x, y).copied() else {
                    continue;
                };
                if cell.is_continuation() || cell.ch.width() != Some(1) {
                    continue;
                }
                let ch = GLITCH_CHARS[self.rng.random_range(0..GLITCH_CHARS.len())];
                frame.set(x, y, Cell { ch, fg, ..cell });
            }
        }
    }
}

/// Writes one glyph and returns the next free column. Double-width glyphs take a
/// continuation cell; one that would cross `end` is not drawn.
fn put_char(frame: &mut Frame, x: u16, y: u16, end: u16, ch: char, pen: Pen) -> u16 {
    if x >= end {
        return x;
    }
    match ch.width().unwrap_or(0) {
        0 => x,
        1 => {
            frame.set(x, y, pen.cell(ch));
            x + 1
        }
        _ if x + 1 < end => {
            frame.set(x, y, pen.cell(ch));
            frame.set(x + 1, y, pen.cell(CONTINUATION));
            x + 2
        }
        _ => {
            frame.set(x, y, pen.cell(' '));
            x + 1
        }
    }
}

fn put_text(frame: &mut Frame, mut x: u16, y: u16, end: u16, text: &str, pen: Pen) -> u16 {
    for ch in text.chars() {
        let next = put_char(frame, x, y, end, ch, pen);
        if next == x && ch.width().unwrap_or(0) > 0 {
            break;
        }
        x = next;
    }
    x
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::canvas::{Canvas, GlyphDraw, CELL_PX_H, CELL_PX_W};
    use crate::commands;
    use crate::content::Content;
    use crate::engine::RainEngine;
    use crate::registry::CommandRegistry;
    use crate::session::RuntimeInfo;
    use crate::store::{RainBundle, RainConfigStore};

    fn session(display: ConsoleDisplay) -> Session {
        Session::new(
            CommandRegistry::new(commands::builtin()),
            Content::embedded(),
            display,
            RuntimeInfo::default(),
        )
    }

    fn row_text(frame: &Frame, y: u16) -> String {
        (0..frame.width)
            .filter_map(|x| frame.get(x, y))
            .filter(|c| !c.is_continuation())
            .map(|c| c.ch)
            .collect()
    }

    fn green(ch: char, x: u16, y: u16, blur: f32) -> GlyphDraw {
        GlyphDraw {
            ch,
            x: x as f32 * CELL_PX_W,
            y: y as f32 * CELL_PX_H,
            color: Rgb::new(0, 255, 65),
            alpha: 1.0,
            blur,
        }
    }

    #[test]
    fn wrap_respects_display_width() {
        assert_eq!(wrap("abcdef", 4), ["abcd", "ef"]);
        assert_eq!(wrap("漢字漢", 5), ["漢字", "漢"]);
        assert_eq!(wrap("", 10), [""]);
        assert_eq!(wrap("a\nb", 10), ["a", "b"]);
        assert_eq!(wrap("\tx", 10), ["    x"]);
    }

    #[test]
    fn panel_is_centered_at_its_percentages() {
        let d = ConsoleDisplay::default();
        assert_eq!(
            panel_rect(100, 40, &d),
            Some(Rect {
                x: 10,
                y: 6,
                w: 80,
                h: 28
            })
        );
        let hidden = ConsoleDisplay {
            visible: false,
            ..ConsoleDisplay::default()
        };
        assert_eq!(panel_rect(100, 40, &hidden), None);
        assert_eq!(panel_rect(10, 5, &d), None);
    }

    #[test]
    fn rain_cells_carry_glyph_and_glow() {
        let mut canvas = CellCanvas::new(20, 5);
        canvas.clear(Rgb::BLACK);
        canvas.draw_glyph(&green('ア', 2, 1, 0.0));
        canvas.draw_glyph(&green('7', 5, 3, 8.0));
        let hidden = ConsoleDisplay {
            visible: false,
            ..ConsoleDisplay::default()
        };
        let s = session(hidden);
        let mut frame = Frame::new(20, 5, None);
        let mut r = Renderer::new(ColorMode::TrueColor, Some(1));
        r.compose(&mut frame, Some(&canvas), &s);

        let wide = frame.get(2, 1).copied().unwrap();
        assert_eq!(wide.ch, 'ア');
        assert_eq!(wide.weight, TextWeight::Normal);
        assert!(frame.get(3, 1).unwrap().is_continuation());
        let head = frame.get(5, 3).copied().unwrap();
        assert_eq!(head.ch, '7');
        assert_eq!(head.weight, TextWeight::Bold);
        assert_eq!(frame.get(0, 0).map(|c| c.ch), Some(' '));
    }

    #[test]
    fn panel_shows_border_output_and_prompt() {
        let store = RainConfigStore::new(RainBundle::default());
        let mut rain = RainEngine::new(
            Some(CellCanvas::new(60, 20)),
            store,
            Some(2),
        );
        let mut s = session(ConsoleDisplay {
            width_pct: 100,
            height_pct: 100,
            ..ConsoleDisplay::default()
        });
        s.submit("echo hello there", &mut rain, Instant::now());
        for c in "ech".chars() {
            s.handle_key(crate::session::InputKey::Char(c), &mut rain, Instant::now());
        }

        let mut frame = Frame::new(60, 20, None);
        let mut r = Renderer::new(ColorMode::Color256, Some(1));
        r.compose(&mut frame, rain.canvas(), &s);

        assert_eq!(frame.get(0, 0).map(|c| c.ch), Some('┌'));
        assert_eq!(frame.get(59, 19).map(|c| c.ch), Some('┘'));
        assert!(row_text(&frame, 0).contains("glyphfall"));
        assert!(row_text(&frame, 18).contains(&format!("{PROMPT} ech")));
        assert!(row_text(&frame, 17).contains("hello there"));
        assert!(row_text(&frame, 16).contains("echo hello there"));

        // The cursor sits after the typed text, drawn inverted.
        let cursor_x = 1 + PROMPT.chars().count() as u16 + 1 + 3;
        let cursor = frame.get(cursor_x, 18).copied().unwrap();
        assert_eq!(cursor.weight, TextWeight::Bold);
        assert!(cursor.bg.is_some());
    }

    #[test]
    fn long_input_scrolls_to_keep_the_cursor_visible() {
        let store = RainConfigStore::new(RainBundle::default());
        let mut rain = RainEngine::new(None::<CellCanvas>, store, Some(2));
        let mut s = session(ConsoleDisplay {
            width_pct: 100,
            height_pct: 100,
            ..ConsoleDisplay::default()
        });
        for c in "echo 0123456789abcdefghijklmnopqrstuvwxyz".chars() {
            s.handle_key(crate::session::InputKey::Char(c), &mut rain, Instant::now());
        }
        let mut frame = Frame::new(30, 8, None);
        let mut r = Renderer::new(ColorMode::Mono, Some(1));
        r.compose(&mut frame, None, &s);
        let prompt = row_text(&frame, 6);
        assert!(prompt.contains("xyz"), "{prompt:?}");
        assert!(!prompt.contains(PROMPT));
    }

    #[test]
    fn mono_mode_leaves_colours_to_the_terminal() {
        let mut canvas = CellCanvas::new(4, 2);
        canvas.draw_glyph(&green('x', 0, 0, 0.0));
        let s = session(ConsoleDisplay {
            visible: false,
            ..ConsoleDisplay::default()
        });
        let mut frame = Frame::new(4, 2, None);
        Renderer::new(ColorMode::Mono, Some(1)).compose(&mut frame, Some(&canvas), &s);
        let c = frame.get(0, 0).copied().unwrap();
        assert_eq!((c.ch, c.fg, c.bg), ('x', None, None));
    }

    #[test]
    fn glitch_scrambles_only_inside_the_panel() {
        let s = {
            let mut s = session(ConsoleDisplay {
                width_pct: 50,
                height_pct: 50,
                ..ConsoleDisplay::default()
            });
            s.display_mut().glitch = 1.0;
            s
        };
        let mut frame = Frame::new(40, 20, None);
        Renderer::new(ColorMode::Mono, Some(9)).compose(&mut frame, None, &s);
        let rect = panel_rect(40, 20, s.display()).unwrap();
        let mut scrambled = 0;
        for y in 0..20 {
            for x in 0..40 {
                let ch = frame.get(x, y).map(|c| c.ch).unwrap_or(' ');
                if GLITCH_CHARS.contains(&ch) {
                    let inside = (rect.x..rect.x + rect.w).contains(&x)
                        && (rect.y..rect.y + rect.h).contains(&y);
                    assert!(inside);
                    scrambled += 1;
                }
            }
        }
        assert!(scrambled > 0);
    }
}
