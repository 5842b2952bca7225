// Copyright (c) 2026 rezky_nightky

use std::io::{stdout, Result, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor, event,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal, ExecutableCommand, QueueableCommand,
};

use crate::cell::Cell;
use crate::frame::Frame;
use crate::runtime::TextWeight;

/// Pen state last sent to the terminal, so unchanged attributes are not re-sent.
#[derive(Default)]
struct Pen {
    fg: Option<Option<Color>>,
    bg: Option<Option<Color>>,
    weight: Option<TextWeight>,
}

impl Pen {
    fn apply(&mut self, out: &mut Stdout, cell: &Cell) -> Result<()> {
        if self.fg != Some(cell.fg) {
            out.queue(SetForegroundColor(cell.fg.unwrap_or(Color::Reset)))?;
            self.fg = Some(cell.fg);
        }
        if self.bg != Some(cell.bg) {
            out.queue(SetBackgroundColor(cell.bg.unwrap_or(Color::Reset)))?;
            self.bg = Some(cell.bg);
        }
        if self.weight != Some(cell.weight) {
            out.queue(SetAttribute(Attribute::NormalIntensity))?;
            match cell.weight {
                TextWeight::Normal => {}
                TextWeight::Bold => {
                    out.queue(SetAttribute(Attribute::Bold))?;
                }
                TextWeight::Dim => {
                    out.queue(SetAttribute(Attribute::Dim))?;
                }
            }
            self.weight = Some(cell.weight);
        }
        Ok(())
    }
}

pub struct Terminal {
    stdout: Stdout,
    /// What is on screen, to skip cells a dirty mark reports but that did not change.
    shown: Vec<Cell>,
    shown_size: (u16, u16),
    run_buf: String,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let mut out = stdout();
        terminal::enable_raw_mode()?;
        let init: Result<()> = (|| {
            out.execute(terminal::EnterAlternateScreen)?;
            out.execute(cursor::Hide)?;
            let _ = out.execute(terminal::DisableLineWrap);
            out.execute(SetAttribute(Attribute::Reset))?;
            out.execute(ResetColor)?;
            out.execute(terminal::Clear(terminal::ClearType::All))?;
            out.flush()?;
            Ok(())
        })();
        if let Err(e) = init {
            restore_terminal_best_effort();
            return Err(e);
        }
        Ok(Self {
            stdout: out,
            shown: Vec::new(),
            shown_size: (0, 0),
            run_buf: String::with_capacity(64),
        })
    }

    pub fn size(&self) -> Result<(u16, u16)> {
        terminal::size()
    }

    pub fn poll_event(timeout: Duration) -> Result<bool> {
        event::poll(timeout)
    }

    pub fn read_event() -> Result<event::Event> {
        event::read()
    }

    pub fn draw(&mut self, frame: &mut Frame) -> Result<()> {
        let size = (frame.width, frame.height);
        let total = size.0 as usize * size.1 as usize;
        let resized = self.shown_size != size;
        let dirty_is_large = total > 0 && frame.dirty_indices().len() >= total / 3;

        if resized || frame.is_dirty_all() || dirty_is_large {
            self.full_redraw(frame, resized)?;
        } else {
            self.draw_dirty(frame)?;
        }

        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.flush()?;
        frame.clear_dirty();
        Ok(())
    }

    fn full_redraw(&mut self, frame: &Frame, resized: bool) -> Result<()> {
        if resized {
            self.stdout
                .queue(terminal::Clear(terminal::ClearType::All))?;
            self.shown = vec![Cell::blank_with_bg(None); frame.width as usize * frame.height as usize];
            self.shown_size = (frame.width, frame.height);
        }
        let mut pen = Pen::default();
        for y in 0..frame.height {
            self.stdout.queue(cursor::MoveTo(0, y))?;
            for x in 0..frame.width {
                let idx = y as usize * frame.width as usize + x as usize;
                let cell = frame.cell_at_index(idx);
                self.shown[idx] = cell;
                if cell.is_continuation() {
                    continue;
                }
                pen.apply(&mut self.stdout, &cell)?;
                self.stdout.queue(Print(cell.ch))?;
            }
        }
        Ok(())
    }

    /// Redraws dirty cells, batching horizontal runs that share a pen.
    fn draw_dirty(&mut self, frame: &Frame) -> Result<()> {
        let width = frame.width as usize;
        let mut dirty: Vec<usize> = frame
            .dirty_indices()
            .iter()
            .copied()
            .filter(|&i| self.shown.get(i).copied() != Some(frame.cell_at_index(i)))
            .collect();
        dirty.sort_unstable();

        let mut pen = Pen::default();
        let mut i = 0;
        while i < dirty.len() {
            let start = dirty[i];
            let head = frame.cell_at_index(start);
            self.run_buf.clear();
            let mut end = start;
            let mut j = i;
            while j < dirty.len() && dirty[j] == end && dirty[j] / width == start / width {
                let cell = frame.cell_at_index(dirty[j]);
                if cell.fg != head.fg || cell.bg != head.bg || cell.weight != head.weight {
                    break;
                }
                if !cell.is_continuation() {
                    self.run_buf.push(cell.ch);
                }
                self.shown[dirty[j]] = cell;
                end += 1;
                j += 1;
            }
            if j == i {
                // Continuation cell with a pen of its own: just record it.
                self.shown[start] = head;
                i += 1;
                continue;
            }
            if !self.run_buf.is_empty() {
                let (x, y) = ((start % width) as u16, (start / width) as u16);
                self.stdout.queue(cursor::MoveTo(x, y))?;
                pen.apply(&mut self.stdout, &head)?;
                self.stdout.queue(Print(self.run_buf.as_str()))?;
            }
            i = j;
        }
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        restore_terminal_best_effort();
    }
}

pub fn restore_terminal_best_effort() {
    let mut out = stdout();
    let _ = out.execute(SetAttribute(Attribute::Reset));
    let _ = out.execute(ResetColor);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::EnableLineWrap);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    let _ = out.flush();
}
