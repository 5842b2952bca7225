// Copyright (c) 2026 rezky_nightky

use unicode_width::UnicodeWidthChar;

use crate::color::Rgb;

/// One glyph blit. Coordinates are in virtual pixels, top-left of the glyph box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphDraw {
    pub ch: char,
    pub x: f32,
    pub y: f32,
    pub color: Rgb,
    pub alpha: f32,
    pub blur: f32,
}

/// A 2-D surface the rain engine draws onto.
pub trait Canvas {
    /// Width and height in virtual pixels.
    fn size(&self) -> (f32, f32);
    fn resize(&mut self, width: f32, height: f32);
    /// Rendered advance of `glyph` at `font_px`.
    fn measure_glyph_width(&self, glyph: char, font_px: u32, family: &str) -> f32;
    fn clear(&mut self, color: Rgb);
    /// Paints `color` over the whole surface at `alpha`.
    fn wash(&mut self, color: Rgb, alpha: f32);
    fn draw_glyph(&mut self, glyph: &GlyphDraw);
}

pub const CELL_PX_W: f32 = 8.0;
pub const CELL_PX_H: f32 = 16.0;

/// Below this a washed cell reads as background and is blanked.
const VISIBLE_ALPHA: f32 = 0.04;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasCell {
    pub ch: char,
    pub color: Rgb,
    pub alpha: f32,
    pub glow: bool,
}

impl CanvasCell {
    const BLANK: CanvasCell = CanvasCell {
        ch: ' ',
        color: Rgb::BLACK,
        alpha: 0.0,
        glow: false,
    };

    pub fn is_blank(&self) -> bool {
        self.ch == ' ' || self.alpha < VISIBLE_ALPHA
    }
}

/// Character-cell raster backing the rain in a terminal.
#[derive(Clone, Debug)]
pub struct CellCanvas {
    cols: u16,
    rows: u16,
    cells: Vec<CanvasCell>,
    background: Rgb,
}

impl CellCanvas {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![CanvasCell::BLANK; cols as usize * rows as usize],
            background: Rgb::BLACK,
        }
    }

    pub fn px_for_cells(cols: u16, rows: u16) -> (f32, f32) {
        (cols as f32 * CELL_PX_W, rows as f32 * CELL_PX_H)
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn cell(&self, x: u16, y: u16) -> Option<&CanvasCell> {
        if x >= self.cols || y >= self.rows {
            return None;
        }
        self.cells.get(y as usize * self.cols as usize + x as usize)
    }

    /// Glyph and final foreground colour (composited over the background) of a cell.
    pub fn resolve(&self, x: u16, y: u16) -> Option<(char, Rgb, bool)> {
        let c = self.cell(x, y)?;
        if c.is_blank() {
            return None;
        }
        Some((c.ch, self.background.lerp(c.color, c.alpha), c.glow))
    }
}

impl Canvas for CellCanvas {
    fn size(&self) -> (f32, f32) {
        CellCanvas::px_for_cells(self.cols, self.rows)
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.cols = (width / CELL_PX_W).floor().max(0.0) as u16;
        self.rows = (height / CELL_PX_H).floor().max(0.0) as u16;
        self.cells.clear();
        self.cells
            .resize(self.cols as usize * self.rows as usize, CanvasCell::BLANK);
    }

    fn measure_glyph_width(&self, glyph: char, font_px: u32, _family: &str) -> f32 {
        let cells = glyph.width().unwrap_or(1).max(1) as f32;
        cells * CELL_PX_W * (font_px as f32 / CELL_PX_H)
    }

    fn clear(&mut self, color: Rgb) {
        self.background = color;
        self.cells.fill(CanvasCell::BLANK);
    }

    fn wash(&mut self, color: Rgb, alpha: f32) {
        self.background = color;
        let keep = (1.0 - alpha).clamp(0.0, 1.0);
        for c in &mut self.cells {
            if c.ch == ' ' {
                continue;
            }
            c.alpha *= keep;
            c.glow = false;
            if c.alpha < VISIBLE_ALPHA {
                *c = CanvasCell::BLANK;
            }
        }
    }

    fn draw_glyph(&mut self, g: &GlyphDraw) {
        if g.x < 0.0 || g.y < 0.0 {
            return;
        }
        let x = (g.x / CELL_PX_W) as u16;
        let y = (g.y / CELL_PX_H) as u16;
        if x >= self.cols || y >= self.rows {
            return;
        }
        let idx = y as usize * self.cols as usize + x as usize;
        let alpha = g.alpha.clamp(0.0, 1.0);
        let cur = self.cells[idx];
        // Translucent glyphs only replace what they outshine.
        if !cur.is_blank() && alpha < cur.alpha && g.blur <= 0.0 {
            return;
        }
        self.cells[idx] = CanvasCell {
            ch: g.ch,
            color: g.color,
            alpha,
            glow: g.blur > 0.0,
        };
    }
}
