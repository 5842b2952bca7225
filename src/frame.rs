// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::cell::Cell;

/// Screen-sized cell grid that remembers which cells changed since the last draw.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    cells: Vec<Cell>,
    blank: Cell,
    dirty_all: bool,
    dirty_map: Vec<bool>,
    dirty: Vec<usize>,
}

impl Frame {
    pub fn new(width: u16, height: u16, bg: Option<Color>) -> Self {
        let len = width as usize * height as usize;
        let blank = Cell::blank_with_bg(bg);
        Self {
            width,
            height,
            cells: vec![blank; len],
            blank,
            dirty_all: true,
            dirty_map: vec![false; len],
            dirty: Vec::new(),
        }
    }

    /// Rebuilds the grid for a new terminal size; everything is redrawn.
    pub fn resize(&mut self, width: u16, height: u16) {
        if (width, height) != (self.width, self.height) {
            *self = Frame::new(width, height, self.blank.bg);
        }
    }

    pub fn is_dirty_all(&self) -> bool {
        self.dirty_all
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty_all = true;
    }

    pub fn dirty_indices(&self) -> &[usize] {
        &self.dirty
    }

    pub fn clear_dirty(&mut self) {
        if self.dirty_all {
            self.dirty_all = false;
            self.dirty_map.fill(false);
            self.dirty.clear();
            return;
        }
        for &i in &self.dirty {
            if let Some(v) = self.dirty_map.get_mut(i) {
                *v = false;
            }
        }
        self.dirty.clear();
    }

    pub fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn cell_at_index(&self, i: usize) -> Cell {
        self.cells.get(i).copied().unwrap_or(self.blank)
    }

    /// Writes a cell, recording it as dirty only when it actually changed.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        if self.cells[i] == cell {
            return;
        }
        self.cells[i] = cell;
        if !self.dirty_all && !self.dirty_map[i] {
            self.dirty_map[i] = true;
            self.dirty.push(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TextWeight;

    fn glyph(ch: char) -> Cell {
        Cell {
            ch,
            fg: Some(Color::Green),
            bg: None,
            weight: TextWeight::Normal,
        }
    }

    #[test]
    fn only_changed_cells_become_dirty() {
        let mut f = Frame::new(4, 2, None);
        assert!(f.is_dirty_all());
        f.clear_dirty();

        f.set(1, 1, glyph('x'));
        f.set(1, 1, glyph('x'));
        f.set(0, 0, Cell::blank_with_bg(None));
        assert_eq!(f.dirty_indices(), &[5]);
        assert_eq!(f.get(1, 1).map(|c| c.ch), Some('x'));

        f.clear_dirty();
        assert!(f.dirty_indices().is_empty());
        f.set(9, 9, glyph('y'));
        assert!(f.dirty_indices().is_empty());
    }

    #[test]
    fn resize_forces_full_redraw() {
        let mut f = Frame::new(2, 2, None);
        f.clear_dirty();
        f.resize(2, 2);
        assert!(!f.is_dirty_all());
        f.resize(3, 1);
        assert!(f.is_dirty_all());
        assert_eq!((f.width, f.height), (3, 1));
    }
}
