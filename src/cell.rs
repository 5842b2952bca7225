// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::runtime::TextWeight;

/// Marks the right half of a double-width glyph; never printed.
pub const CONTINUATION: char = '\0';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub weight: TextWeight,
}

impl Cell {
    pub fn blank_with_bg(bg: Option<Color>) -> Self {
        Self {
            ch: ' ',
            fg: None,
            bg,
            weight: TextWeight::Normal,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.ch == CONTINUATION
    }
}
