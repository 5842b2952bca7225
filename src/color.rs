// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::runtime::ColorMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb` or `#rrggbb` (leading `#` optional).
    pub fn parse_hex(s: &str) -> Option<Rgb> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let mut it = hex.chars().map(|c| c.to_digit(16).unwrap_or(0) as u8 * 17);
                Some(Rgb::new(it.next()?, it.next()?, it.next()?))
            }
            6 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                Some(Rgb::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
            }
            _ => None,
        }
    }

    pub fn lerp(self, to: Rgb, t: f32) -> Rgb {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        Rgb::new(
            lerp_u8(self.r, to.r, t),
            lerp_u8(self.g, to.g, t),
            lerp_u8(self.b, to.b, t),
        )
    }

    pub fn to_color(self, mode: ColorMode) -> Option<Color> {
        match mode {
            ColorMode::Mono => None,
            ColorMode::TrueColor => Some(Color::Rgb {
                r: self.r,
                g: self.g,
                b: self.b,
            }),
            ColorMode::Color256 => Some(Color::AnsiValue(rgb_to_ansi256(self.r, self.g, self.b))),
            ColorMode::Color16 => Some(rgb_to_color16(self.r, self.g, self.b)),
        }
    }
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let a = a as f32;
    let b = b as f32;
    (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
}

fn dist2(r0: u8, g0: u8, b0: u8, r1: u8, g1: u8, b1: u8) -> i32 {
    let dr = (r0 as i32) - (r1 as i32);
    let dg = (g0 as i32) - (g1 as i32);
    let db = (b0 as i32) - (b1 as i32);
    (dr * dr) + (dg * dg) + (db * db)
}

fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

    let level = |v: u8| ((v as u16 * 5) + 127) / 255;
    let (r6, g6, b6) = (level(r), level(g), level(b));
    let cube_idx = 16 + (36 * r6 as u8) + (6 * g6 as u8) + (b6 as u8);
    let cube_dist = dist2(
        r,
        g,
        b,
        CUBE_LEVELS[r6 as usize],
        CUBE_LEVELS[g6 as usize],
        CUBE_LEVELS[b6 as usize],
    );

    let avg = ((r as u16 + g as u16 + b as u16) / 3) as u8;
    let gray_idx = match avg {
        0..=7 => 16,
        239..=255 => 231,
        _ => 232 + ((avg - 8) / 10).min(23),
    };
    let gray_level = match gray_idx {
        16 => 0,
        231 => 255,
        idx => 8 + 10 * (idx - 232),
    };
    let gray_dist = dist2(r, g, b, gray_level, gray_level, gray_level);

    if gray_dist < cube_dist {
        gray_idx
    } else {
        cube_idx
    }
}

fn rgb_to_color16(r: u8, g: u8, b: u8) -> Color {
    const TABLE: [(Color, (u8, u8, u8)); 16] = [
        (Color::Black, (0, 0, 0)),
        (Color::DarkGrey, (128, 128, 128)),
        (Color::Grey, (192, 192, 192)),
        (Color::White, (255, 255, 255)),
        (Color::DarkRed, (128, 0, 0)),
        (Color::Red, (255, 0, 0)),
        (Color::DarkGreen, (0, 128, 0)),
        (Color::Green, (0, 255, 0)),
        (Color::DarkBlue, (0, 0, 128)),
        (Color::Blue, (0, 0, 255)),
        (Color::DarkCyan, (0, 128, 128)),
        (Color::Cyan, (0, 255, 255)),
        (Color::DarkMagenta, (128, 0, 128)),
        (Color::Magenta, (255, 0, 255)),
        (Color::DarkYellow, (128, 128, 0)),
        (Color::Yellow, (255, 255, 0)),
    ];

    TABLE
        .iter()
        .min_by_key(|(_, (cr, cg, cb))| dist2(r, g, b, *cr, *cg, *cb))
        .map(|(c, _)| *c)
        .unwrap_or(Color::White)
}
