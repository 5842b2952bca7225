// Copyright (c) 2026 rezky_nightky

use rand::Rng;

use crate::canvas::{Canvas, GlyphDraw};
use crate::color::Rgb;
use crate::params::RainParameters;

/// Share of the buffer re-rolled on each periodic churn.
const MUTATION_SHARE: f32 = 0.15;
/// Per-step chance of restarting once the head is below the last row.
const EARLY_RESET_CHANCE: f32 = 0.025;
/// Eraser streams are drawn at this fraction of their normal alpha.
const ERASER_ALPHA: f32 = 0.05;

/// Column geometry shared by every stream of one layout.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub col_width: f32,
    pub row_height: f32,
    pub total_columns: usize,
    pub rows: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamColors {
    pub base: Rgb,
    pub head: Rgb,
}

/// One falling column.
#[derive(Clone, Debug)]
pub struct Stream {
    column: usize,
    layer: usize,
    opacity: f32,
    is_eraser: bool,
    length: f32,
    glow_window: u32,
    head: f32,
    glyphs: Vec<char>,
    mutation_counter: u32,
}

fn pick(alphabet: &[char], rng: &mut impl Rng) -> char {
    if alphabet.is_empty() {
        return '0';
    }
    alphabet[rng.random_range(0..alphabet.len())]
}

impl Stream {
    pub fn new(
        column: usize,
        rows: usize,
        params: &RainParameters,
        alphabet: &[char],
        rng: &mut impl Rng,
    ) -> Self {
        let mut s = Self {
            column,
            layer: 0,
            opacity: 1.0,
            is_eraser: false,
            length: 1.0,
            glow_window: 0,
            head: 0.0,
            glyphs: vec![' '; rows],
            mutation_counter: 0,
        };
        s.reset(params, alphabet, rng);
        s
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_eraser(&self) -> bool {
        self.is_eraser
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn glow_window(&self) -> u32 {
        self.glow_window
    }

    pub fn head(&self) -> f32 {
        self.head
    }

    /// Staggers a freshly laid out stream anywhere up to one screen above the top.
    pub fn stagger(&mut self, rng: &mut impl Rng) {
        let rows = self.glyphs.len().max(1) as f32;
        self.head = -rng.random_range(0.0..rows).floor();
    }

    pub fn reset(&mut self, params: &RainParameters, alphabet: &[char], rng: &mut impl Rng) {
        let layers = params.layers.max(1) as usize;
        self.layer = rng.random_range(0..layers);
        self.opacity = params
            .layer_op
            .get(self.layer)
            .copied()
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);
        self.is_eraser = rng.random::<f32>() < params.eraser_chance;

        let (lo, hi) = (params.min_trail as f32, params.max_trail as f32);
        self.length = if hi > lo { rng.random_range(lo..hi) } else { lo }.max(1.0);

        let (glo, ghi) = (params.head_glow_min, params.head_glow_max);
        self.glow_window = if ghi > glo {
            rng.random_range(glo..=ghi)
        } else {
            glo
        };

        self.head = -(rng.random::<f32>() * self.length).floor();
        for g in &mut self.glyphs {
            *g = pick(alphabet, rng);
        }
        self.mutation_counter = 0;
    }

    /// Advances one row. Returns true when the stream reset itself.
    pub fn step(&mut self, params: &RainParameters, alphabet: &[char], rng: &mut impl Rng) -> bool {
        self.head += 1.0;
        let row = self.head.floor();
        if row >= 0.0 && (row as usize) < self.glyphs.len() {
            self.glyphs[row as usize] = pick(alphabet, rng);
        }

        self.mutation_counter += 1;
        if self.mutation_counter >= params.trail_mutation_speed {
            for g in &mut self.glyphs {
                if rng.random::<f32>() < MUTATION_SHARE {
                    *g = pick(alphabet, rng);
                }
            }
            self.mutation_counter = 0;
        }

        let rows = self.glyphs.len() as f32;
        let gone = self.head > rows + self.length;
        let jitter = self.head > rows && rng.random::<f32>() < EARLY_RESET_CHANCE;
        if gone || jitter {
            self.reset(params, alphabet, rng);
            return true;
        }
        false
    }

    pub fn draw<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        params: &RainParameters,
        layout: &Layout,
        colors: &StreamColors,
    ) {
        let x = self.column as f32 * layout.col_width;
        let decay = params.decay_rate.clamp(0.0, 1.0);
        for (r, &ch) in self.glyphs.iter().enumerate() {
            let t = self.head - r as f32;
            if t < 0.0 || t >= self.length {
                continue;
            }

            let mut alpha = decay.powf(t) * self.opacity;
            let mut color = colors.base;
            let mut blur = 0.0;
            if self.is_eraser {
                alpha *= ERASER_ALPHA;
            } else if t < self.glow_window as f32 {
                let closeness = 1.0 - t / self.glow_window as f32;
                color = colors.head;
                blur = params.glow_blur * closeness;
                alpha = self.opacity;
            }

            canvas.draw_glyph(&GlyphDraw {
                ch,
                x,
                y: r as f32 * layout.row_height,
                color,
                alpha,
                blur,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::canvas::testing::RecordingCanvas;

    fn params() -> RainParameters {
        RainParameters {
            min_trail: 5,
            max_trail: 12,
            head_glow_min: 1,
            head_glow_max: 3,
            layers: 3,
            layer_op: vec![1.0, 0.5, 0.25],
            eraser_chance: 0.0,
            trail_mutation_speed: 10,
            ..RainParameters::default()
        }
    }

    fn layout(rows: usize) -> Layout {
        Layout {
            width: 160.0,
            height: rows as f32 * 16.0,
            col_width: 8.0,
            row_height: 16.0,
            total_columns: 20,
            rows,
        }
    }

    #[test]
    fn reset_rolls_within_bounds() {
        let p = params();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let s = Stream::new(3, 20, &p, &['a'], &mut rng);
            assert!(s.length() >= 5.0 && s.length() < 12.0);
            assert!((1..=3).contains(&s.glow_window()));
            assert!(s.layer() < 3);
            assert_eq!(s.opacity(), p.layer_op[s.layer()]);
            assert!(s.head() <= 0.0 && s.head() > -s.length() - 1.0);
            assert!(!s.is_eraser());
        }
    }

    #[test]
    fn missing_layer_opacity_defaults_to_one() {
        let p = RainParameters {
            layers: 4,
            layer_op: vec![],
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let s = Stream::new(0, 10, &p, &['a'], &mut rng);
        assert_eq!(s.opacity(), 1.0);
    }

    #[test]
    fn step_advances_one_row_and_keeps_identity() {
        let p = params();
        let mut rng = StdRng::seed_from_u64(11);
        let mut s = Stream::new(0, 40, &p, &['a', 'b'], &mut rng);
        for _ in 0..30 {
            let before = (s.length(), s.glow_window(), s.layer(), s.opacity(), s.head());
            if !s.step(&p, &['a', 'b'], &mut rng) {
                assert_eq!(s.head(), before.4 + 1.0);
                assert_eq!(
                    (s.length(), s.glow_window(), s.layer(), s.opacity()),
                    (before.0, before.1, before.2, before.3)
                );
            }
        }
    }

    #[test]
    fn reset_is_guaranteed_past_rows_plus_length() {
        let p = params();
        let mut rng = StdRng::seed_from_u64(3);
        let rows = 25;
        for _ in 0..50 {
            let mut s = Stream::new(0, rows, &p, &['a'], &mut rng);
            let bound = (rows as f32 + 2.0 * s.length()).ceil() as usize + 2;
            assert!((0..bound).any(|_| s.step(&p, &['a'], &mut rng)));
        }
    }

    #[test]
    fn head_writes_newest_glyph() {
        let p = RainParameters {
            trail_mutation_speed: 1000,
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut s = Stream::new(0, 10, &p, &['a'], &mut rng);
        s.head = -1.0;
        s.step(&p, &['z'], &mut rng);
        assert_eq!(s.glyphs[0], 'z');
    }

    #[test]
    fn draw_covers_trail_only_with_glow_at_head() {
        let p = params();
        let mut rng = StdRng::seed_from_u64(9);
        let mut s = Stream::new(2, 30, &p, &['a'], &mut rng);
        s.head = 10.0;
        s.length = 4.0;
        s.glow_window = 1;
        s.opacity = 1.0;
        let colors = StreamColors {
            base: Rgb::new(0, 200, 0),
            head: Rgb::new(255, 255, 255),
        };
        let mut canvas = RecordingCanvas::new(160.0, 480.0, 8.0);
        s.draw(&mut canvas, &p, &layout(30), &colors);

        let drawn: Vec<_> = canvas.glyphs().collect();
        assert_eq!(drawn.len(), 4);
        let head = drawn.iter().find(|g| g.y == 160.0).unwrap();
        assert_eq!(head.color, colors.head);
        assert!(head.blur > 0.0);
        assert_eq!(head.x, 16.0);
        let tail = drawn.iter().find(|g| g.y == 7.0 * 16.0).unwrap();
        assert_eq!(tail.color, colors.base);
        assert!((tail.alpha - p.decay_rate.powf(3.0)).abs() < 1e-6);
    }

    #[test]
    fn eraser_is_near_invisible() {
        let p = RainParameters {
            eraser_chance: 1.0,
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let mut s = Stream::new(0, 20, &p, &['a'], &mut rng);
        s.head = 5.0;
        let colors = StreamColors {
            base: Rgb::new(0, 200, 0),
            head: Rgb::new(255, 255, 255),
        };
        let mut canvas = RecordingCanvas::new(160.0, 320.0, 8.0);
        s.draw(&mut canvas, &p, &layout(20), &colors);
        assert!(canvas.glyphs().all(|g| g.alpha <= ERASER_ALPHA && g.blur == 0.0));
    }
}
