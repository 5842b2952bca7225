// Copyright (c) 2026 rezky_nightky

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::canvas::Canvas;
use crate::color::Rgb;
use crate::error::{RainError, ValidationError};
use crate::params::ParamKey;
use crate::store::{ApplyReport, Preset, RainConfigStore};
use crate::stream::{Layout, Stream, StreamColors};
use crate::theme::ThemeProvider;

/// What applying a preset did.
#[derive(Clone, Debug, PartialEq)]
pub enum PresetReport {
    /// The preset restored the defaults.
    Reset,
    Applied(ApplyReport),
}

/// Control surface command handlers see. Object safe so the session does not
/// need to know the concrete canvas type.
pub trait RainControl {
    /// Stops any running loop, pulls theme colours, relayouts and schedules frames.
    fn start(&mut self, theme: &dyn ThemeProvider);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    fn has_canvas(&self) -> bool;
    fn setup(&mut self);
    fn resize(&mut self, width: f32, height: f32);
    fn apply_preset(
        &mut self,
        name: &str,
        theme: &dyn ThemeProvider,
    ) -> Result<PresetReport, RainError>;
    fn reset_to_defaults(&mut self, theme: &dyn ThemeProvider);
    fn refresh_colors(&mut self, theme: &dyn ThemeProvider);
    /// Validated single-field update. Geometry fields trigger a relayout.
    fn update_param(&mut self, name: &str, raw: &Value) -> Result<ParamKey, ValidationError>;
    fn set_glyphs(&mut self, glyphs: Vec<char>);
    fn store(&self) -> &RainConfigStore;
    fn layout(&self) -> Layout;
    fn stream_count(&self) -> usize;
}

pub struct RainEngine<C: Canvas> {
    canvas: Option<C>,
    store: RainConfigStore,
    streams: Vec<Stream>,
    layout: Layout,
    colors: StreamColors,
    background: Rgb,
    rng: StdRng,
    scheduled: bool,
    last_tick: Option<Instant>,
}

impl<C: Canvas> RainEngine<C> {
    pub fn new(canvas: Option<C>, store: RainConfigStore, seed: Option<u64>) -> Self {
        if canvas.is_none() {
            tracing::warn!("no drawable surface, rain engine is inert");
        }
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self {
            canvas,
            store,
            streams: Vec::new(),
            layout: Layout::default(),
            colors: StreamColors {
                base: Rgb::new(0, 255, 65),
                head: Rgb::new(215, 255, 215),
            },
            background: Rgb::BLACK,
            rng,
            scheduled: false,
            last_tick: None,
        }
    }

    pub fn canvas(&self) -> Option<&C> {
        self.canvas.as_ref()
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Per-frame callback. Ticks only once `speed` ms have passed since the last tick.
    pub fn on_frame(&mut self, now: Instant) -> bool {
        if !self.scheduled || self.canvas.is_none() {
            return false;
        }
        let interval = Duration::from_millis(self.store.active().speed as u64);
        let due = self
            .last_tick
            .map_or(true, |t| now.saturating_duration_since(t) >= interval);
        if !due {
            return false;
        }
        self.last_tick = Some(now);
        self.tick();
        true
    }

    /// One rain tick: fade wash first, then step and draw every stream.
    pub fn tick(&mut self) {
        let Some(canvas) = self.canvas.as_ref() else {
            return;
        };
        if canvas.size() != (self.layout.width, self.layout.height) {
            tracing::warn!(
                canvas = ?canvas.size(),
                layout = ?(self.layout.width, self.layout.height),
                "surface size changed without relayout, relaying out"
            );
            self.setup();
        }

        let Self {
            canvas,
            store,
            streams,
            layout,
            colors,
            background,
            rng,
            ..
        } = self;
        let Some(canvas) = canvas.as_mut() else {
            return;
        };
        let params = store.active();
        let alphabet = store.glyphs();
        canvas.wash(*background, params.fade_speed);
        for s in streams.iter_mut() {
            s.step(params, alphabet, rng);
            s.draw(canvas, params, layout, colors);
        }
    }
}

/// Picks `count` column indices out of `total`. Distinct while `count <= total`;
/// beyond that every column is used again in a fresh random order.
fn pick_columns(total: usize, count: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut out = Vec::with_capacity(count);
    if total == 0 {
        return out;
    }
    while out.len() < count {
        let take = (count - out.len()).min(total);
        out.extend(index::sample(rng, total, take).into_iter());
    }
    out
}

impl<C: Canvas> RainControl for RainEngine<C> {
    fn start(&mut self, theme: &dyn ThemeProvider) {
        self.stop();
        self.refresh_colors(theme);
        if self.canvas.is_none() {
            tracing::debug!("start ignored, no surface");
            return;
        }
        self.setup();
        self.scheduled = true;
    }

    fn stop(&mut self) {
        self.scheduled = false;
        self.last_tick = None;
    }

    fn is_running(&self) -> bool {
        self.scheduled
    }

    fn has_canvas(&self) -> bool {
        self.canvas.is_some()
    }

    fn setup(&mut self) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        let params = self.store.active();
        let (width, height) = canvas.size();

        let col_width = self
            .store
            .glyphs()
            .iter()
            .map(|g| canvas.measure_glyph_width(*g, params.font, &params.font_family))
            .fold(0.0_f32, f32::max);
        let col_width = if col_width > 0.0 {
            col_width
        } else {
            params.font as f32
        };
        let row_height = (params.font as f32 * params.line_height).max(1.0);

        let total_columns = (width / col_width).floor().max(0.0) as usize;
        let rows = (height / row_height).floor().max(0.0) as usize;
        let active = (total_columns as f32 * params.density).floor() as usize;

        self.layout = Layout {
            width,
            height,
            col_width,
            row_height,
            total_columns,
            rows,
        };

        let alphabet = self.store.glyphs();
        let rng = &mut self.rng;
        self.streams = pick_columns(total_columns, active, rng)
            .into_iter()
            .map(|col| {
                let mut s = Stream::new(col, rows, params, alphabet, rng);
                s.stagger(rng);
                s
            })
            .collect();

        canvas.clear(self.background);
        tracing::debug!(
            total_columns,
            rows,
            streams = self.streams.len(),
            col_width,
            "rain layout"
        );
    }

    fn resize(&mut self, width: f32, height: f32) {
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.resize(width, height);
            self.setup();
        }
    }

    fn apply_preset(
        &mut self,
        name: &str,
        theme: &dyn ThemeProvider,
    ) -> Result<PresetReport, RainError> {
        let preset = self
            .store
            .preset(name)
            .cloned()
            .ok_or_else(|| RainError::UnknownPreset {
                name: name.trim().to_string(),
                available: self.store.preset_names().join(", "),
            })?;
        match preset {
            Preset::Reset { .. } => {
                self.reset_to_defaults(theme);
                Ok(PresetReport::Reset)
            }
            Preset::Config { config, .. } => {
                let report = self.store.apply_config(&config);
                tracing::debug!(
                    preset = %name,
                    applied = report.applied.len(),
                    failed = report.failed.len(),
                    "applied preset"
                );
                self.start(theme);
                Ok(PresetReport::Applied(report))
            }
        }
    }

    fn reset_to_defaults(&mut self, theme: &dyn ThemeProvider) {
        self.store.reset_to_defaults();
        self.start(theme);
    }

    fn refresh_colors(&mut self, theme: &dyn ThemeProvider) {
        let c = theme.theme_colors();
        self.store.set_colors(c.primary, c.glow);
        let active = self.store.active();
        self.colors = StreamColors {
            base: Rgb::parse_hex(&active.base_col).unwrap_or_else(|| c.primary_rgb()),
            head: Rgb::parse_hex(&active.head_col).unwrap_or_else(|| c.glow_rgb()),
        };
        self.background = c.background_rgb();
    }

    fn update_param(&mut self, name: &str, raw: &Value) -> Result<ParamKey, ValidationError> {
        let key = self.store.try_update(name, raw, None)?;
        if key.affects_layout() {
            self.setup();
        }
        Ok(key)
    }

    fn set_glyphs(&mut self, glyphs: Vec<char>) {
        self.store.set_glyphs(glyphs);
        self.setup();
    }

    fn store(&self) -> &RainConfigStore {
        &self.store
    }

    fn layout(&self) -> Layout {
        self.layout
    }

    fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;
    use crate::canvas::testing::{CanvasOp, RecordingCanvas};
    use crate::store::{ApplyStatus, RainBundle};
    use crate::theme::Theme;

    fn store(config: Value) -> RainConfigStore {
        RainConfigStore::new(RainBundle {
            default_config: config.as_object().cloned(),
            glyphs: Some("abc".to_string()),
            presets: json!({
                "storm": {"config": {"layers": 3, "layerOp": [1, 0.5, 0.2], "maxTrail": 50, "minTrail": 20}},
                "half": {"config": {"speed": 40, "fadeSpeed": 5}},
            })
            .as_object()
            .cloned(),
        })
    }

    fn engine(width: f32, height: f32, glyph: f32, config: Value) -> RainEngine<RecordingCanvas> {
        RainEngine::new(
            Some(RecordingCanvas::new(width, height, glyph)),
            store(config),
            Some(42),
        )
    }

    #[test]
    fn setup_samples_distinct_active_columns() {
        let mut e = engine(1000.0, 400.0, 20.0, json!({"font": 20, "density": 0.5}));
        e.start(&Theme::Matrix);
        let layout = e.layout();
        assert_eq!(layout.total_columns, 50);
        assert_eq!(layout.rows, 20);
        assert_eq!(e.stream_count(), 25);
        let cols: BTreeSet<usize> = e.streams().iter().map(|s| s.column()).collect();
        assert_eq!(cols.len(), 25);
        assert!(cols.iter().all(|c| *c < 50));
    }

    #[test]
    fn density_above_one_overlaps_columns() {
        let mut e = engine(200.0, 160.0, 20.0, json!({"font": 20, "density": 1.5}));
        e.setup();
        assert_eq!(e.layout().total_columns, 10);
        assert_eq!(e.stream_count(), 15);
        let cols: BTreeSet<usize> = e.streams().iter().map(|s| s.column()).collect();
        assert_eq!(cols.len(), 10);
    }

    #[test]
    fn each_tick_washes_before_drawing() {
        let mut e = engine(400.0, 320.0, 8.0, json!({"minTrail": 30, "maxTrail": 40}));
        e.start(&Theme::Matrix);
        let c = e.canvas.as_mut().unwrap();
        c.ops.clear();
        for _ in 0..40 {
            e.tick();
        }
        let ops = &e.canvas.as_ref().unwrap().ops;
        assert!(matches!(ops.first(), Some(CanvasOp::Wash(_, _))));
        let washes = ops.iter().filter(|o| matches!(o, CanvasOp::Wash(_, _))).count();
        assert_eq!(washes, 40);
        assert!(e.canvas.as_ref().unwrap().glyphs().count() > 0);
        let fade = e.store().active().fade_speed;
        assert!(ops
            .iter()
            .all(|o| !matches!(o, CanvasOp::Wash(_, a) if *a != fade)));
    }

    #[test]
    fn frames_are_throttled_by_speed() {
        let mut e = engine(400.0, 320.0, 8.0, json!({"speed": 100}));
        e.start(&Theme::Matrix);
        let t0 = Instant::now();
        assert!(e.on_frame(t0));
        assert!(!e.on_frame(t0 + Duration::from_millis(50)));
        assert!(e.on_frame(t0 + Duration::from_millis(100)));

        e.start(&Theme::Matrix);
        e.start(&Theme::Matrix);
        assert!(e.on_frame(t0 + Duration::from_millis(120)));
        assert!(!e.on_frame(t0 + Duration::from_millis(121)));
    }

    #[test]
    fn stopped_engine_draws_nothing() {
        let mut e = engine(400.0, 320.0, 8.0, json!({}));
        e.start(&Theme::Matrix);
        e.stop();
        e.stop();
        e.canvas.as_mut().unwrap().ops.clear();
        assert!(!e.on_frame(Instant::now()));
        assert!(e.canvas.as_ref().unwrap().ops.is_empty());
        assert!(!e.is_running());
    }

    #[test]
    fn engine_without_surface_is_inert() {
        let mut e: RainEngine<RecordingCanvas> = RainEngine::new(None, store(json!({})), Some(1));
        e.start(&Theme::Amber);
        assert!(!e.is_running());
        assert!(!e.on_frame(Instant::now()));
        e.tick();
        e.resize(100.0, 100.0);
        assert_eq!(e.stream_count(), 0);
        assert_eq!(e.store().active().base_col, "#ffb000");
        assert!(matches!(
            e.apply_preset("storm", &Theme::Amber),
            Ok(PresetReport::Applied(_))
        ));
    }

    #[test]
    fn presets_restart_and_report() {
        let mut e = engine(400.0, 320.0, 8.0, json!({}));
        e.start(&Theme::Matrix);
        let Ok(PresetReport::Applied(report)) = e.apply_preset("STORM", &Theme::Matrix) else {
            panic!("storm should apply");
        };
        assert_eq!(report.status(), ApplyStatus::AllOk);
        assert!(e.is_running());
        assert!(e.streams().iter().all(|s| s.length() >= 20.0));

        let Ok(PresetReport::Applied(report)) = e.apply_preset("half", &Theme::Matrix) else {
            panic!("half should apply");
        };
        assert_eq!(report.status(), ApplyStatus::Partial);

        assert_eq!(
            e.apply_preset("default", &Theme::Matrix),
            Ok(PresetReport::Reset)
        );
        assert_eq!(e.store().active().layers, 1);

        let err = e.apply_preset("nope", &Theme::Matrix).unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert!(err.to_string().contains("storm"));
    }

    #[test]
    fn theme_colours_flow_into_active_config() {
        let mut e = engine(400.0, 320.0, 8.0, json!({}));
        e.start(&Theme::Crimson);
        assert_eq!(e.store().active().base_col, "#ff2a3d");
        assert_eq!(e.background(), Rgb::parse_hex("#0d0002").unwrap());
        e.reset_to_defaults(&Theme::Cyan);
        assert_eq!(e.store().active().head_col, "#e0fbff");
    }

    #[test]
    fn layout_params_relayout_and_others_do_not() {
        let mut e = engine(400.0, 320.0, 8.0, json!({"density": 1.0}));
        e.start(&Theme::Matrix);
        assert_eq!(e.stream_count(), 50);
        assert_eq!(e.update_param("density", &json!(0.5)), Ok(ParamKey::Density));
        assert_eq!(e.stream_count(), 25);
        let before = e.stream_count();
        assert!(e.update_param("speed", &json!(80)).is_ok());
        assert_eq!(e.stream_count(), before);
        assert!(e.update_param("speed", &json!(5)).is_err());
        assert_eq!(e.store().active().speed, 80);
    }

    #[test]
    fn silent_resize_is_caught_on_tick() {
        let mut e = engine(400.0, 320.0, 8.0, json!({}));
        e.start(&Theme::Matrix);
        e.canvas.as_mut().unwrap().resize(800.0, 320.0);
        e.tick();
        assert_eq!(e.layout().width, 800.0);
        assert_eq!(e.layout().total_columns, 100);
        e.resize(160.0, 320.0);
        assert_eq!(e.layout().total_columns, 20);
    }
}
