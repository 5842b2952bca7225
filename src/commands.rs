// Copyright (c) 2026 rezky_nightky

use crate::content::SkillNode;
use crate::effects::GlitchSequence;
use crate::engine::PresetReport;
use crate::params::ParamKey;
use crate::registry::{ArgSource, CommandSpec, Handler};
use crate::runtime::TextWeight;
use crate::session::{escape, CommandContext, ConsoleDisplay, Outcome};
use crate::store::{ApplyReport, ApplyStatus, Preset};
use crate::theme::Theme;
use crate::validate;

type CmdResult = anyhow::Result<Outcome>;

fn spec(name: &'static str, summary: &'static str, args: ArgSource, handler: Handler) -> CommandSpec {
    CommandSpec {
        name,
        summary,
        args,
        handler,
    }
}

pub fn builtin() -> Vec<CommandSpec> {
    vec![
        spec("help", "list available commands", ArgSource::None, help),
        spec("whoami", "who is behind this console", ArgSource::None, whoami),
        spec("contact", "ways to get in touch", ArgSource::None, contact),
        spec("skills", "the full skills tree", ArgSource::None, skills),
        spec("skilltree", "one branch of the skills tree", ArgSource::SkillPaths, skilltree),
        spec("hobbies", "things done for fun", ArgSource::None, hobbies),
        spec("man", "manual page of a command", ArgSource::ManPages, man),
        spec("history", "numbered command history", ArgSource::None, history),
        spec("date", "local date and time", ArgSource::None, date),
        spec("echo", "print the arguments", ArgSource::None, echo),
        spec("clear", "clear the scrollback", ArgSource::None, clear),
        spec("info", "build, terminal and rain details", ArgSource::None, info),
        spec("theme", "switch colour theme", ArgSource::Themes, theme),
        spec("rainpreset", "apply a rain preset", ArgSource::Presets, rainpreset),
        spec("rainset", "set one rain parameter", ArgSource::Params, rainset),
        spec("rainconfig", "show rain parameters", ArgSource::None, rainconfig),
        spec("rainreset", "restore default rain", ArgSource::None, rainreset),
        spec("rain", "start or stop the rain", ArgSource::Static(&["on", "off"]), rain),
        spec("resize", "resize the console panel", ArgSource::Static(&["reset"]), resize),
        spec("opacity", "console panel opacity", ArgSource::None, opacity),
        spec("termtext", "console text weight", ArgSource::Static(TextWeight::NAMES), termtext),
        spec("glitch", "short visual glitch", ArgSource::None, glitch),
        spec("exit", "hide the console (F2 shows it)", ArgSource::None, exit),
        spec("quit", "leave glyphfall", ArgSource::None, quit),
    ]
}

fn help(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let rows: Vec<String> = ctx
        .registry
        .iter()
        .map(|s| {
            format!(
                "<span class=\"cmd\">{:<12}</span>{}",
                s.name,
                escape(s.summary)
            )
        })
        .collect();
    ctx.hint("Available commands:");
    for row in rows {
        ctx.html(row);
    }
    ctx.hint("Use 'man <command>' for details. Tab completes names and arguments.");
    Ok(Outcome::Done)
}

fn whoami(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let lines = ctx.content.whoami.clone();
    for line in &lines {
        ctx.text(line);
    }
    Ok(Outcome::Done)
}

fn contact(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let rows: Vec<String> = ctx
        .content
        .contact
        .iter()
        .map(|c| format!("<b>{:<10}</b>{}", escape(&c.label), escape(&c.value)))
        .collect();
    for row in rows {
        ctx.html(row);
    }
    Ok(Outcome::Done)
}

fn render_skill(node: &SkillNode, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let items = if node.items.is_empty() {
        String::new()
    } else {
        format!(": {}", node.items.join(", "))
    };
    out.push(format!("{indent}▸ {}{items}", node.name));
    for child in &node.children {
        render_skill(child, depth + 1, out);
    }
}

fn skills(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let mut lines = Vec::new();
    for node in &ctx.content.skills {
        render_skill(node, 0, &mut lines);
    }
    for line in &lines {
        ctx.text(line);
    }
    ctx.hint("Drill into a branch with: skilltree \"ai > genai\"");
    Ok(Outcome::Done)
}

fn skilltree(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let path = args.join(" ");
    if path.trim().is_empty() {
        ctx.error("usage: skilltree <path>");
        let top: Vec<&str> = ctx.content.skills.iter().map(|n| n.name.as_str()).collect();
        let top = top.join(", ");
        ctx.hint(&format!("Top-level branches: {top}"));
        return Ok(Outcome::Done);
    }
    let mut lines = Vec::new();
    match ctx.content.find_skill(&path) {
        Some(node) => render_skill(node, 0, &mut lines),
        None => {
            ctx.error(&format!("skilltree: no branch '{}'", path.trim()));
            ctx.hint("Press Tab after 'skilltree ' to browse branches.");
            return Ok(Outcome::Done);
        }
    }
    for line in &lines {
        ctx.text(line);
    }
    Ok(Outcome::Done)
}

fn hobbies(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let rows: Vec<String> = ctx
        .content
        .hobbies
        .iter()
        .map(|h| format!("<b>{}</b> - {}", escape(&h.name), escape(&h.description)))
        .collect();
    for row in rows {
        ctx.html(row);
    }
    Ok(Outcome::Done)
}

fn man(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let Some(topic) = args.first().map(|a| a.to_lowercase()) else {
        ctx.error("What manual page do you want?");
        ctx.hint("For example: man rainset");
        return Ok(Outcome::Done);
    };
    let Some(page) = ctx.content.man.get(&topic).cloned() else {
        ctx.error(&format!("No manual entry for {topic}"));
        ctx.hint("Type 'help' to list commands.");
        return Ok(Outcome::Done);
    };
    ctx.html_class("NAME", "hint");
    ctx.text(&format!("    {topic}"));
    ctx.html_class("SYNOPSIS", "hint");
    ctx.text(&format!("    {}", page.synopsis));
    if !page.description.is_empty() {
        ctx.html_class("DESCRIPTION", "hint");
        ctx.text(&format!("    {}", page.description));
    }
    if topic == "rainset" {
        for key in ParamKey::ALL {
            ctx.text(&format!("    {:<20}{}", key.name(), key.range_label()));
        }
    }
    Ok(Outcome::Done)
}

fn history(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let rows: Vec<String> = ctx
        .history
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>4}  {line}", i + 1))
        .collect();
    for row in &rows {
        ctx.text(row);
    }
    Ok(Outcome::Done)
}

fn date(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let now = chrono::Local::now();
    ctx.text(&now.format("%a %b %e %H:%M:%S %Z %Y").to_string());
    Ok(Outcome::Done)
}

fn echo(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    ctx.text(&args.join(" "));
    Ok(Outcome::Done)
}

fn clear(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    ctx.out.clear();
    ctx.display.scroll = 0;
    Ok(Outcome::Done)
}

fn info(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let layout = ctx.rain.layout();
    let rows = [
        ("version", ctx.info.version.to_string()),
        ("build", ctx.info.build.clone()),
        ("commit", ctx.info.git_sha.clone()),
        ("colour", ctx.info.color_mode.label().to_string()),
        ("fps", ctx.info.fps.to_string()),
        ("theme", ctx.display.theme.name().to_string()),
        (
            "rain",
            match (ctx.rain.has_canvas(), ctx.rain.is_running()) {
                (false, _) => "no surface".to_string(),
                (true, true) => "running".to_string(),
                (true, false) => "stopped".to_string(),
            },
        ),
        (
            "layout",
            format!(
                "{} columns x {} rows, {} streams",
                layout.total_columns,
                layout.rows,
                ctx.rain.stream_count()
            ),
        ),
        ("glyphs", ctx.rain.store().glyphs().len().to_string()),
    ];
    for (k, v) in rows {
        ctx.text(&format!("{k:<10}{v}"));
    }
    Ok(Outcome::Done)
}

fn theme(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let list = |ctx: &mut CommandContext<'_>| {
        for t in Theme::ALL {
            let mark = if t == ctx.display.theme { "*" } else { " " };
            ctx.text(&format!("{mark} {:<12}{}", t.name(), t.description()));
        }
    };
    let Some(name) = args.first() else {
        ctx.text(&format!("current theme: {}", ctx.display.theme.name()));
        list(ctx);
        return Ok(Outcome::Done);
    };
    if name.eq_ignore_ascii_case("list") {
        list(ctx);
        return Ok(Outcome::Done);
    }
    let Some(t) = Theme::from_name(name) else {
        ctx.error(&format!("unknown theme '{name}'"));
        ctx.hint(&format!("Available: {}", Theme::names().join(", ")));
        return Ok(Outcome::Done);
    };
    ctx.display.theme = t;
    ctx.rain.refresh_colors(&t);
    ctx.text(&format!("theme set to {}", t.name()));
    Ok(Outcome::Done)
}

fn report_failures(ctx: &mut CommandContext<'_>, report: &ApplyReport) {
    for (name, err) in &report.failed {
        ctx.error(&format!("  {name}: {err}"));
    }
}

fn rainpreset(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let name = args.join(" ");
    if name.trim().is_empty() || name.eq_ignore_ascii_case("list") {
        let rows: Vec<String> = ctx
            .rain
            .store()
            .get_presets()
            .iter()
            .map(|(n, p)| match p {
                Preset::Reset { .. } if p.description().is_empty() => {
                    format!("{n:<12}restore defaults")
                }
                _ => format!("{n:<12}{}", p.description()),
            })
            .collect();
        ctx.hint("Presets:");
        for row in &rows {
            ctx.text(row);
        }
        return Ok(Outcome::Done);
    }

    let theme = ctx.display.theme;
    match ctx.rain.apply_preset(&name, &theme) {
        Ok(PresetReport::Reset) => ctx.text("rain reset to defaults"),
        Ok(PresetReport::Applied(report)) => {
            let name = name.trim();
            match report.status() {
                ApplyStatus::AllOk => ctx.text(&format!(
                    "preset '{name}' applied ({} parameters)",
                    report.applied.len()
                )),
                ApplyStatus::Partial => {
                    ctx.error(&format!(
                        "preset '{name}' partially applied: {} ok, {} failed",
                        report.applied.len(),
                        report.failed.len()
                    ));
                    report_failures(ctx, &report);
                }
                ApplyStatus::AllFailed => {
                    ctx.error(&format!(
                        "preset '{name}' failed: all {} parameters rejected",
                        report.total()
                    ));
                    report_failures(ctx, &report);
                }
                ApplyStatus::NoOp => ctx.hint(&format!("preset '{name}' has no parameters")),
            }
        }
        Err(e) => {
            ctx.error(&e.to_string());
            ctx.hint("Try 'rainpreset list'.");
        }
    }
    Ok(Outcome::Done)
}

fn rainset(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let (Some(name), true) = (args.first(), args.len() >= 2) else {
        ctx.error("usage: rainset <param> <value>");
        ctx.hint("See 'rainconfig' for parameter names and ranges.");
        return Ok(Outcome::Done);
    };
    let key = match validate::resolve_key(name) {
        Ok(key) => key,
        Err(e) => {
            ctx.error(&e.to_string());
            return Ok(Outcome::Done);
        }
    };
    let raw = validate::raw_from_text(key, &args[1..].join(" "));
    match ctx.rain.update_param(name, &raw) {
        Ok(key) => {
            let value = ctx.rain.store().active().display_value(key);
            ctx.text(&format!("{} = {value}", key.name()));
        }
        Err(e) => {
            ctx.error(&e.to_string());
            ctx.hint(&format!("{}: {}", key.name(), key.range_label()));
        }
    }
    Ok(Outcome::Done)
}

fn rainconfig(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let active = ctx.rain.store().get_active();
    ctx.hint(&format!("{:<20}{:<16}{}", "parameter", "value", "range"));
    for key in ParamKey::ALL {
        ctx.text(&format!(
            "{:<20}{:<16}{}",
            key.name(),
            active.display_value(key),
            key.range_label()
        ));
    }
    ctx.text(&format!("{:<20}{:<16}theme", "baseCol", active.base_col));
    ctx.text(&format!("{:<20}{:<16}theme", "headCol", active.head_col));
    Ok(Outcome::Done)
}

fn rainreset(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let theme = ctx.display.theme;
    ctx.rain.reset_to_defaults(&theme);
    ctx.text("rain parameters restored to defaults");
    Ok(Outcome::Done)
}

fn rain(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    match args.first().map(|a| a.to_lowercase()).as_deref() {
        Some("on") => {
            if !ctx.rain.has_canvas() {
                ctx.error("rain: no drawable surface, the animation is disabled");
                return Ok(Outcome::Done);
            }
            let theme = ctx.display.theme;
            ctx.rain.start(&theme);
            ctx.text("rain started");
        }
        Some("off") => {
            ctx.rain.stop();
            ctx.text("rain stopped");
        }
        _ => {
            ctx.error("usage: rain <on|off>");
            let state = if ctx.rain.is_running() { "on" } else { "off" };
            ctx.hint(&format!("rain is currently {state}"));
        }
    }
    Ok(Outcome::Done)
}

fn parse_pct(s: &str) -> Option<u8> {
    let v: f64 = s.trim().trim_end_matches('%').parse().ok()?;
    let (lo, hi) = (ConsoleDisplay::MIN_PCT as f64, ConsoleDisplay::MAX_PCT as f64);
    (lo..=hi).contains(&v).then_some(v.round() as u8)
}

fn resize(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    if args.first().is_some_and(|a| a.eq_ignore_ascii_case("reset")) {
        ctx.display.reset_size();
        ctx.text(&format!(
            "console size reset to {}% x {}%",
            ctx.display.width_pct, ctx.display.height_pct
        ));
        return Ok(Outcome::Done);
    }
    let (Some(w), Some(h)) = (args.first(), args.get(1)) else {
        ctx.error("usage: resize <width%> <height%> | resize reset");
        return Ok(Outcome::Done);
    };
    match (parse_pct(w), parse_pct(h)) {
        (Some(w), Some(h)) => {
            ctx.display.width_pct = w;
            ctx.display.height_pct = h;
            ctx.text(&format!("console resized to {w}% x {h}%"));
        }
        _ => {
            ctx.error(&format!(
                "resize: width and height must be between {}% and {}%",
                ConsoleDisplay::MIN_PCT,
                ConsoleDisplay::MAX_PCT
            ));
        }
    }
    Ok(Outcome::Done)
}

fn opacity(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    let Some(raw) = args.first() else {
        ctx.text(&format!("console opacity is {}", ctx.display.opacity));
        return Ok(Outcome::Done);
    };
    match raw.trim().parse::<f32>() {
        Ok(v) if (ConsoleDisplay::MIN_OPACITY..=1.0).contains(&v) => {
            ctx.display.opacity = v;
            ctx.text(&format!("console opacity set to {v}"));
        }
        _ => ctx.error(&format!(
            "opacity must be a number between {} and 1 (got '{raw}')",
            ConsoleDisplay::MIN_OPACITY
        )),
    }
    Ok(Outcome::Done)
}

fn termtext(args: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    match args.first().and_then(|a| TextWeight::from_name(a)) {
        Some(w) => {
            ctx.display.weight = w;
            ctx.text(&format!("console text is now {}", w.name()));
        }
        None => {
            ctx.error("usage: termtext <normal|bold|dim>");
            ctx.hint(&format!("current: {}", ctx.display.weight.name()));
        }
    }
    Ok(Outcome::Done)
}

fn glitch(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    ctx.error("SIGNAL INTERFERENCE DETECTED");
    Ok(Outcome::Pending(Box::new(GlitchSequence::new(ctx.now))))
}

fn exit(_: &[String], ctx: &mut CommandContext<'_>) -> CmdResult {
    ctx.display.visible = false;
    ctx.hint("console hidden, press F2 to bring it back");
    Ok(Outcome::Done)
}

fn quit(_: &[String], _: &mut CommandContext<'_>) -> CmdResult {
    Ok(Outcome::Quit)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use serde_json::json;

    use super::*;
    use crate::canvas::testing::RecordingCanvas;
    use crate::content::Content;
    use crate::engine::{RainControl, RainEngine};
    use crate::registry::CommandRegistry;
    use crate::session::{RuntimeInfo, Scrollback};
    use crate::store::{RainBundle, RainConfigStore};

    struct Harness {
        out: Scrollback,
        rain: RainEngine<RecordingCanvas>,
        display: ConsoleDisplay,
        content: Content,
        registry: CommandRegistry,
        info: RuntimeInfo,
        history: Vec<String>,
    }

    impl Harness {
        fn new() -> Self {
            let store = RainConfigStore::new(RainBundle {
                default_config: json!({"minTrail": 10, "maxTrail": 30, "layers": 1, "layerOp": [1]})
                    .as_object()
                    .cloned(),
                glyphs: Some("01".to_string()),
                presets: json!({
                    "storm": {"config": {"layers": 3, "layerOp": [1, 0.5, 0.2], "maxTrail": 50, "minTrail": 20}, "description": "heavy"},
                    "odd": {"config": {"speed": 100, "density": 9}},
                    "bad": {"config": {"speed": 1, "density": 9}},
                    "empty": {"config": {}},
                })
                .as_object()
                .cloned(),
            });
            let mut rain = RainEngine::new(Some(RecordingCanvas::new(320.0, 160.0, 8.0)), store, Some(5));
            rain.start(&Theme::Matrix);
            Self {
                out: Scrollback::default(),
                rain,
                display: ConsoleDisplay::default(),
                content: Content::embedded(),
                registry: CommandRegistry::new(builtin()),
                info: RuntimeInfo::default(),
                history: vec!["date".to_string(), "skills".to_string()],
            }
        }

        fn run(&mut self, line: &str) -> Vec<String> {
            self.out.clear();
            let tokens = crate::tokenize::tokenize(line);
            let (name, args) = tokens.split_first().unwrap();
            let spec = *self.registry.get(name).unwrap();
            let mut ctx = CommandContext {
                out: &mut self.out,
                rain: &mut self.rain,
                display: &mut self.display,
                content: &self.content,
                history: &self.history,
                registry: &self.registry,
                info: &self.info,
                now: Instant::now(),
            };
            let outcome = (spec.handler)(args, &mut ctx).unwrap();
            assert!(matches!(outcome, Outcome::Done));
            self.out.lines().map(|l| l.text()).collect()
        }

        fn errors(&self) -> usize {
            self.out.lines().filter(|l| l.has_class("error")).count()
        }
    }

    #[test]
    fn help_lists_every_command() {
        let mut h = Harness::new();
        let out = h.run("help").join("\n");
        for name in h.registry.names() {
            assert!(out.contains(name), "{name}");
        }
    }

    #[test]
    fn rainset_validates_and_reports_range() {
        let mut h = Harness::new();
        assert_eq!(h.run("rainset speed 120"), ["speed = 120"]);
        assert_eq!(h.rain.store().active().speed, 120);

        let out = h.run("rainset minTrail 40");
        assert_eq!(h.errors(), 1);
        assert!(out[0].contains("minTrail"));
        assert_eq!(h.rain.store().active().min_trail, 10);

        h.run("rainset baseCol #fff");
        assert_eq!(h.errors(), 1);
        h.run("rainset glitter 3");
        assert_eq!(h.errors(), 1);
        h.run("rainset speed");
        assert_eq!(h.errors(), 1);

        assert_eq!(h.run("rainset layers 2"), ["layers = 2"]);
        assert_eq!(h.run("rainset layerOp 1,0.5"), ["layerOp = 1,0.5"]);
        h.run("rainset layerOp 1");
        assert_eq!(h.errors(), 1);
        assert_eq!(h.run(r#"rainset fontFamily "Fira Code, mono""#), ["fontFamily = Fira Code, mono"]);
    }

    #[test]
    fn rainpreset_reports_each_status() {
        let mut h = Harness::new();
        let out = h.run("rainpreset storm");
        assert_eq!(out, ["preset 'storm' applied (4 parameters)"]);

        let out = h.run("rainpreset odd");
        assert!(out[0].contains("1 ok, 1 failed"));
        assert!(out[1].contains("density"));

        let out = h.run("rainpreset bad");
        assert!(out[0].contains("all 2 parameters rejected"));
        assert_eq!(h.errors(), 3);

        assert!(h.run("rainpreset empty")[0].contains("no parameters"));

        let out = h.run("rainpreset nope");
        assert!(out[0].contains("unknown preset 'nope'"));
        assert_eq!(out.len(), 2);

        assert_eq!(h.run("rainpreset default"), ["rain reset to defaults"]);
        assert_eq!(h.rain.store().get_active(), h.rain.store().get_defaults());

        let listed = h.run("rainpreset list").join("\n");
        assert!(listed.contains("storm") && listed.contains("heavy"));
    }

    #[test]
    fn theme_switch_recolours_rain() {
        let mut h = Harness::new();
        assert_eq!(h.run("theme amber"), ["theme set to amber"]);
        assert_eq!(h.display.theme, Theme::Amber);
        assert_eq!(h.rain.store().active().base_col, "#ffb000");
        h.run("theme plaid");
        assert_eq!(h.errors(), 1);
        assert_eq!(h.display.theme, Theme::Amber);
    }

    #[test]
    fn display_commands_enforce_ranges() {
        let mut h = Harness::new();
        h.run("resize 50% 60");
        assert_eq!((h.display.width_pct, h.display.height_pct), (50, 60));
        h.run("resize 10 60");
        assert_eq!(h.errors(), 1);
        assert_eq!(h.display.width_pct, 50);
        h.run("resize reset");
        assert_eq!(h.display.width_pct, ConsoleDisplay::DEFAULT_WIDTH_PCT);

        h.run("opacity 0.5");
        assert_eq!(h.display.opacity, 0.5);
        h.run("opacity 0.05");
        assert_eq!(h.errors(), 1);
        assert_eq!(h.display.opacity, 0.5);

        h.run("termtext BOLD");
        assert_eq!(h.display.weight, TextWeight::Bold);
        h.run("termtext huge");
        assert_eq!(h.errors(), 1);
    }

    #[test]
    fn rain_toggle_and_reset() {
        let mut h = Harness::new();
        h.run("rain off");
        assert!(!h.rain.is_running());
        h.run("rain on");
        assert!(h.rain.is_running());
        h.run("rainset density 0.5");
        h.run("rainreset");
        assert_eq!(h.rain.store().active().density, h.rain.store().get_defaults().density);
    }

    #[test]
    fn content_commands_print_data() {
        let mut h = Harness::new();
        assert_eq!(h.run("whoami").len(), h.content.whoami.len());
        let out = h.run(r#"skilltree "ai > genai""#);
        assert!(out[0].contains("genai"));
        h.run("skilltree nowhere");
        assert_eq!(h.errors(), 1);
        let out = h.run("man rainpreset");
        assert!(out.iter().any(|l| l.contains("rainpreset [name|list]")));
        h.run("man nosuch");
        assert_eq!(h.errors(), 1);
        assert_eq!(h.run("history"), ["   1  date", "   2  skills"]);
        assert_eq!(h.run("echo a   b"), ["a b"]);
    }
}
