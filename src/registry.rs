// Copyright (c) 2026 rezky_nightky

use std::collections::BTreeMap;

use crate::session::{CommandContext, Outcome};

pub type Handler = fn(&[String], &mut CommandContext<'_>) -> anyhow::Result<Outcome>;

/// Where a command's first-argument completions come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgSource {
    None,
    Static(&'static [&'static str]),
    Themes,
    Presets,
    Params,
    ManPages,
    SkillPaths,
}

#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub summary: &'static str,
    pub args: ArgSource,
    pub handler: Handler,
}

/// Name to handler table, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    pub fn new(specs: impl IntoIterator<Item = CommandSpec>) -> Self {
        let mut commands = BTreeMap::new();
        for spec in specs {
            if commands.insert(spec.name, spec).is_some() {
                tracing::warn!(command = spec.name, "duplicate command registration, last one wins");
            }
        }
        Self { commands }
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name.trim().to_lowercase().as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sorted command names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
