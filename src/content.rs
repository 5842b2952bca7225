// Copyright (c) 2026 rezky_nightky

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::BundleError;

const EMBEDDED_CONTENT: &str = include_str!("../data/content.json");

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ContactEntry {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SkillNode {
    pub name: String,
    pub items: Vec<String>,
    pub children: Vec<SkillNode>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Hobby {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ManPage {
    pub synopsis: String,
    #[serde(default)]
    pub description: String,
}

/// Read-only data the informational commands print.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Content {
    pub whoami: Vec<String>,
    pub contact: Vec<ContactEntry>,
    pub skills: Vec<SkillNode>,
    pub hobbies: Vec<Hobby>,
    pub man: BTreeMap<String, ManPage>,
}

impl Content {
    pub fn from_json_str(what: &str, text: &str) -> Result<Content, BundleError> {
        serde_json::from_str(text).map_err(|source| BundleError::Parse {
            what: what.to_string(),
            source,
        })
    }

    pub fn embedded() -> Content {
        Content::from_json_str("embedded content", EMBEDDED_CONTENT).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "embedded content unusable");
            Content::default()
        })
    }

    pub fn load(path: Option<&Path>) -> Content {
        let Some(path) = path else {
            return Content::embedded();
        };
        let loaded = std::fs::read_to_string(path)
            .map_err(|source| BundleError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|text| Content::from_json_str(&path.display().to_string(), &text));
        match loaded {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to embedded content");
                Content::embedded()
            }
        }
    }

    /// Resolves `a > b > c` by case-insensitive names, one tree level per segment.
    pub fn find_skill(&self, path: &str) -> Option<&SkillNode> {
        let mut level = &self.skills;
        let mut found = None;
        for seg in path.split('>').map(str::trim).filter(|s| !s.is_empty()) {
            let node = level.iter().find(|n| n.name.eq_ignore_ascii_case(seg))?;
            level = &node.children;
            found = Some(node);
        }
        found
    }

    /// Every reachable path, parents before children, e.g. `ai`, `ai > genai`.
    pub fn skill_paths(&self) -> Vec<String> {
        fn walk(nodes: &[SkillNode], prefix: &str, out: &mut Vec<String>) {
            for n in nodes {
                let path = if prefix.is_empty() {
                    n.name.clone()
                } else {
                    format!("{prefix} > {}", n.name)
                };
                out.push(path.clone());
                walk(&n.children, &path, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.skills, "", &mut out);
        out
    }
}
