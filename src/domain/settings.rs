// Explorer settings.
// An explicit struct loaded from TOML rather than read from host-global
// settings, so the walker can be driven with any configuration at call time.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tunables for both tree views.
///
/// Depths are independent per direction. Blacklists are ordered lists of
/// regex patterns matched anywhere in the function name (search semantics).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Max recursion depth for the incoming (callers) view, in edges.
    pub in_depth: usize,
    /// Max recursion depth for the outgoing (callees) view, in edges.
    pub out_depth: usize,
    /// Cap on siblings materialized under one node.
    pub limit: usize,
    /// Matching nodes are shown but not expanded.
    pub soft_blacklist: Vec<String>,
    /// Matching nodes are never expanded, including as a root.
    pub hard_blacklist: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            in_depth: 5,
            out_depth: 5,
            limit: 100,
            soft_blacklist: Vec::new(),
            hard_blacklist: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Settings> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        Ok(settings)
    }

    pub fn depth_for(&self, direction: crate::domain::tree::Direction) -> usize {
        match direction {
            crate::domain::tree::Direction::Callers => self.in_depth,
            crate::domain::tree::Direction::Callees => self.out_depth,
        }
    }
}

/// A compiled ordered pattern list.
///
/// Patterns that fail to compile are skipped with a warning; a bad pattern
/// must not take the whole view down.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    patterns: Vec<Regex>,
}

impl Blacklist {
    pub fn compile(patterns: &[String]) -> Blacklist {
        let mut compiled = Vec::with_capacity(patterns.len());
        for p in patterns {
            match Regex::new(p) {
                Ok(re) => compiled.push(re),
                Err(e) => log::warn!("skipping invalid blacklist pattern {:?}: {}", p, e),
            }
        }
        Blacklist { patterns: compiled }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
