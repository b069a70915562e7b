//! Declarative command maps: one logical test job across platforms.
//!
//! A [`CommandMap`] carries a label, a default invocation, and per-platform
//! overrides. Resolution is a pure lookup: the override for a platform if
//! one exists, otherwise the default.

use crate::error::{OrchestratorError, Result};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An invocation, either a bare executable or an explicit argv.
///
/// Both forms normalize to an ordered `Vec<String>` via [`ArgumentList::to_vec`];
/// the untagged representation lets map definitions written as JSON use a
/// plain string where a one-element list is meant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentList {
    /// A single executable path, implicitly a one-element vector.
    Single(String),
    /// An explicit ordered argument vector.
    Sequence(Vec<String>),
}

impl ArgumentList {
    /// Normalize to an ordered argument vector.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ArgumentList::Single(exe) => vec![exe.clone()],
            ArgumentList::Sequence(argv) => argv.clone(),
        }
    }
}

impl From<&str> for ArgumentList {
    fn from(exe: &str) -> Self {
        ArgumentList::Single(exe.to_string())
    }
}

impl From<Vec<&str>> for ArgumentList {
    fn from(argv: Vec<&str>) -> Self {
        ArgumentList::Sequence(argv.into_iter().map(str::to_string).collect())
    }
}

/// Declarative description of one logical test job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMap {
    /// Job label, unique within a batch.
    pub label: String,

    /// Invocation used when no platform override applies.
    pub default: ArgumentList,

    /// Per-platform invocation overrides.
    pub overrides: BTreeMap<Platform, ArgumentList>,
}

impl CommandMap {
    /// Create a map with no overrides.
    pub fn new(label: impl Into<String>, default: impl Into<ArgumentList>) -> Self {
        Self {
            label: label.into(),
            default: default.into(),
            overrides: BTreeMap::new(),
        }
    }

    /// Add a platform override. The platform string is validated against
    /// the known platform set at construction time.
    pub fn with_override(
        mut self,
        platform: &str,
        argv: impl Into<ArgumentList>,
    ) -> Result<Self> {
        let platform: Platform =
            platform
                .parse()
                .map_err(|_| OrchestratorError::InvalidOverride {
                    label: self.label.clone(),
                    platform: platform.to_string(),
                })?;
        self.overrides.insert(platform, argv.into());
        Ok(self)
    }

    /// Resolve the invocation for `platform`: the override if present,
    /// else the default. Pure lookup, no side effects.
    pub fn resolve(&self, platform: &Platform) -> Vec<String> {
        self.overrides
            .get(platform)
            .unwrap_or(&self.default)
            .to_vec()
    }
}
