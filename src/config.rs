// SPDX-License-Identifier: PMPL-1.0-or-later
//! Configuration handling for a11ybot

use crate::error::{A11yError, Result};
use crate::model::{Issue, IssueType, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved run configuration. Read-only once a scan starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rewrite fixable issues in place
    #[serde(default)]
    pub fix: bool,

    /// Emit a detailed report file
    #[serde(default)]
    pub report: bool,

    /// Glob patterns for paths to skip
    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub auto_fix: AutoFixConfig,

    /// Per-rule enablement and severity overrides
    #[serde(default)]
    pub rules: HashMap<IssueType, RuleConfig>,
}

/// Caching and concurrency knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_true")]
    pub cache: bool,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_true")]
    pub parallel: bool,

    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            cache: true,
            cache_dir: default_cache_dir(),
            parallel: true,
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

/// Gates for the fixes that write generated text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoFixConfig {
    #[serde(default = "default_true")]
    pub generate_aria_labels: bool,

    #[serde(default = "default_true")]
    pub wrap_inputs_with_labels: bool,
}

impl Default for AutoFixConfig {
    fn default() -> Self {
        Self {
            generate_aria_labels: true,
            wrap_inputs_with_labels: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Replaces the scanner's severity when set
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".a11ybot-cache")
}

fn default_max_concurrent_files() -> usize {
    10
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load from `path` if given, otherwise look for `a11ybot.toml` in `dir`
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(p) = path {
            return Self::from_file(p);
        }
        let candidate = dir.join("a11ybot.toml");
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.performance.max_concurrent_files == 0 {
            return Err(A11yError::Config(
                "performance.max_concurrent_files must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rule_enabled(&self, issue_type: IssueType) -> bool {
        self.rules.get(&issue_type).map_or(true, |r| r.enabled)
    }

    /// Drop disabled rules and apply severity overrides, keeping scan order
    pub fn apply_rules(&self, issues: Vec<Issue>) -> Vec<Issue> {
        if self.rules.is_empty() {
            return issues;
        }
        issues
            .into_iter()
            .filter(|i| self.rule_enabled(i.issue_type))
            .map(|mut i| {
                if let Some(severity) = self.rules.get(&i.issue_type).and_then(|r| r.severity) {
                    i.severity = severity;
                }
                i
            })
            .collect()
    }
}
