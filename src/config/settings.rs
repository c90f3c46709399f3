use super::suppressions::Suppression;
use crate::core::{Severity, TokenListKind};
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Analysis settings, usually loaded from `.cfgscan.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum number of distinct configurations checked per file
    #[serde(default = "default_max_configs")]
    pub max_configs: usize,

    /// Check every configuration regardless of `max_configs`
    #[serde(default)]
    pub force: bool,

    /// Run checks on the simplified token list as well
    #[serde(default = "default_true")]
    pub simplify: bool,

    /// Collect file info and run the whole-program pass
    #[serde(default = "default_true")]
    pub whole_program: bool,

    /// Register the built-in unused-function check
    #[serde(default)]
    pub unused_function: bool,

    /// Suppress progress lines
    #[serde(default)]
    pub quiet: bool,

    /// Check only this configuration (`A;B=1`) instead of the enumerated ones
    #[serde(default)]
    pub user_defines: Option<String>,

    /// Extra directories searched for `#include`
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,

    /// Suppressions in `id[:file[:line]]` form
    #[serde(default)]
    pub suppressions: Vec<String>,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    #[serde(default)]
    pub reducer: ReducerSettings,

    #[serde(default)]
    pub large_headers: LargeHeaderSettings,

    /// Host-level worker count
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_configs: default_max_configs(),
            force: false,
            simplify: true,
            whole_program: true,
            unused_function: false,
            quiet: false,
            user_defines: None,
            include_paths: Vec::new(),
            suppressions: Vec::new(),
            rules: Vec::new(),
            reducer: ReducerSettings::default(),
            large_headers: LargeHeaderSettings::default(),
            jobs: default_jobs(),
        }
    }
}

impl Settings {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_configs == 0 {
            return Err(Error::configuration("max_configs must be at least 1"));
        }
        if self.reducer.max_steps == 0 {
            return Err(Error::configuration("reducer.max_steps must be at least 1"));
        }
        if self.jobs == 0 {
            return Err(Error::configuration("jobs must be at least 1"));
        }
        if let Some(rule) = self.rules.iter().find(|r| r.token_list_kind().is_none()) {
            return Err(Error::configuration(format!(
                "rule '{}': tokenlist must be 'normal' or 'simple', got '{}'",
                rule.id, rule.tokenlist
            )));
        }
        self.parsed_suppressions().map(|_| ())
    }

    pub fn parsed_suppressions(&self) -> Result<Vec<Suppression>> {
        self.suppressions.iter().map(|s| s.parse()).collect()
    }

    /// The configuration ceiling, or `None` when `force` is set.
    pub fn ceiling(&self) -> Option<usize> {
        (!self.force).then_some(self.max_configs)
    }
}

/// A regex pattern rule run over the rendered token list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub id: String,
    #[serde(default = "default_rule_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub summary: Option<String>,
    /// `normal` or `simple`
    #[serde(default = "default_rule_tokenlist")]
    pub tokenlist: String,
}

impl RuleConfig {
    /// Token list this rule runs on; `None` for an unknown `tokenlist` value.
    pub fn token_list_kind(&self) -> Option<TokenListKind> {
        let key = self.tokenlist.trim().to_ascii_lowercase();
        [TokenListKind::Normal, TokenListKind::Simplified]
            .into_iter()
            .find(|kind| kind.rule_key() == key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReducerSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Maximum number of reproduce attempts per internal error
    #[serde(default = "default_reducer_max_steps")]
    pub max_steps: usize,
}

impl Default for ReducerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_steps: default_reducer_max_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargeHeaderSettings {
    /// Bytes of expanded text that make a single expansion "large"
    #[serde(default = "default_size_threshold")]
    pub size_threshold: usize,
    /// Number of expansions after which a header is flagged
    #[serde(default = "default_repeat_threshold")]
    pub repeat_threshold: usize,
}

impl Default for LargeHeaderSettings {
    fn default() -> Self {
        Self {
            size_threshold: default_size_threshold(),
            repeat_threshold: default_repeat_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_configs() -> usize {
    12
}

fn default_jobs() -> usize {
    1
}

fn default_rule_severity() -> Severity {
    Severity::Style
}

fn default_rule_tokenlist() -> String {
    "simple".to_string()
}

fn default_reducer_max_steps() -> usize {
    2048
}

fn default_size_threshold() -> usize {
    256 * 1024
}

fn default_repeat_threshold() -> usize {
    32
}
