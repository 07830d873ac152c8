use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StintError;

/// Top-level configuration loaded from `.stint.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use stint_core::StintConfig;
///
/// let config = StintConfig::default();
/// assert_eq!(config.batch.max_files_per_batch, 50);
/// assert_eq!(config.review.max_files, 15);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StintConfig {
    /// Priority scoring weights.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Batch grouping behavior.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Per-session review limits and ordering.
    #[serde(default)]
    pub review: ReviewConfig,
    /// Session storage settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl StintConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::Io`] if the file cannot be read, or
    /// [`StintError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stint_core::StintConfig;
    /// use std::path::Path;
    ///
    /// let config = StintConfig::from_file(Path::new(".stint.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, StintError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use stint_core::StintConfig;
    ///
    /// let toml = r#"
    /// [batch]
    /// max_files_per_batch = 10
    /// "#;
    /// let config = StintConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.batch.max_files_per_batch, 10);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, StintError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Scoring weights as written in the config file.
///
/// The five weights are expected to sum to 1.0; this is not checked, and
/// other sums stretch or shrink the 0–100 scale.
///
/// # Examples
///
/// ```
/// use stint_core::ScoringConfig;
///
/// let w = ScoringConfig::default();
/// let sum = w.lines_changed + w.criticality + w.churn + w.test_coverage + w.recency;
/// assert!((sum - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight of the lines-changed component (default: 0.30).
    #[serde(default = "default_lines_changed")]
    pub lines_changed: f64,
    /// Weight of the critical-path component (default: 0.25).
    #[serde(default = "default_criticality")]
    pub criticality: f64,
    /// Weight of the churn component (default: 0.20).
    #[serde(default = "default_churn")]
    pub churn: f64,
    /// Weight of the missing-tests component (default: 0.15).
    #[serde(default = "default_test_coverage")]
    pub test_coverage: f64,
    /// Weight of the recency component (default: 0.10).
    #[serde(default = "default_recency")]
    pub recency: f64,
}

fn default_lines_changed() -> f64 {
    0.30
}

fn default_criticality() -> f64 {
    0.25
}

fn default_churn() -> f64 {
    0.20
}

fn default_test_coverage() -> f64 {
    0.15
}

fn default_recency() -> f64 {
    0.10
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            lines_changed: default_lines_changed(),
            criticality: default_criticality(),
            churn: default_churn(),
            test_coverage: default_test_coverage(),
            recency: default_recency(),
        }
    }
}

/// Batch grouping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum files in a single batch (default: 50).
    #[serde(default = "default_max_files_per_batch")]
    pub max_files_per_batch: usize,
    /// Cap on files considered for grouping; 0 means unlimited.
    #[serde(default)]
    pub max_total_files: usize,
    /// Group remaining files by containing directory (default: true).
    #[serde(default = "default_true")]
    pub group_by_package: bool,
    /// Keep test files next to their source files (default: true).
    #[serde(default = "default_true")]
    pub pair_tests: bool,
}

fn default_max_files_per_batch() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_files_per_batch: default_max_files_per_batch(),
            max_total_files: 0,
            group_by_package: true,
            pair_tests: true,
        }
    }
}

/// What to do when more files changed than one session may review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnLimit {
    /// Review the top files and leave the rest for a continuation.
    #[default]
    Continue,
    /// Refuse to start the session.
    Stop,
}

impl fmt::Display for OnLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnLimit::Continue => write!(f, "continue"),
            OnLimit::Stop => write!(f, "stop"),
        }
    }
}

impl FromStr for OnLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(OnLimit::Continue),
            "stop" => Ok(OnLimit::Stop),
            other => Err(format!("unknown on-limit policy: {other}")),
        }
    }
}

/// Order in which scored files are taken into a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Highest priority first.
    #[default]
    Priority,
    /// Alphabetical by path.
    Alpha,
    /// Order of the changed-file list.
    None,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Priority => write!(f, "priority"),
            SortOrder::Alpha => write!(f, "alpha"),
            SortOrder::None => write!(f, "none"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "priority" => Ok(SortOrder::Priority),
            "alpha" => Ok(SortOrder::Alpha),
            "none" => Ok(SortOrder::None),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Per-session review configuration.
///
/// # Examples
///
/// ```
/// use stint_core::{OnLimit, ReviewConfig, SortOrder};
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.max_files, 15);
/// assert_eq!(config.on_limit, OnLimit::Continue);
/// assert_eq!(config.sort, SortOrder::Priority);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Files reviewed per session; 0 means unlimited (default: 15).
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Policy when the diff exceeds `max_files`.
    #[serde(default)]
    pub on_limit: OnLimit,
    /// Ordering applied before the per-session cut.
    #[serde(default)]
    pub sort: SortOrder,
    /// Glob patterns dropped before scoring.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}

fn default_max_files() -> usize {
    15
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            on_limit: OnLimit::default(),
            sort: SortOrder::default(),
            skip_patterns: Vec::new(),
        }
    }
}

/// Session storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Overrides the per-project state directory.
    pub state_dir: Option<PathBuf>,
}
