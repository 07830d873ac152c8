use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One file in a diff, as reported by the git collaborator.
///
/// # Examples
///
/// ```
/// use stint_core::{ChangeStatus, FileChange};
///
/// let change = FileChange::new("src/auth.rs", 12, 3);
/// assert_eq!(change.lines_changed(), 15);
/// assert_eq!(change.status, ChangeStatus::Modified);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the repository root.
    pub path: String,
    /// Lines added in the diff.
    pub lines_added: u32,
    /// Lines deleted in the diff.
    pub lines_deleted: u32,
    /// Kind of change.
    pub status: ChangeStatus,
    /// Detected language tag, e.g. `"rust"` or `"go"`.
    pub language: Option<String>,
    /// Previous path when the file was renamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

impl FileChange {
    /// Create a modified-file record with no language tag.
    pub fn new(path: impl Into<String>, lines_added: u32, lines_deleted: u32) -> Self {
        Self {
            path: path.into(),
            lines_added,
            lines_deleted,
            status: ChangeStatus::Modified,
            language: None,
            old_path: None,
        }
    }

    /// Total lines touched (added + deleted).
    pub fn lines_changed(&self) -> u32 {
        self.lines_added.saturating_add(self.lines_deleted)
    }
}

/// Status of a file within a diff.
///
/// # Examples
///
/// ```
/// use stint_core::ChangeStatus;
///
/// assert_eq!(ChangeStatus::Renamed.to_string(), "renamed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// New file.
    Added,
    /// Existing file modified.
    Modified,
    /// File removed.
    Deleted,
    /// File moved from another path.
    Renamed,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Deleted => write!(f, "deleted"),
            ChangeStatus::Renamed => write!(f, "renamed"),
        }
    }
}

/// Severity of a review finding.
///
/// # Examples
///
/// ```
/// use stint_core::Severity;
///
/// let s: Severity = serde_json::from_str("\"error\"").unwrap();
/// assert_eq!(s, Severity::Error);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed before merging.
    Error,
    /// Worth investigating.
    Warning,
    /// Optional improvement.
    Suggestion,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Suggestion => write!(f, "suggestion"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "suggestion" => Ok(Severity::Suggestion),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// What kind of problem a finding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Functional defect.
    Bug,
    /// Security weakness.
    Security,
    /// Performance problem.
    Performance,
    /// Style or readability.
    Style,
    /// Missing or weak tests.
    Testing,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Bug => write!(f, "bug"),
            Category::Security => write!(f, "security"),
            Category::Performance => write!(f, "performance"),
            Category::Style => write!(f, "style"),
            Category::Testing => write!(f, "testing"),
        }
    }
}

/// A single issue reported by the reviewing agent.
///
/// Produced outside stint and stored verbatim in the session record.
///
/// # Examples
///
/// ```
/// use stint_core::{Category, Finding, Severity};
///
/// let finding = Finding {
///     file: "pkg/auth/handler.go".into(),
///     line: 42,
///     severity: Severity::Error,
///     category: Category::Security,
///     description: "token compared with ==".into(),
///     suggested_fix: Some("use a constant-time comparison".into()),
/// };
/// let json = serde_json::to_value(&finding).unwrap();
/// assert!(json.get("suggested_fix").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// File the finding refers to.
    pub file: String,
    /// Line number, 0 when unknown.
    #[serde(default)]
    pub line: u32,
    /// Severity level.
    pub severity: Severity,
    /// Finding category.
    pub category: Category,
    /// Explanation of the issue.
    pub description: String,
    /// Optional fix suggestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

/// Output format for CLI subcommands.
///
/// # Examples
///
/// ```
/// use stint_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
