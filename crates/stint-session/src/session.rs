use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stint_core::{Finding, StintError};

/// Lifecycle of a session. Moves forward only.
///
/// # Examples
///
/// ```
/// use stint_session::Status;
///
/// assert!(Status::Pending < Status::InProgress);
/// assert_eq!(Status::InProgress.to_string(), "in_progress");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Created, review not started.
    #[default]
    Pending,
    /// Files handed to the reviewer.
    InProgress,
    /// Findings recorded.
    Completed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pending => write!(f, "pending"),
            Status::InProgress => write!(f, "in_progress"),
            Status::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Status::Pending),
            "in_progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// One review pass over a subset of a diff.
///
/// Serialized as `meta.json` with snake_case keys. `continued_from` is
/// omitted for chain roots and `findings` when empty.
///
/// # Examples
///
/// ```
/// use stint_session::{Session, Status};
///
/// let mut session = Session::new("abc123", "def456");
/// session.set_files(vec!["pkg/auth/handler.go".into(), "main.go".into()]);
/// assert_eq!(session.files_reviewed, 2);
/// assert_eq!(session.status, Status::Pending);
/// assert!(session.is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Per-project id, assigned by the store; starts at 1.
    #[serde(default)]
    pub id: u32,
    /// Creation time, stamped by the store.
    pub created_at: DateTime<Utc>,
    /// Base revision of the reviewed diff.
    #[serde(default)]
    pub base_commit: String,
    /// Head revision; empty for the working tree.
    #[serde(default)]
    pub head_commit: String,
    /// Files in the diff, including those reviewed earlier in the chain.
    #[serde(default)]
    pub total_files_in_diff: usize,
    /// Always `files.len()`.
    #[serde(default)]
    pub files_reviewed: usize,
    /// Files left for a continuation.
    #[serde(default)]
    pub files_remaining: usize,
    /// Lifecycle status.
    #[serde(default)]
    pub status: Status,
    /// Session this one continues; 0 for a chain root.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub continued_from: u32,
    /// Files covered by this session, in review order.
    #[serde(default)]
    pub files: Vec<String>,
    /// Findings recorded when the session completed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
}

fn is_zero(id: &u32) -> bool {
    *id == 0
}

impl Session {
    /// A pending session over `base_commit..head_commit`.
    pub fn new(base_commit: impl Into<String>, head_commit: impl Into<String>) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            base_commit: base_commit.into(),
            head_commit: head_commit.into(),
            total_files_in_diff: 0,
            files_reviewed: 0,
            files_remaining: 0,
            status: Status::Pending,
            continued_from: 0,
            files: Vec::new(),
            findings: Vec::new(),
        }
    }

    /// Replace the reviewed files, keeping `files_reviewed` in step.
    pub fn set_files(&mut self, files: Vec<String>) {
        self.files_reviewed = files.len();
        self.files = files;
    }

    /// Whether this session starts a chain.
    pub fn is_root(&self) -> bool {
        self.continued_from == 0
    }

    /// Whether files are left for a continuation.
    pub fn has_remaining(&self) -> bool {
        self.files_remaining > 0
    }

    /// Move to `to`. Staying put is allowed; moving backwards is not.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::InvalidTransition`] when `to` precedes the
    /// current status.
    ///
    /// # Examples
    ///
    /// ```
    /// use stint_session::{Session, Status};
    ///
    /// let mut session = Session::new("HEAD", "");
    /// session.transition(Status::InProgress).unwrap();
    /// session.transition(Status::Completed).unwrap();
    /// assert!(session.transition(Status::Pending).is_err());
    /// ```
    pub fn transition(&mut self, to: Status) -> Result<(), StintError> {
        if to < self.status {
            return Err(StintError::InvalidTransition {
                id: self.id,
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}
