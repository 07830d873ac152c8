use std::path::PathBuf;

/// Errors that can occur across stint.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary converts to a `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use stint_core::StintError;
///
/// let err = StintError::SessionNotFound { id: 7 };
/// assert!(err.to_string().contains("session 7"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum StintError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The requested session does not exist on disk.
    #[error("session {id} not found")]
    #[diagnostic(help("run `stint sessions list` to see the sessions recorded for this project"))]
    SessionNotFound {
        /// Id that was looked up.
        id: u32,
    },

    /// A session I/O step failed.
    #[error("session {id}: {step}: {source}")]
    SessionIo {
        /// Session being read or written.
        id: u32,
        /// The step that failed, e.g. `"write session meta"`.
        step: &'static str,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A session document could not be decoded.
    #[error("session {id}: malformed metadata: {source}")]
    SessionCorrupt {
        /// Session whose document failed to parse.
        id: u32,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A session was saved before the store assigned it an id.
    #[error("session has no id; it must be created before it is saved")]
    SessionNotCreated,

    /// The store holds no sessions.
    #[error("no sessions found")]
    NoSessions,

    /// A status change that would move a session backwards.
    #[error("session {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        /// Session id.
        id: u32,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// More files changed than a single session may review.
    #[error("too many files: {total} (max {max})")]
    #[diagnostic(help("use `--on-limit continue` or raise `--max-files`"))]
    FileLimit {
        /// Files eligible for review.
        total: usize,
        /// Configured per-session maximum.
        max: usize,
    },
}
