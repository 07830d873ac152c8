//! Skip patterns applied before scoring.

use serde::Serialize;
use stint_core::FileChange;

/// A file dropped by a skip pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// Path of the dropped file.
    pub path: String,
    /// Pattern that matched.
    pub pattern: String,
}

/// Glob patterns that remove files from review.
///
/// `*` also crosses directory separators, so `*.lock` matches lock files at
/// any depth.
///
/// # Examples
///
/// ```
/// use stint_review::SkipFilter;
///
/// let filter = SkipFilter::new(&["*.lock".to_string(), "vendor/**".to_string()]);
/// assert!(filter.should_skip("web/yarn.lock"));
/// assert!(filter.should_skip("vendor/github.com/x/y.go"));
/// assert!(!filter.should_skip("src/main.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkipFilter {
    patterns: Vec<glob::Pattern>,
}

impl SkipFilter {
    /// Compile `patterns`. Invalid patterns are logged and ignored.
    pub fn new(patterns: &[String]) -> Self {
        let mut compiled = Vec::new();
        for pat in patterns {
            match glob::Pattern::new(pat) {
                Ok(p) => compiled.push(p),
                Err(e) => tracing::warn!(pattern = %pat, error = %e, "ignoring invalid skip pattern"),
            }
        }
        Self { patterns: compiled }
    }

    /// Number of usable patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no usable pattern was given.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn matching(&self, path: &str) -> Option<&glob::Pattern> {
        self.patterns.iter().find(|p| p.matches(path))
    }

    /// Whether any pattern matches `path`.
    pub fn should_skip(&self, path: &str) -> bool {
        self.matching(path).is_some()
    }

    /// Split `changes` into kept files and skipped ones, preserving order.
    pub fn apply(&self, changes: Vec<FileChange>) -> (Vec<FileChange>, Vec<SkippedFile>) {
        if self.patterns.is_empty() {
            return (changes, Vec::new());
        }

        let mut kept = Vec::with_capacity(changes.len());
        let mut skipped = Vec::new();
        for change in changes {
            match self.matching(&change.path) {
                Some(pattern) => skipped.push(SkippedFile {
                    path: change.path,
                    pattern: pattern.to_string(),
                }),
                None => kept.push(change),
            }
        }
        (kept, skipped)
    }
}
