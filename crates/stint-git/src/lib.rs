//! Git collaborator: changed files, commit ranges, and churn counts.
//!
//! Reads the repository through git2. The changed-file list feeds the
//! scorer, and [`GitRepo`] doubles as the scorer's
//! [`ChurnSource`](stint_core::ChurnSource), counting the commits that
//! touched each path.

pub mod language;
pub mod repo;

pub use language::detect_language;
pub use repo::{DiffRange, GitRepo, ReviewType};
