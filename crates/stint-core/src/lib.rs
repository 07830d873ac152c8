//! Core types, configuration, and error handling for stint.
//!
//! This crate provides the shared foundation used by all other stint crates:
//! - [`StintError`]: unified error type using `thiserror`
//! - [`StintConfig`]: configuration loaded from `.stint.toml`
//! - Shared types: [`FileChange`], [`ChangeStatus`], [`Finding`], [`Severity`],
//!   [`Category`], [`OutputFormat`]
//! - [`ChurnSource`]: the seam through which commit-churn counts are queried
//! - [`conventions`]: per-ecosystem test-file naming rules

mod churn;
mod config;
pub mod conventions;
mod error;
mod types;

pub use churn::{ChurnSource, NoChurn};
pub use config::{
    BatchConfig, OnLimit, ReviewConfig, ScoringConfig, SessionConfig, SortOrder, StintConfig,
};
pub use error::StintError;
pub use types::{Category, ChangeStatus, FileChange, Finding, OutputFormat, Severity};

/// A convenience `Result` type for stint operations.
pub type Result<T> = std::result::Result<T, StintError>;
