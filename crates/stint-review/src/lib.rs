//! Review orchestration: from a changed-file list to a persisted session.
//!
//! A review run drops files matching skip patterns, excludes files already
//! reviewed earlier in a continuation chain, scores and orders the rest,
//! applies the per-session file limit, groups the selection into batches,
//! and records an in-progress session. Findings produced by the reviewer
//! are attached later with [`complete`].

pub mod continuation;
pub mod filter;
pub mod pipeline;

pub use continuation::Continuation;
pub use filter::{SkipFilter, SkippedFile};
pub use pipeline::{complete, load_findings, order_scores, Plan, Planner};
