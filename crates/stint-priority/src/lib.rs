//! Risk-based priority scoring for changed files.
//!
//! Ranks every file in a diff on a 0–100 scale from five weighted signals:
//! size of the change relative to the largest change in the set, whether the
//! path touches a critical area (auth, payments, secrets), historical churn,
//! missing tests, and a recency baseline.

pub mod critical;
pub mod scorer;

pub use critical::is_critical_path;
pub use scorer::{sort_by_score, Breakdown, Score, Scorer, Weights};
