//! Grouping of scored files into review batches.
//!
//! Related files are reviewed together: tests sit next to the source they
//! exercise, and the rest of a change set is clustered by directory. Batches
//! never exceed a configured size and come out highest-priority first.

pub mod grouper;
pub mod select;

pub use grouper::{Batch, BatchOptions, Grouper};
pub use select::{files_in_batches, take_batches, take_files};
