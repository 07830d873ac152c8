//! Batch selection helpers.
//!
//! Batches are already ordered by total score, so every selection here is a
//! prefix of the input.

use crate::grouper::Batch;

/// Total number of files across `batches`.
///
/// # Examples
///
/// ```
/// use stint_batch::{files_in_batches, Batch};
///
/// let batches = vec![
///     Batch { id: 1, files: vec!["a.go".into(), "b.go".into()], reason: "ungrouped".into(), total_score: 3.0 },
///     Batch { id: 2, files: vec!["c.go".into()], reason: "ungrouped".into(), total_score: 1.0 },
/// ];
/// assert_eq!(files_in_batches(&batches), 3);
/// ```
pub fn files_in_batches(batches: &[Batch]) -> usize {
    batches.iter().map(Batch::len).sum()
}

/// The first `n` batches, or all of them when fewer exist.
pub fn take_batches(batches: &[Batch], n: usize) -> &[Batch] {
    &batches[..n.min(batches.len())]
}

/// The longest prefix of `batches` holding at most `max_files` files.
///
/// Selection stops at the first batch that would overflow the budget, even
/// if a later, smaller batch would still fit.
///
/// # Examples
///
/// ```
/// use stint_batch::{take_files, Batch};
///
/// let batch = |id, n: usize| Batch {
///     id,
///     files: (0..n).map(|i| format!("f{id}_{i}.go")).collect(),
///     reason: "ungrouped".into(),
///     total_score: 0.0,
/// };
/// let batches = vec![batch(1, 3), batch(2, 4), batch(3, 1)];
/// assert_eq!(take_files(&batches, 5).len(), 1);
/// assert_eq!(take_files(&batches, 7).len(), 2);
/// ```
pub fn take_files(batches: &[Batch], max_files: usize) -> &[Batch] {
    let mut total = 0usize;
    let end = batches
        .iter()
        .position(|batch| {
            total += batch.len();
            total > max_files
        })
        .unwrap_or(batches.len());
    &batches[..end]
}
