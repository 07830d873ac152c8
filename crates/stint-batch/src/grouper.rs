use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use stint_core::conventions::{is_test_name, source_path};
use stint_core::BatchConfig;
use stint_priority::Score;

/// A cluster of files reviewed together.
///
/// # Examples
///
/// ```
/// use stint_batch::Batch;
///
/// let batch = Batch {
///     id: 1,
///     files: vec!["pkg/auth/handler.go".into(), "pkg/auth/handler_test.go".into()],
///     reason: "test-pair".into(),
///     total_score: 92.5,
/// };
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// 1-based id in emission order.
    pub id: usize,
    /// Member file paths, in group order.
    pub files: Vec<String>,
    /// Why these files were grouped.
    pub reason: String,
    /// Sum of the members' score totals.
    pub total_score: f64,
}

impl Batch {
    /// Number of files in the batch.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the batch holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Grouping options.
///
/// # Examples
///
/// ```
/// use stint_batch::BatchOptions;
///
/// let opts = BatchOptions::default();
/// assert_eq!(opts.max_files_per_batch, 50);
/// assert_eq!(opts.max_total_files, 0);
/// assert!(opts.pair_tests && opts.group_by_package);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum files per batch; 0 means no limit.
    pub max_files_per_batch: usize,
    /// Only the first N scores are grouped; 0 means all.
    pub max_total_files: usize,
    /// Cluster remaining files by containing directory.
    pub group_by_package: bool,
    /// Keep tests with their source files.
    pub pair_tests: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            max_files_per_batch: config.max_files_per_batch,
            max_total_files: config.max_total_files,
            group_by_package: config.group_by_package,
            pair_tests: config.pair_tests,
        }
    }
}

/// Insertion-ordered groups of score indices.
#[derive(Default)]
struct Groups {
    keys: Vec<String>,
    members: Vec<Vec<usize>>,
    index: HashMap<String, usize>,
}

impl Groups {
    fn slot(&mut self, key: &str) -> &mut Vec<usize> {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.keys.push(key.to_string());
                self.members.push(Vec::new());
                self.index.insert(key.to_string(), self.members.len() - 1);
                self.members.len() - 1
            }
        };
        &mut self.members[idx]
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Vec<usize>> {
        let idx = *self.index.get(key)?;
        Some(&mut self.members[idx])
    }

    fn into_entries(self) -> impl Iterator<Item = (String, Vec<usize>)> {
        self.keys.into_iter().zip(self.members)
    }
}

/// Groups scored files into batches.
pub struct Grouper {
    opts: BatchOptions,
}

impl Grouper {
    /// Create a grouper with the given options.
    pub fn new(opts: BatchOptions) -> Self {
        Self { opts }
    }

    /// Cluster `scores` into batches, highest total score first.
    ///
    /// Every input score lands in exactly one batch (after the
    /// `max_total_files` cut). Groups are emitted as test pairs, then
    /// directories, then leftovers; ids follow that order and the final
    /// list is stably sorted by total score.
    ///
    /// # Examples
    ///
    /// ```
    /// use stint_batch::{BatchOptions, Grouper};
    /// use stint_core::{FileChange, NoChurn};
    /// use stint_priority::Scorer;
    ///
    /// let scores = Scorer::new(NoChurn).score_files(&[
    ///     FileChange::new("pkg/auth/handler.go", 40, 2),
    ///     FileChange::new("pkg/auth/handler_test.go", 30, 0),
    /// ]);
    /// let batches = Grouper::new(BatchOptions::default()).group(&scores);
    /// assert_eq!(batches.len(), 1);
    /// assert_eq!(batches[0].reason, "test-pair");
    /// assert_eq!(batches[0].files[0], "pkg/auth/handler.go");
    /// ```
    pub fn group(&self, scores: &[Score]) -> Vec<Batch> {
        if scores.is_empty() {
            return Vec::new();
        }

        let files = if self.opts.max_total_files > 0 && scores.len() > self.opts.max_total_files {
            &scores[..self.opts.max_total_files]
        } else {
            scores
        };

        let mut used = vec![false; files.len()];
        let pairs = if self.opts.pair_tests {
            pair_tests(files, &mut used)
        } else {
            Groups::default()
        };

        let mut packages = Groups::default();
        if self.opts.group_by_package {
            for (idx, score) in files.iter().enumerate() {
                if used[idx] {
                    continue;
                }
                packages.slot(package_of(&score.path)).push(idx);
                used[idx] = true;
            }
        }

        let ungrouped: Vec<usize> = (0..files.len()).filter(|&idx| !used[idx]).collect();

        tracing::debug!(
            pairs = pairs.keys.len(),
            packages = packages.keys.len(),
            ungrouped = ungrouped.len(),
            "grouped {} files",
            files.len()
        );

        let mut emitter = Emitter::new(files, self.opts.max_files_per_batch);

        for (source, members) in pairs.into_entries() {
            if members.len() <= emitter.max {
                emitter.push(&members, "test-pair");
            } else {
                let label = format!("test-pair (split {})", base_name(&source));
                emitter.push_split(&members, &label);
            }
        }

        for (dir, members) in packages.into_entries() {
            emitter.push_split(&members, &format!("same-package ({dir})"));
        }

        emitter.push_split(&ungrouped, "ungrouped");

        let mut batches = emitter.batches;
        sort_batches(&mut batches);
        batches
    }
}

/// Test pairing pass: each test joins the group of its conventional source
/// path; the source, when present, is moved to the front of its group.
fn pair_tests(files: &[Score], used: &mut [bool]) -> Groups {
    let mut pairs = Groups::default();

    for (idx, score) in files.iter().enumerate() {
        if !is_test_name(&score.path) {
            continue;
        }
        if let Some(source) = source_path(&score.path) {
            pairs.slot(&source).push(idx);
            used[idx] = true;
        }
    }

    for (idx, score) in files.iter().enumerate() {
        if used[idx] || is_test_name(&score.path) {
            continue;
        }
        if let Some(group) = pairs.get_mut(&score.path) {
            group.insert(0, idx);
            used[idx] = true;
        }
    }

    pairs
}

struct Emitter<'a> {
    files: &'a [Score],
    max: usize,
    next_id: usize,
    batches: Vec<Batch>,
}

impl<'a> Emitter<'a> {
    fn new(files: &'a [Score], max_files_per_batch: usize) -> Self {
        let max = if max_files_per_batch == 0 {
            usize::MAX
        } else {
            max_files_per_batch
        };
        Self {
            files,
            max,
            next_id: 1,
            batches: Vec::new(),
        }
    }

    fn push(&mut self, members: &[usize], reason: &str) {
        let batch = Batch {
            id: self.next_id,
            files: members.iter().map(|&i| self.files[i].path.clone()).collect(),
            reason: reason.to_string(),
            total_score: members.iter().map(|&i| self.files[i].total).sum(),
        };
        self.next_id += 1;
        self.batches.push(batch);
    }

    fn push_split(&mut self, members: &[usize], reason: &str) {
        for chunk in members.chunks(self.max) {
            self.push(chunk, reason);
        }
    }
}

fn package_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Stable sort by total score, highest first.
fn sort_batches(batches: &mut [Batch]) {
    batches.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
}
