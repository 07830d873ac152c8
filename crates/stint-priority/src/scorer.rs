use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use stint_core::conventions::{is_test_file, test_candidates};
use stint_core::{ChurnSource, FileChange, ScoringConfig};

use crate::critical::is_critical_path;

/// Commit count at which the churn component saturates.
pub const CHURN_CAP: u32 = 50;

/// Share of the recency weight every file receives.
pub const RECENCY_BASELINE: f64 = 50.0;

/// Weights of the five scoring components.
///
/// The defaults sum to 1.0, which keeps totals on a 0–100 scale. Custom
/// weights are taken as given.
///
/// # Examples
///
/// ```
/// use stint_priority::Weights;
///
/// let w = Weights::default();
/// assert_eq!(w.lines_changed, 0.30);
/// assert_eq!(w.recency, 0.10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Lines-changed weight.
    pub lines_changed: f64,
    /// Critical-path weight.
    pub criticality: f64,
    /// Churn weight.
    pub churn: f64,
    /// Missing-tests weight.
    pub test_coverage: f64,
    /// Recency weight.
    pub recency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

impl From<&ScoringConfig> for Weights {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            lines_changed: config.lines_changed,
            criticality: config.criticality,
            churn: config.churn,
            test_coverage: config.test_coverage,
            recency: config.recency,
        }
    }
}

/// Weighted contribution of each signal to a [`Score`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Contribution of the change size.
    pub lines_changed: f64,
    /// Contribution of critical-path membership.
    pub criticality: f64,
    /// Contribution of historical churn.
    pub churn: f64,
    /// Contribution of missing tests.
    pub test_coverage: f64,
    /// Recency baseline.
    pub recency: f64,
}

impl Breakdown {
    /// Sum of all components.
    pub fn sum(&self) -> f64 {
        self.lines_changed + self.criticality + self.churn + self.test_coverage + self.recency
    }
}

/// Priority of one changed file.
///
/// # Examples
///
/// ```
/// use stint_core::{FileChange, NoChurn};
/// use stint_priority::Scorer;
///
/// let scores = Scorer::new(NoChurn).score_files(&[FileChange::new("pkg/auth/login.go", 10, 2)]);
/// let score = &scores[0];
/// assert!(score.is_critical_path);
/// assert!((score.breakdown.sum() - score.total).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// File path, as given by the input [`FileChange`].
    pub path: String,
    /// Overall priority (0–100 with weights summing to 1.0).
    pub total: f64,
    /// Lines added + deleted.
    pub lines_changed: u32,
    /// Whether the path matched a critical pattern.
    pub is_critical_path: bool,
    /// Commits that touched the file; 0 when the lookup failed.
    pub churn_count: u32,
    /// Whether the file is a test or has a test in the same change set.
    pub has_tests: bool,
    /// Per-signal contributions.
    pub breakdown: Breakdown,
}

/// Scores changed files by review priority.
///
/// Churn is looked up through a [`ChurnSource`]; lookup failures count as
/// zero churn and never fail scoring.
pub struct Scorer<C> {
    churn: C,
    weights: Weights,
}

impl<C: ChurnSource> Scorer<C> {
    /// Create a scorer with default weights.
    pub fn new(churn: C) -> Self {
        Self {
            churn,
            weights: Weights::default(),
        }
    }

    /// Replace the scoring weights.
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// The weights in use.
    pub fn weights(&self) -> Weights {
        self.weights
    }

    /// Score every file and return them highest priority first.
    ///
    /// The lines-changed component is relative to the largest change in
    /// `files`. Files with equal totals keep their input order.
    ///
    /// # Examples
    ///
    /// ```
    /// use stint_core::{FileChange, NoChurn};
    /// use stint_priority::Scorer;
    ///
    /// let files = vec![
    ///     FileChange::new("pkg/utils/helper.go", 10, 0),
    ///     FileChange::new("pkg/auth/handler.go", 50, 10),
    /// ];
    /// let scores = Scorer::new(NoChurn).score_files(&files);
    /// assert_eq!(scores[0].path, "pkg/auth/handler.go");
    /// ```
    pub fn score_files(&self, files: &[FileChange]) -> Vec<Score> {
        let max_lines = files
            .iter()
            .map(FileChange::lines_changed)
            .max()
            .unwrap_or(0)
            .max(1);

        let test_files: HashSet<&str> = files
            .iter()
            .map(|f| f.path.as_str())
            .filter(|path| is_test_file(path))
            .collect();

        let mut churn_failures = 0usize;
        let mut churn_error = None;
        let mut scores: Vec<Score> = files
            .iter()
            .map(|file| {
                let churn_count = match self.churn.file_churn(&file.path) {
                    Ok(count) => count,
                    Err(e) => {
                        churn_failures += 1;
                        churn_error.get_or_insert(e);
                        0
                    }
                };
                self.score_file(file, churn_count, max_lines, &test_files)
            })
            .collect();

        if let Some(error) = churn_error {
            tracing::warn!(
                files = churn_failures,
                error = %error,
                "churn lookup failed, scoring churn as 0"
            );
        }

        sort_by_score(&mut scores);
        scores
    }

    fn score_file(
        &self,
        file: &FileChange,
        churn_count: u32,
        max_lines: u32,
        test_files: &HashSet<&str>,
    ) -> Score {
        let w = &self.weights;
        let lines_changed = file.lines_changed();

        let lines_score = f64::from(lines_changed) / f64::from(max_lines) * 100.0 * w.lines_changed;

        let is_critical = is_critical_path(&file.path);
        let critical_score = if is_critical {
            100.0 * w.criticality
        } else {
            0.0
        };

        let churn_score =
            f64::from(churn_count.min(CHURN_CAP)) / f64::from(CHURN_CAP) * 100.0 * w.churn;

        let is_test = is_test_file(&file.path);
        let has_tests = is_test || has_associated_tests(&file.path, test_files);
        let test_score = if has_tests { 0.0 } else { 100.0 * w.test_coverage };

        // No temporal signal is available here; every file gets the baseline.
        let recency_score = RECENCY_BASELINE * w.recency;

        let breakdown = Breakdown {
            lines_changed: lines_score,
            criticality: critical_score,
            churn: churn_score,
            test_coverage: test_score,
            recency: recency_score,
        };

        Score {
            path: file.path.clone(),
            total: breakdown.sum(),
            lines_changed,
            is_critical_path: is_critical,
            churn_count,
            has_tests,
            breakdown,
        }
    }
}

fn has_associated_tests(path: &str, test_files: &HashSet<&str>) -> bool {
    test_candidates(path)
        .iter()
        .any(|candidate| test_files.contains(candidate.as_str()))
}

/// Sort scores by total, highest first, keeping input order on ties.
///
/// # Examples
///
/// ```
/// use stint_core::{FileChange, NoChurn};
/// use stint_priority::{sort_by_score, Scorer};
///
/// let mut scores = Scorer::new(NoChurn).score_files(&[
///     FileChange::new("a.go", 1, 0),
///     FileChange::new("b.go", 9, 0),
/// ]);
/// scores.reverse();
/// sort_by_score(&mut scores);
/// assert_eq!(scores[0].path, "b.go");
/// ```
pub fn sort_by_score(scores: &mut [Score]) {
    scores.sort_by(|a, b| b.total.total_cmp(&a.total));
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use stint_core::{NoChurn, StintError};

    use super::*;

    struct FailingChurn;

    impl ChurnSource for FailingChurn {
        fn file_churn(&self, _path: &str) -> stint_core::Result<u32> {
            Err(StintError::Git("history unavailable".into()))
        }
    }

    fn score(path: &str, total: f64) -> Score {
        Score {
            path: path.into(),
            total,
            lines_changed: 0,
            is_critical_path: false,
            churn_count: 0,
            has_tests: false,
            breakdown: Breakdown::default(),
        }
    }

    fn find<'a>(scores: &'a [Score], path: &str) -> &'a Score {
        scores
            .iter()
            .find(|s| s.path == path)
            .unwrap_or_else(|| panic!("no score for {path}"))
    }

    #[test]
    fn default_weights_sum_to_one() {
        let w = Weights::default();
        let total = w.lines_changed + w.criticality + w.churn + w.test_coverage + w.recency;
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(w.criticality, 0.25);
        assert_eq!(w.churn, 0.20);
        assert_eq!(w.test_coverage, 0.15);
    }

    #[test]
    fn custom_weights_are_applied() {
        let custom = Weights {
            lines_changed: 0.5,
            criticality: 0.2,
            churn: 0.1,
            test_coverage: 0.1,
            recency: 0.1,
        };
        let scorer = Scorer::new(NoChurn).with_weights(custom);
        assert_eq!(scorer.weights(), custom);
    }

    #[test]
    fn empty_input_yields_no_scores() {
        assert!(Scorer::new(NoChurn).score_files(&[]).is_empty());
    }

    #[test]
    fn single_critical_file_without_tests() {
        let scores = Scorer::new(NoChurn).score_files(&[FileChange::new("pkg/auth/handler.go", 50, 10)]);
        let s = &scores[0];
        assert!(s.is_critical_path);
        assert!(!s.has_tests);
        assert_eq!(s.lines_changed, 60);
        // Largest change in the set: full lines weight.
        assert!((s.breakdown.lines_changed - 30.0).abs() < 1e-9);
        assert!((s.breakdown.criticality - 25.0).abs() < 1e-9);
        assert_eq!(s.breakdown.churn, 0.0);
        assert!((s.breakdown.test_coverage - 15.0).abs() < 1e-9);
        assert!((s.breakdown.recency - 5.0).abs() < 1e-9);
        assert!((s.total - 75.0).abs() < 1e-9);
    }

    #[test]
    fn components_sum_to_total_and_stay_in_range() {
        let mut churn = HashMap::new();
        churn.insert("pkg/api/routes.go".to_string(), 120);
        churn.insert("pkg/models/user.go".to_string(), 7);
        let files = vec![
            FileChange::new("pkg/api/routes.go", 400, 20),
            FileChange::new("pkg/models/user.go", 3, 1),
            FileChange::new("pkg/models/user_test.go", 30, 0),
            FileChange::new("image.png", 0, 0),
        ];
        let scores = Scorer::new(churn).score_files(&files);
        assert_eq!(scores.len(), files.len());
        for s in &scores {
            let b = &s.breakdown;
            for part in [b.lines_changed, b.criticality, b.churn, b.test_coverage, b.recency] {
                assert!(part >= 0.0, "negative component for {}", s.path);
            }
            assert!((b.sum() - s.total).abs() < 1e-9, "breakdown mismatch for {}", s.path);
            assert!((0.0..=100.0).contains(&s.total), "{} out of range", s.total);
        }
    }

    #[test]
    fn churn_is_capped_at_fifty_commits() {
        let mut churn = HashMap::new();
        churn.insert("hot.go".to_string(), 500);
        churn.insert("warm.go".to_string(), 25);
        let scores = Scorer::new(churn).score_files(&[
            FileChange::new("hot.go", 1, 0),
            FileChange::new("warm.go", 1, 0),
        ]);
        let hot = find(&scores, "hot.go");
        let warm = find(&scores, "warm.go");
        assert_eq!(hot.churn_count, 500);
        assert!((hot.breakdown.churn - 20.0).abs() < 1e-9);
        assert!((warm.breakdown.churn - 10.0).abs() < 1e-9);
    }

    #[test]
    fn churn_failures_count_as_zero() {
        let scores = Scorer::new(FailingChurn).score_files(&[FileChange::new("main.go", 5, 5)]);
        assert_eq!(scores[0].churn_count, 0);
        assert_eq!(scores[0].breakdown.churn, 0.0);
    }

    struct PartialChurn;

    impl ChurnSource for PartialChurn {
        fn file_churn(&self, path: &str) -> stint_core::Result<u32> {
            match path {
                "hot.go" => Ok(50),
                _ => Err(StintError::Git("object not found".into())),
            }
        }
    }

    #[test]
    fn churn_failure_on_one_file_leaves_others_scored() {
        let scores = Scorer::new(PartialChurn).score_files(&[
            FileChange::new("cold.go", 5, 0),
            FileChange::new("hot.go", 5, 0),
        ]);
        assert_eq!(find(&scores, "hot.go").churn_count, 50);
        assert_eq!(find(&scores, "cold.go").churn_count, 0);
        assert_eq!(scores[0].path, "hot.go");
    }

    #[test]
    fn tests_in_the_same_change_set_count_as_coverage() {
        let files = vec![
            FileChange::new("pkg/auth/handler.go", 20, 0),
            FileChange::new("pkg/auth/handler_test.go", 30, 0),
            FileChange::new("pkg/utils/helper.go", 10, 0),
        ];
        let scores = Scorer::new(NoChurn).score_files(&files);

        let handler = find(&scores, "pkg/auth/handler.go");
        assert!(handler.has_tests);
        assert_eq!(handler.breakdown.test_coverage, 0.0);

        let test = find(&scores, "pkg/auth/handler_test.go");
        assert!(test.has_tests);
        assert_eq!(test.breakdown.test_coverage, 0.0);

        let helper = find(&scores, "pkg/utils/helper.go");
        assert!(!helper.has_tests);
        assert!(helper.breakdown.test_coverage > 0.0);
    }

    #[test]
    fn binary_files_have_zero_lines() {
        let scores = Scorer::new(NoChurn).score_files(&[FileChange::new("image.png", 0, 0)]);
        assert_eq!(scores[0].lines_changed, 0);
        assert_eq!(scores[0].breakdown.lines_changed, 0.0);
    }

    #[test]
    fn results_are_sorted_descending() {
        let files = vec![
            FileChange::new("pkg/utils/helper.go", 10, 0),
            FileChange::new("pkg/auth/handler.go", 50, 10),
            FileChange::new("main.go", 5, 5),
        ];
        let scores = Scorer::new(NoChurn).score_files(&files);
        assert_eq!(scores[0].path, "pkg/auth/handler.go");
        assert!(scores.windows(2).all(|w| w[0].total >= w[1].total));
    }

    #[test]
    fn sort_orders_distinct_totals() {
        let mut scores = vec![score("low", 70.0), score("high", 90.0), score("mid", 80.0)];
        sort_by_score(&mut scores);
        let order: Vec<&str> = scores.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
    }

    #[test]
    fn sort_keeps_input_order_on_ties() {
        let mut scores = vec![
            score("first", 40.0),
            score("top", 60.0),
            score("second", 40.0),
            score("third", 40.0),
        ];
        sort_by_score(&mut scores);
        let order: Vec<&str> = scores.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(order, vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn identical_files_keep_input_order() {
        let files = vec![
            FileChange::new("pkg/b/two.go", 10, 0),
            FileChange::new("pkg/a/one.go", 10, 0),
        ];
        let scores = Scorer::new(NoChurn).score_files(&files);
        assert_eq!(scores[0].total, scores[1].total);
        assert_eq!(scores[0].path, "pkg/b/two.go");
        assert_eq!(scores[1].path, "pkg/a/one.go");
    }

    #[test]
    fn score_serializes_snake_case() {
        let json = serde_json::to_value(score("a.go", 1.0)).unwrap();
        assert!(json.get("is_critical_path").is_some());
        assert!(json["breakdown"].get("test_coverage").is_some());
    }
}
