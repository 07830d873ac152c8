//! Session planning and completion.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stint_batch::{Batch, BatchOptions, Grouper};
use stint_core::{
    ChurnSource, FileChange, Finding, OnLimit, ReviewConfig, SortOrder, StintConfig, StintError,
};
use stint_priority::{sort_by_score, Score, Scorer, Weights};
use stint_session::{Session, Status, Store};

use crate::continuation::Continuation;
use crate::filter::{SkipFilter, SkippedFile};

/// The outcome of planning a review: the persisted session plus everything
/// needed to present it.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// The created session, status `in_progress`.
    pub session: Session,
    /// Scores of the files in this session, in review order.
    pub files: Vec<Score>,
    /// The session's files grouped for review, highest priority first.
    pub batches: Vec<Batch>,
    /// Files left for a continuation, in review order.
    pub deferred: Vec<String>,
    /// Files dropped by skip patterns.
    pub skipped: Vec<SkippedFile>,
    /// Files already reviewed earlier in the chain.
    pub excluded: Vec<String>,
}

/// Turns a changed-file list into a review session.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use stint_core::{FileChange, NoChurn, StintConfig};
/// use stint_review::Planner;
/// use stint_session::Store;
///
/// let store = Store::open(Path::new("."), None).unwrap();
/// let config = StintConfig::default();
/// let planner = Planner::new(&store, NoChurn, &config);
/// let changes = vec![FileChange::new("src/auth/login.rs", 40, 3)];
/// if let Some(plan) = planner.plan(changes, "HEAD", "", None).unwrap() {
///     println!("session {}: {} files", plan.session.id, plan.files.len());
/// }
/// ```
pub struct Planner<'a, C> {
    store: &'a Store,
    scorer: Scorer<C>,
    review: ReviewConfig,
    batch: BatchOptions,
    filter: SkipFilter,
}

impl<'a, C: ChurnSource> Planner<'a, C> {
    /// Create a planner writing to `store` and scoring with `churn`.
    pub fn new(store: &'a Store, churn: C, config: &StintConfig) -> Self {
        Self {
            store,
            scorer: Scorer::new(churn).with_weights(Weights::from(&config.scoring)),
            review: config.review.clone(),
            batch: BatchOptions::from(&config.batch),
            filter: SkipFilter::new(&config.review.skip_patterns),
        }
    }

    /// Plan a review over `changes` and persist it as a new session.
    ///
    /// Returns `Ok(None)`, creating nothing, when no file is left after
    /// skip patterns and continuation exclusions.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::FileLimit`] when the per-session limit is
    /// exceeded under [`OnLimit::Stop`], and propagates session store
    /// failures.
    pub fn plan(
        &self,
        changes: Vec<FileChange>,
        base_commit: &str,
        head_commit: &str,
        continuation: Option<&Continuation>,
    ) -> Result<Option<Plan>, StintError> {
        let (kept, skipped) = self.filter.apply(changes);

        let (excluded, eligible): (Vec<FileChange>, Vec<FileChange>) = match continuation {
            Some(cont) => kept.into_iter().partition(|c| cont.covers(&c.path)),
            None => (Vec::new(), kept),
        };
        let excluded: Vec<String> = excluded.into_iter().map(|c| c.path).collect();

        tracing::debug!(
            eligible = eligible.len(),
            skipped = skipped.len(),
            excluded = excluded.len(),
            "filtered changed files"
        );

        if eligible.is_empty() {
            return Ok(None);
        }

        let mut files = self.scorer.score_files(&eligible);
        order_scores(&mut files, self.review.sort, &eligible);
        let total = files.len();

        let max = self.review.max_files;
        let deferred: Vec<String> = if max > 0 && total > max {
            if self.review.on_limit == OnLimit::Stop {
                return Err(StintError::FileLimit { total, max });
            }
            files.split_off(max).into_iter().map(|s| s.path).collect()
        } else {
            Vec::new()
        };

        let grouper = Grouper::new(BatchOptions {
            max_total_files: 0,
            ..self.batch
        });
        let batches = grouper.group(&files);

        let mut session = Session::new(base_commit, head_commit);
        session.set_files(files.iter().map(|s| s.path.clone()).collect());
        session.files_remaining = deferred.len();
        session.total_files_in_diff = total + continuation.map_or(0, |c| c.reviewed.len());
        session.continued_from = continuation.map_or(0, |c| c.from);
        session.transition(Status::InProgress)?;
        self.store.create(&mut session)?;

        tracing::debug!(
            id = session.id,
            files = session.files_reviewed,
            remaining = session.files_remaining,
            "planned review session"
        );

        Ok(Some(Plan {
            session,
            files,
            batches,
            deferred,
            skipped,
            excluded,
        }))
    }
}

/// Order scores for the per-session cut.
///
/// `Priority` sorts by total (stable, descending), `Alpha` by path, and
/// `None` restores the order of `changes`.
///
/// # Examples
///
/// ```
/// use stint_core::{FileChange, NoChurn, SortOrder};
/// use stint_priority::Scorer;
/// use stint_review::order_scores;
///
/// let changes = vec![FileChange::new("b.go", 1, 0), FileChange::new("a.go", 90, 0)];
/// let mut scores = Scorer::new(NoChurn).score_files(&changes);
/// order_scores(&mut scores, SortOrder::None, &changes);
/// assert_eq!(scores[0].path, "b.go");
/// order_scores(&mut scores, SortOrder::Alpha, &changes);
/// assert_eq!(scores[0].path, "a.go");
/// ```
pub fn order_scores(scores: &mut [Score], order: SortOrder, changes: &[FileChange]) {
    match order {
        SortOrder::Priority => sort_by_score(scores),
        SortOrder::Alpha => scores.sort_by(|a, b| a.path.cmp(&b.path)),
        SortOrder::None => {
            let position: HashMap<&str, usize> = changes
                .iter()
                .enumerate()
                .map(|(idx, c)| (c.path.as_str(), idx))
                .collect();
            scores.sort_by_key(|s| position.get(s.path.as_str()).copied().unwrap_or(usize::MAX));
        }
    }
}

/// Attach `findings` to session `id` and mark it completed.
///
/// # Errors
///
/// Returns [`StintError::SessionNotFound`] for an unknown id and propagates
/// store failures.
pub fn complete(store: &Store, id: u32, findings: Vec<Finding>) -> Result<Session, StintError> {
    let mut session = store.load(id)?;
    session.transition(Status::Completed)?;
    session.findings = findings;
    store.save(&session)?;
    tracing::debug!(id, findings = session.findings.len(), "completed session");
    Ok(session)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FindingsDocument {
    List(Vec<Finding>),
    Wrapped { findings: Vec<Finding> },
}

/// Read findings from a JSON file holding either an array of findings or an
/// object with a `findings` array.
///
/// # Errors
///
/// Returns [`StintError::FileNotFound`] if `path` does not exist and
/// [`StintError::Config`] if the content is not a findings document.
pub fn load_findings(path: &Path) -> Result<Vec<Finding>, StintError> {
    if !path.exists() {
        return Err(StintError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let doc: FindingsDocument = serde_json::from_str(&content).map_err(|e| {
        StintError::Config(format!(
            "failed to parse findings from {}: {e}",
            path.display()
        ))
    })?;
    Ok(match doc {
        FindingsDocument::List(findings) | FindingsDocument::Wrapped { findings } => findings,
    })
}
