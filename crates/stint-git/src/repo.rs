//! Repository access via git2.
//!
//! Lists the files changed between two revisions (or a revision and the
//! working tree) with per-file line counts, and counts per-file churn over
//! the history reachable from HEAD.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use git2::{Delta, Diff, DiffFindOptions, DiffOptions, Repository, Sort};
use stint_core::{ChangeStatus, ChurnSource, FileChange, StintError};

use crate::language::detect_language;

/// Which changes a review covers when no explicit base is given.
///
/// # Examples
///
/// ```
/// use stint_git::ReviewType;
///
/// let t: ReviewType = "committed".parse().unwrap();
/// assert_eq!(t, ReviewType::Committed);
/// assert_eq!(ReviewType::default().to_string(), "all");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewType {
    /// Everything not yet committed, staged or not.
    #[default]
    All,
    /// Same range as `All`: HEAD against the working tree.
    Uncommitted,
    /// The last commit against its parent.
    Committed,
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewType::All => write!(f, "all"),
            ReviewType::Uncommitted => write!(f, "uncommitted"),
            ReviewType::Committed => write!(f, "committed"),
        }
    }
}

impl FromStr for ReviewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ReviewType::All),
            "uncommitted" => Ok(ReviewType::Uncommitted),
            "committed" => Ok(ReviewType::Committed),
            other => Err(format!("unknown review type: {other}")),
        }
    }
}

/// A diff range: `base` against `head`, or against the working tree when
/// `head` is `None`.
///
/// # Examples
///
/// ```
/// use stint_git::{DiffRange, ReviewType};
///
/// let range = DiffRange::resolve(ReviewType::Committed, None, None);
/// assert_eq!(range.base, "HEAD~1");
/// assert_eq!(range.head.as_deref(), Some("HEAD"));
///
/// let range = DiffRange::resolve(ReviewType::All, Some("main"), None);
/// assert_eq!(range.base, "main");
/// assert_eq!(range.head.as_deref(), Some("HEAD"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRange {
    /// Base revision.
    pub base: String,
    /// Head revision; `None` means the working tree.
    pub head: Option<String>,
}

impl DiffRange {
    /// Pick the range for a review.
    ///
    /// An explicit `base` wins over `review_type` and pairs with `head`
    /// (default `HEAD`). A `head` without a base is ignored.
    pub fn resolve(review_type: ReviewType, base: Option<&str>, head: Option<&str>) -> Self {
        if let Some(base) = base {
            return Self {
                base: base.to_string(),
                head: Some(head.unwrap_or("HEAD").to_string()),
            };
        }
        match review_type {
            ReviewType::All | ReviewType::Uncommitted => Self {
                base: "HEAD".into(),
                head: None,
            },
            ReviewType::Committed => Self {
                base: "HEAD~1".into(),
                head: Some("HEAD".into()),
            },
        }
    }
}

impl fmt::Display for DiffRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.head {
            Some(head) => write!(f, "{}..{head}", self.base),
            None => write!(f, "{}..<working tree>", self.base),
        }
    }
}

/// An opened repository.
///
/// Churn counts are computed from history on first use and cached for the
/// lifetime of the value. A failed history walk is cached too and is not
/// retried.
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
    churn: OnceCell<Result<HashMap<String, u32>, String>>,
}

impl GitRepo {
    /// Open the repository containing `path`, searching parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::Git`] if no repository is found or it has no
    /// working tree.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use stint_git::GitRepo;
    ///
    /// let repo = GitRepo::discover(Path::new(".")).unwrap();
    /// println!("{}", repo.root().display());
    /// ```
    pub fn discover(path: &Path) -> Result<Self, StintError> {
        let repo = Repository::discover(path)
            .map_err(|e| StintError::Git(format!("not a git repository: {e}")))?;
        let root = repo
            .workdir()
            .ok_or_else(|| StintError::Git("repository has no working tree".into()))?
            .to_path_buf();
        Ok(Self {
            repo,
            root,
            churn: OnceCell::new(),
        })
    }

    /// Repository working tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full commit hash for a revision expression such as `HEAD~1`.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::Git`] if the revision does not name a commit.
    pub fn resolve_commit(&self, rev: &str) -> Result<String, StintError> {
        let commit = self
            .repo
            .revparse_single(rev)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|e| StintError::Git(format!("failed to resolve '{rev}': {e}")))?;
        Ok(commit.id().to_string())
    }

    /// Files changed in `range`, with line counts and language tags.
    ///
    /// Renames are detected; binary files are left out.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::Git`] if a revision cannot be resolved or the
    /// diff cannot be computed.
    pub fn changed_files(&self, range: &DiffRange) -> Result<Vec<FileChange>, StintError> {
        let diff = self.diff(range)?;
        let changes = extract_file_changes(diff)?;
        tracing::debug!(range = %range, files = changes.len(), "listed changed files");
        Ok(changes)
    }

    fn tree(&self, rev: &str) -> Result<git2::Tree<'_>, StintError> {
        self.repo
            .revparse_single(rev)
            .and_then(|obj| obj.peel_to_tree())
            .map_err(|e| StintError::Git(format!("failed to resolve '{rev}': {e}")))
    }

    fn diff(&self, range: &DiffRange) -> Result<Diff<'_>, StintError> {
        let base_tree = self.tree(&range.base)?;
        let mut diff_opts = DiffOptions::new();

        let mut diff = match &range.head {
            Some(head) => {
                let head_tree = self.tree(head)?;
                self.repo
                    .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut diff_opts))
            }
            None => self
                .repo
                .diff_tree_to_workdir_with_index(Some(&base_tree), Some(&mut diff_opts)),
        }
        .map_err(|e| StintError::Git(format!("failed to compute diff: {e}")))?;

        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))
            .map_err(|e| StintError::Git(format!("failed to find renames: {e}")))?;
        Ok(diff)
    }

    fn churn_table(&self) -> Result<&HashMap<String, u32>, StintError> {
        self.churn
            .get_or_init(|| {
                self.count_history().map_err(|e| match e {
                    StintError::Git(msg) => msg,
                    other => other.to_string(),
                })
            })
            .as_ref()
            .map_err(|msg| StintError::Git(msg.clone()))
    }

    /// Walk history from HEAD once, counting the non-merge commits that
    /// touched each path.
    fn count_history(&self) -> Result<HashMap<String, u32>, StintError> {
        let mut counts = HashMap::new();

        if self.repo.head().is_err() {
            return Ok(counts);
        }

        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| StintError::Git(format!("failed to create revwalk: {e}")))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(|e| StintError::Git(format!("failed to sort revwalk: {e}")))?;
        revwalk
            .push_head()
            .map_err(|e| StintError::Git(format!("failed to push HEAD: {e}")))?;

        let mut commits = 0usize;
        for oid in revwalk {
            let oid = oid.map_err(|e| StintError::Git(format!("revwalk error: {e}")))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| StintError::Git(format!("failed to find commit: {e}")))?;
            if commit.parent_count() > 1 {
                continue;
            }
            commits += 1;

            for path in self.touched_paths(&commit)? {
                *counts.entry(path).or_insert(0) += 1;
            }
        }

        tracing::debug!(commits, files = counts.len(), "counted churn");
        Ok(counts)
    }

    fn touched_paths(&self, commit: &git2::Commit<'_>) -> Result<HashSet<String>, StintError> {
        let commit_tree = commit
            .tree()
            .map_err(|e| StintError::Git(format!("failed to get commit tree: {e}")))?;
        let parent_tree = if commit.parent_count() > 0 {
            let parent = commit
                .parent(0)
                .map_err(|e| StintError::Git(format!("failed to get parent: {e}")))?;
            Some(
                parent
                    .tree()
                    .map_err(|e| StintError::Git(format!("failed to get parent tree: {e}")))?,
            )
        } else {
            None
        };

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)
            .map_err(|e| StintError::Git(format!("failed to compute diff: {e}")))?;

        Ok(diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(path_string)
            })
            .collect())
    }
}

impl ChurnSource for GitRepo {
    fn file_churn(&self, path: &str) -> stint_core::Result<u32> {
        Ok(self.churn_table()?.get(path).copied().unwrap_or(0))
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn extract_file_changes(diff: Diff<'_>) -> Result<Vec<FileChange>, StintError> {
    let mut changes = Vec::new();

    for delta in diff.deltas() {
        let old_path = delta.old_file().path().map(path_string);
        let new_path = delta.new_file().path().map(path_string);

        let (path, status, old_path) = match delta.status() {
            Delta::Added | Delta::Untracked => (new_path, ChangeStatus::Added, None),
            Delta::Deleted => (old_path, ChangeStatus::Deleted, None),
            Delta::Renamed => (new_path, ChangeStatus::Renamed, old_path),
            Delta::Unmodified | Delta::Ignored => continue,
            _ => (new_path, ChangeStatus::Modified, None),
        };
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            continue;
        };

        changes.push(FileChange {
            language: Some(detect_language(&path).to_string()),
            path,
            lines_added: 0,
            lines_deleted: 0,
            status,
            old_path,
        });
    }

    // Count lines per file; the file callback sees binary flags once the
    // content is loaded.
    let mut binaries: HashSet<String> = HashSet::new();
    let mut line_counts: HashMap<String, (u32, u32)> = HashMap::new();

    diff.foreach(
        &mut |delta, _progress| {
            if delta.flags().is_binary() {
                if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                    binaries.insert(path_string(path));
                }
            }
            true
        },
        None,
        None,
        Some(&mut |delta, _hunk, line| {
            let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) else {
                return true;
            };
            let entry = line_counts.entry(path_string(path)).or_insert((0, 0));
            match line.origin() {
                '+' => entry.0 += 1,
                '-' => entry.1 += 1,
                _ => {}
            }
            true
        }),
    )
    .map_err(|e| StintError::Git(format!("failed to iterate diff lines: {e}")))?;

    changes.retain(|change| {
        let binary = binaries.contains(&change.path);
        if binary {
            tracing::debug!(path = %change.path, "skipping binary file");
        }
        !binary
    });

    for change in &mut changes {
        if let Some(&(added, deleted)) = line_counts.get(&change.path) {
            change.lines_added = added;
            change.lines_deleted = deleted;
        }
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use git2::{IndexAddOption, Signature};
    use tempfile::TempDir;

    use super::*;

    fn init() -> (TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    fn write(dir: &TempDir, path: &str, content: &str) {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    fn by_path<'a>(changes: &'a [FileChange], path: &str) -> &'a FileChange {
        changes
            .iter()
            .find(|c| c.path == path)
            .unwrap_or_else(|| panic!("{path} missing from {changes:?}"))
    }

    #[test]
    fn resolve_prefers_explicit_base() {
        let range = DiffRange::resolve(ReviewType::Committed, Some("abc123"), Some("def456"));
        assert_eq!(range.base, "abc123");
        assert_eq!(range.head.as_deref(), Some("def456"));

        let range = DiffRange::resolve(ReviewType::Uncommitted, None, Some("ignored"));
        assert_eq!(range.base, "HEAD");
        assert_eq!(range.head, None);
    }

    #[test]
    fn review_type_parses() {
        assert_eq!("ALL".parse::<ReviewType>().unwrap(), ReviewType::All);
        assert_eq!(
            "uncommitted".parse::<ReviewType>().unwrap(),
            ReviewType::Uncommitted
        );
        assert!("staged".parse::<ReviewType>().is_err());
    }

    #[test]
    fn discover_finds_root_from_subdirectory() {
        let (dir, repo) = init();
        write(&dir, "pkg/auth/handler.go", "package auth\n");
        commit_all(&repo, "init");

        let found = GitRepo::discover(&dir.path().join("pkg/auth")).unwrap();
        assert_eq!(
            found.root().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn discover_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitRepo::discover(dir.path()).err().unwrap();
        assert!(matches!(err, StintError::Git(_)));
    }

    #[test]
    fn committed_range_lists_last_commit() {
        let (dir, repo) = init();
        write(&dir, "pkg/auth/handler.go", "package auth\n\nfunc A() {}\n");
        commit_all(&repo, "init");
        write(
            &dir,
            "pkg/auth/handler.go",
            "package auth\n\nfunc A() {}\nfunc B() {}\n",
        );
        write(&dir, "scripts/tool.py", "print('a')\nprint('b')\n");
        commit_all(&repo, "second");

        let git = GitRepo::discover(dir.path()).unwrap();
        let range = DiffRange::resolve(ReviewType::Committed, None, None);
        let changes = git.changed_files(&range).unwrap();
        assert_eq!(changes.len(), 2);

        let handler = by_path(&changes, "pkg/auth/handler.go");
        assert_eq!(handler.status, ChangeStatus::Modified);
        assert_eq!((handler.lines_added, handler.lines_deleted), (1, 0));
        assert_eq!(handler.language.as_deref(), Some("go"));

        let tool = by_path(&changes, "scripts/tool.py");
        assert_eq!(tool.status, ChangeStatus::Added);
        assert_eq!(tool.lines_added, 2);
        assert_eq!(tool.language.as_deref(), Some("python"));
    }

    #[test]
    fn working_tree_changes_are_listed() {
        let (dir, repo) = init();
        write(&dir, "main.go", "package main\n");
        write(&dir, "old.go", "package main\n");
        commit_all(&repo, "init");
        write(&dir, "main.go", "package main\n\nfunc main() {}\n");
        fs::remove_file(dir.path().join("old.go")).unwrap();

        let git = GitRepo::discover(dir.path()).unwrap();
        let changes = git
            .changed_files(&DiffRange::resolve(ReviewType::All, None, None))
            .unwrap();

        let main = by_path(&changes, "main.go");
        assert_eq!(main.status, ChangeStatus::Modified);
        assert_eq!(main.lines_added, 2);

        let old = by_path(&changes, "old.go");
        assert_eq!(old.status, ChangeStatus::Deleted);
        assert_eq!(old.lines_deleted, 1);
    }

    #[test]
    fn explicit_commit_range() {
        let (dir, repo) = init();
        write(&dir, "a.rs", "fn a() {}\n");
        let first = commit_all(&repo, "one");
        write(&dir, "b.rs", "fn b() {}\n");
        commit_all(&repo, "two");
        write(&dir, "c.rs", "fn c() {}\n");
        let third = commit_all(&repo, "three");

        let git = GitRepo::discover(dir.path()).unwrap();
        let range = DiffRange::resolve(
            ReviewType::All,
            Some(&first.to_string()),
            Some(&third.to_string()),
        );
        let mut paths: Vec<String> = git
            .changed_files(&range)
            .unwrap()
            .into_iter()
            .map(|c| c.path)
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["b.rs", "c.rs"]);
        assert_eq!(git.resolve_commit("HEAD").unwrap(), third.to_string());
    }

    #[test]
    fn renames_keep_the_old_path() {
        let (dir, repo) = init();
        let body = "line one\nline two\nline three\nline four\n";
        write(&dir, "src/old_name.rs", body);
        commit_all(&repo, "init");
        fs::remove_file(dir.path().join("src/old_name.rs")).unwrap();
        write(&dir, "src/new_name.rs", body);
        commit_all(&repo, "rename");

        let git = GitRepo::discover(dir.path()).unwrap();
        let changes = git
            .changed_files(&DiffRange::resolve(ReviewType::Committed, None, None))
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "src/new_name.rs");
        assert_eq!(changes[0].status, ChangeStatus::Renamed);
        assert_eq!(changes[0].old_path.as_deref(), Some("src/old_name.rs"));
    }

    #[test]
    fn binary_files_are_skipped() {
        let (dir, repo) = init();
        write(&dir, "README.md", "hello\n");
        commit_all(&repo, "init");
        fs::write(dir.path().join("logo.png"), [0u8, 159, 146, 150, 0, 1, 2]).unwrap();
        write(&dir, "README.md", "hello\nworld\n");
        commit_all(&repo, "binary");

        let git = GitRepo::discover(dir.path()).unwrap();
        let changes = git
            .changed_files(&DiffRange::resolve(ReviewType::Committed, None, None))
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "README.md");
    }

    #[test]
    fn unknown_revision_is_a_git_error() {
        let (dir, repo) = init();
        write(&dir, "a.go", "package a\n");
        commit_all(&repo, "init");

        let git = GitRepo::discover(dir.path()).unwrap();
        let range = DiffRange::resolve(ReviewType::All, Some("no-such-branch"), None);
        assert!(matches!(git.changed_files(&range), Err(StintError::Git(_))));
    }

    #[test]
    fn churn_counts_commits_per_file() {
        let (dir, repo) = init();
        write(&dir, "hot.go", "1\n");
        write(&dir, "cold.go", "1\n");
        commit_all(&repo, "one");
        write(&dir, "hot.go", "1\n2\n");
        commit_all(&repo, "two");
        write(&dir, "hot.go", "1\n2\n3\n");
        commit_all(&repo, "three");

        let git = GitRepo::discover(dir.path()).unwrap();
        assert_eq!(git.file_churn("hot.go").unwrap(), 3);
        assert_eq!(git.file_churn("cold.go").unwrap(), 1);
        assert_eq!(git.file_churn("never.go").unwrap(), 0);
    }

    #[test]
    fn failed_history_walk_is_not_retried() {
        let (dir, repo) = init();
        write(&dir, "a.go", "1\n");
        let first = commit_all(&repo, "one");
        write(&dir, "a.go", "1\n2\n");
        commit_all(&repo, "two");

        let tree = repo.find_commit(first).unwrap().tree_id().to_string();
        fs::remove_file(dir.path().join(".git/objects").join(&tree[..2]).join(&tree[2..])).unwrap();

        let git = GitRepo::discover(dir.path()).unwrap();
        assert!(matches!(git.file_churn("a.go"), Err(StintError::Git(_))));
        assert!(git.churn.get().is_some_and(|outcome| outcome.is_err()));

        let err = git.file_churn("b.go").unwrap_err().to_string();
        assert!(err.starts_with("git error: failed to get parent tree"), "{err}");
    }

    #[test]
    fn churn_in_empty_repository_is_zero() {
        let (dir, _repo) = init();
        let git = GitRepo::discover(dir.path()).unwrap();
        assert_eq!(git.file_churn("anything.rs").unwrap(), 0);
    }
}
