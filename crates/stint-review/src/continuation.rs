use std::collections::HashSet;

use stint_core::StintError;
use stint_git::{DiffRange, ReviewType};
use stint_session::{Session, Store};

/// What a continuation inherits from its chain.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use stint_git::ReviewType;
/// use stint_review::Continuation;
/// use stint_session::Store;
///
/// let store = Store::open(Path::new("."), None).unwrap();
/// let cont = Continuation::load(&store, 2).unwrap();
/// let range = cont.range(ReviewType::All, None, None);
/// println!("continuing {} over {range}", cont.from);
/// ```
#[derive(Debug, Clone)]
pub struct Continuation {
    /// Session being continued.
    pub from: u32,
    /// Files reviewed anywhere in the chain.
    pub reviewed: Vec<String>,
    /// First session of the chain.
    pub root: Session,
    reviewed_set: HashSet<String>,
}

impl Continuation {
    /// Walk the chain ending at session `from`.
    ///
    /// # Errors
    ///
    /// Fails if any session in the chain cannot be loaded.
    pub fn load(store: &Store, from: u32) -> Result<Self, StintError> {
        let (reviewed, root) = store.collect_reviewed_files(from)?;
        tracing::debug!(from, root = root.id, reviewed = reviewed.len(), "loaded continuation chain");
        Ok(Self::new(from, reviewed, root))
    }

    /// Build a continuation from an already collected chain.
    pub fn new(from: u32, reviewed: Vec<String>, root: Session) -> Self {
        let reviewed_set = reviewed.iter().cloned().collect();
        Self {
            from,
            reviewed,
            root,
            reviewed_set,
        }
    }

    /// Whether `path` was reviewed earlier in the chain.
    pub fn covers(&self, path: &str) -> bool {
        self.reviewed_set.contains(path)
    }

    /// Diff range for the continuation.
    ///
    /// An explicit `base` is used as given. Otherwise the root session's
    /// range is reused, so later commits do not shift the diff under the
    /// chain; a root without a head commit reviewed the working tree.
    pub fn range(&self, review_type: ReviewType, base: Option<&str>, head: Option<&str>) -> DiffRange {
        if base.is_some() || self.root.base_commit.is_empty() {
            return DiffRange::resolve(review_type, base, head);
        }
        DiffRange {
            base: self.root.base_commit.clone(),
            head: match head {
                Some(head) => Some(head.to_string()),
                None if self.root.head_commit.is_empty() => None,
                None => Some(self.root.head_commit.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn root(base: &str, head: &str) -> Session {
        let mut session = Session::new(base, head);
        session.id = 1;
        session
    }

    #[test]
    fn reuses_root_range_by_default() {
        let cont = Continuation::new(3, vec![], root("aaa111", "bbb222"));
        let range = cont.range(ReviewType::All, None, None);
        assert_eq!(range.base, "aaa111");
        assert_eq!(range.head.as_deref(), Some("bbb222"));
    }

    #[test]
    fn working_tree_root_stays_on_working_tree() {
        let cont = Continuation::new(2, vec![], root("aaa111", ""));
        let range = cont.range(ReviewType::Committed, None, None);
        assert_eq!(range.base, "aaa111");
        assert_eq!(range.head, None);
    }

    #[test]
    fn explicit_base_overrides_root() {
        let cont = Continuation::new(2, vec![], root("aaa111", "bbb222"));
        let range = cont.range(ReviewType::All, Some("main"), None);
        assert_eq!(range.base, "main");
        assert_eq!(range.head.as_deref(), Some("HEAD"));
    }

    #[test]
    fn explicit_head_keeps_root_base() {
        let cont = Continuation::new(2, vec![], root("aaa111", ""));
        let range = cont.range(ReviewType::All, None, Some("feature"));
        assert_eq!(range.base, "aaa111");
        assert_eq!(range.head.as_deref(), Some("feature"));
    }

    #[test]
    fn load_collects_chain_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(Path::new("/work/project"), Some(dir.path())).unwrap();

        let mut first = Session::new("base", "");
        first.set_files(vec!["a.go".into(), "b.go".into()]);
        store.create(&mut first).unwrap();
        let mut second = Session::new("base", "");
        second.set_files(vec!["c.go".into()]);
        second.continued_from = first.id;
        store.create(&mut second).unwrap();

        let cont = Continuation::load(&store, second.id).unwrap();
        assert_eq!(cont.from, 2);
        assert_eq!(cont.root.id, 1);
        assert!(cont.covers("a.go"));
        assert!(cont.covers("c.go"));
        assert!(!cont.covers("d.go"));
        assert_eq!(cont.reviewed.len(), 3);
    }

    #[test]
    fn load_missing_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(Path::new("/work/project"), Some(dir.path())).unwrap();
        assert!(matches!(
            Continuation::load(&store, 5),
            Err(StintError::SessionNotFound { id: 5 })
        ));
    }
}
