//! Integration test: git diff → score → plan → continue on a scratch repository.

use std::path::Path;

use git2::{Repository, Signature};
use stint_core::StintConfig;
use stint_git::{DiffRange, GitRepo, ReviewType};
use stint_review::{Continuation, Planner};
use stint_session::Store;

fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, content).unwrap();
}

#[test]
fn working_tree_chain_on_scratch_repo() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    write(dir.path(), "pkg/auth/login.go", "package auth\n");
    write(dir.path(), "pkg/auth/login_test.go", "package auth\n");
    write(dir.path(), "docs/notes.md", "notes\n");
    commit_all(&repo, "initial");

    // Step 1: uncommitted edits
    write(dir.path(), "pkg/auth/login.go", &"package auth\nfunc Login() {}\n".repeat(10));
    write(dir.path(), "pkg/auth/login_test.go", "package auth\nfunc TestLogin() {}\n");
    write(dir.path(), "docs/notes.md", "notes\nmore notes\n");

    let git = GitRepo::discover(dir.path()).unwrap();
    let state = tempfile::tempdir().unwrap();
    let store = Store::open(git.root(), Some(state.path())).unwrap();

    let mut config = StintConfig::default();
    config.review.max_files = 2;
    let planner = Planner::new(&store, &git, &config);

    let range = DiffRange::resolve(ReviewType::Uncommitted, None, None);
    let base = git.resolve_commit(&range.base).unwrap();
    let changes = git.changed_files(&range).unwrap();
    assert_eq!(changes.len(), 3);

    let first = planner.plan(changes, &base, "", None).unwrap().unwrap();
    assert_eq!(first.session.id, 1);
    assert_eq!(first.session.head_commit, "");
    assert_eq!(first.files[0].path, "pkg/auth/login.go");
    assert!(first.files[0].is_critical_path);
    assert_eq!(first.deferred, vec!["docs/notes.md".to_string()]);

    // The test file travels with its source.
    assert!(first
        .batches
        .iter()
        .any(|b| b.files.contains(&"pkg/auth/login.go".to_string())
            && b.files.contains(&"pkg/auth/login_test.go".to_string())));

    // Step 2: a new file is staged before continuing
    write(dir.path(), "cmd/main.go", "package main\n");
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("cmd/main.go")).unwrap();
    index.write().unwrap();

    let cont = Continuation::load(&store, first.session.id).unwrap();
    let range = cont.range(ReviewType::All, None, None);
    assert_eq!(range.base, base);
    assert_eq!(range.head, None);

    let changes = git.changed_files(&range).unwrap();
    let second = planner.plan(changes, &base, "", Some(&cont)).unwrap().unwrap();
    assert_eq!(second.session.id, 2);
    assert_eq!(second.session.continued_from, 1);
    assert_eq!(second.excluded.len(), 2);
    assert_eq!(second.session.files.len(), 2);
    assert!(second.session.files.contains(&"cmd/main.go".to_string()));
    assert!(second.session.files.contains(&"docs/notes.md".to_string()));
    assert_eq!(second.session.total_files_in_diff, 4);
    assert!(!second.session.has_remaining());

    // Step 3: nothing left
    let cont = Continuation::load(&store, second.session.id).unwrap();
    assert_eq!(cont.root.id, 1);
    let changes = git.changed_files(&cont.range(ReviewType::All, None, None)).unwrap();
    assert!(planner.plan(changes, &base, "", Some(&cont)).unwrap().is_none());
    assert_eq!(store.list().unwrap().len(), 2);
}
