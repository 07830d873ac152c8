use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stint_core::StintError;

use crate::atomic::write_atomic;
use crate::session::Session;

const SESSIONS_DIR: &str = "sessions";
const META_FILE: &str = "meta.json";
const LATEST_FILE: &str = "latest";
const PROJECT_FILE: &str = "project.json";

/// Contents of `project.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Absolute project path.
    pub path: String,
    /// Last path component.
    pub name: String,
}

/// First 16 hex characters of the SHA-256 of `path`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use stint_session::project_hash;
///
/// let hash = project_hash(Path::new("/home/dev/project"));
/// assert_eq!(hash.len(), 16);
/// assert_eq!(hash, project_hash(Path::new("/home/dev/project")));
/// ```
pub fn project_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Session storage for one project.
///
/// Single-process access is assumed; nothing is locked.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use stint_session::{Session, Status, Store};
///
/// let store = Store::open(Path::new("."), None).unwrap();
/// let mut session = Session::new("HEAD", "");
/// session.set_files(vec!["src/main.rs".into()]);
/// session.transition(Status::InProgress).unwrap();
/// store.create(&mut session).unwrap();
/// println!("session {}", session.id);
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    project_path: PathBuf,
    state_dir: PathBuf,
}

impl Store {
    /// Open (creating if needed) the store for `project_path`.
    ///
    /// `state_dir` overrides the default
    /// `$HOME/.stint/review/<project hash>`. `project.json` is written only
    /// if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::Config`] if no home directory is known or the
    /// state directory cannot be prepared.
    pub fn open(project_path: &Path, state_dir: Option<&Path>) -> Result<Self, StintError> {
        let project_path = std::path::absolute(project_path).map_err(|e| {
            StintError::Config(format!(
                "failed to resolve project path {}: {e}",
                project_path.display()
            ))
        })?;
        let state_dir = match state_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_state_dir(&project_path)?,
        };

        let sessions_dir = state_dir.join(SESSIONS_DIR);
        fs::create_dir_all(&sessions_dir).map_err(|e| {
            StintError::Config(format!(
                "failed to create sessions directory {}: {e}",
                sessions_dir.display()
            ))
        })?;

        let store = Self {
            project_path,
            state_dir,
        };
        store.write_project_meta()?;
        Ok(store)
    }

    /// Absolute path of the project this store belongs to.
    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Root of the store on disk.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn sessions_dir(&self) -> PathBuf {
        self.state_dir.join(SESSIONS_DIR)
    }

    fn session_dir(&self, id: u32) -> PathBuf {
        self.sessions_dir().join(id.to_string())
    }

    fn latest_path(&self) -> PathBuf {
        self.sessions_dir().join(LATEST_FILE)
    }

    fn write_project_meta(&self) -> Result<(), StintError> {
        let meta_path = self.state_dir.join(PROJECT_FILE);
        if meta_path.exists() {
            return Ok(());
        }
        let meta = ProjectMeta {
            path: self.project_path.to_string_lossy().into_owned(),
            name: self
                .project_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let content = serde_json::to_string_pretty(&meta)?;
        fs::write(&meta_path, content).map_err(|e| {
            StintError::Config(format!(
                "failed to write project metadata to {}: {e}",
                meta_path.display()
            ))
        })
    }

    /// Project metadata recorded in `project.json`.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::Io`] or [`StintError::Serialization`] if the
    /// file cannot be read or decoded.
    pub fn project_meta(&self) -> Result<ProjectMeta, StintError> {
        let content = fs::read_to_string(self.state_dir.join(PROJECT_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Ids of every session directory, readable or not.
    fn session_ids(&self) -> Result<Vec<u32>, StintError> {
        let entries = match fs::read_dir(self.sessions_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Assign the next id and creation time to `session`, then save it.
    ///
    /// The id is one more than the highest session directory present, so
    /// deleting the newest session frees its id for reuse.
    ///
    /// # Errors
    ///
    /// Propagates directory listing and [`Store::save`] failures.
    pub fn create(&self, session: &mut Session) -> Result<(), StintError> {
        let next = self.session_ids()?.last().copied().unwrap_or(0) + 1;
        session.id = next;
        session.created_at = Utc::now();
        tracing::debug!(id = next, "creating session");
        self.save(session)
    }

    /// Write `session` to `sessions/<id>/meta.json` and point `latest` at it.
    ///
    /// Saving the same session twice produces the same file. A failure to
    /// update `latest` is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::SessionNotCreated`] for a session without an
    /// id, [`StintError::SessionIo`] if the directory or file cannot be
    /// written, or [`StintError::Serialization`] if encoding fails.
    pub fn save(&self, session: &Session) -> Result<(), StintError> {
        let id = session.id;
        if id == 0 {
            return Err(StintError::SessionNotCreated);
        }
        let dir = self.session_dir(id);
        fs::create_dir_all(&dir).map_err(|source| StintError::SessionIo {
            id,
            step: "create session dir",
            source,
        })?;

        let content = serde_json::to_string_pretty(session)?;
        write_atomic(&dir.join(META_FILE), content.as_bytes()).map_err(|source| {
            StintError::SessionIo {
                id,
                step: "write session meta",
                source,
            }
        })?;

        if let Err(e) = fs::write(self.latest_path(), id.to_string()) {
            tracing::warn!(id, error = %e, "failed to update latest session marker");
        }
        Ok(())
    }

    /// Load session `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::SessionNotFound`] if no such session exists,
    /// [`StintError::SessionIo`] if it cannot be read, and
    /// [`StintError::SessionCorrupt`] if it cannot be decoded.
    pub fn load(&self, id: u32) -> Result<Session, StintError> {
        let path = self.session_dir(id).join(META_FILE);
        let content = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StintError::SessionNotFound { id }
            } else {
                StintError::SessionIo {
                    id,
                    step: "read session meta",
                    source,
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|source| StintError::SessionCorrupt { id, source })
    }

    /// The session with the highest id.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::NoSessions`] when the store is empty.
    pub fn load_latest(&self) -> Result<Session, StintError> {
        self.list()?.pop().ok_or(StintError::NoSessions)
    }

    /// Id recorded in the `latest` marker, if any.
    pub fn latest_marker(&self) -> Option<u32> {
        fs::read_to_string(self.latest_path())
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// Every readable session, ascending by id.
    ///
    /// Entries that are not session directories, or whose metadata cannot
    /// be read or decoded, are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::Io`] if the sessions directory exists but
    /// cannot be listed.
    pub fn list(&self) -> Result<Vec<Session>, StintError> {
        let mut sessions = Vec::new();
        for id in self.session_ids()? {
            match self.load(id) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::debug!(id, error = %e, "skipping unreadable session"),
            }
        }
        Ok(sessions)
    }

    /// Remove session `id` and everything stored with it.
    ///
    /// If the `latest` marker named it, the marker moves to the highest
    /// remaining session, or is removed when none remain.
    ///
    /// # Errors
    ///
    /// Returns [`StintError::SessionNotFound`] if the session does not
    /// exist, or [`StintError::SessionIo`] if removal fails.
    pub fn delete(&self, id: u32) -> Result<(), StintError> {
        self.delete_with(id, Self::retarget_latest)
    }

    fn delete_with<F>(&self, id: u32, retarget: F) -> Result<(), StintError>
    where
        F: FnOnce(&Self) -> Result<(), StintError>,
    {
        let dir = self.session_dir(id);
        if !dir.is_dir() {
            return Err(StintError::SessionNotFound { id });
        }
        fs::remove_dir_all(&dir).map_err(|source| StintError::SessionIo {
            id,
            step: "remove session dir",
            source,
        })?;
        tracing::debug!(id, "deleted session");

        if self.latest_marker() == Some(id) {
            if let Err(e) = retarget(self) {
                tracing::warn!(id, error = %e, "failed to update latest session marker");
            }
        }
        Ok(())
    }

    /// Point `latest` at the highest remaining session, or remove it.
    fn retarget_latest(&self) -> Result<(), StintError> {
        match self.session_ids()?.last() {
            Some(newest) => fs::write(self.latest_path(), newest.to_string())?,
            None => fs::remove_file(self.latest_path())?,
        }
        Ok(())
    }

    /// Every file reviewed in the chain ending at `id`, and the chain root.
    ///
    /// Follows `continued_from` links back to the session whose
    /// `continued_from` is 0. Files are deduplicated and keep the order in
    /// which they were first met, newest session first.
    ///
    /// # Errors
    ///
    /// Any session in the chain that cannot be loaded aborts the walk; a
    /// chain that loops back on itself is a [`StintError::Config`] error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use stint_session::Store;
    ///
    /// let store = Store::open(Path::new("."), None).unwrap();
    /// let (files, root) = store.collect_reviewed_files(3).unwrap();
    /// println!("{} files reviewed since {}", files.len(), root.base_commit);
    /// ```
    pub fn collect_reviewed_files(&self, id: u32) -> Result<(Vec<String>, Session), StintError> {
        let mut files = Vec::new();
        let mut seen_files = HashSet::new();
        let mut visited = HashSet::new();
        let mut current = id;

        loop {
            if !visited.insert(current) {
                return Err(StintError::Config(format!(
                    "session {id}: continuation chain loops back to session {current}"
                )));
            }

            let session = self.load(current)?;
            for file in &session.files {
                if seen_files.insert(file.clone()) {
                    files.push(file.clone());
                }
            }
            tracing::debug!(id = current, next = session.continued_from, "walked chain");

            if session.is_root() {
                return Ok((files, session));
            }
            current = session.continued_from;
        }
    }
}

/// `$HOME/.stint/review/<project hash>`.
fn default_state_dir(project_path: &Path) -> Result<PathBuf, StintError> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .ok_or_else(|| {
            StintError::Config("cannot locate home directory; pass --state-dir".into())
        })?;
    Ok(PathBuf::from(home)
        .join(".stint")
        .join("review")
        .join(project_hash(project_path)))
}
