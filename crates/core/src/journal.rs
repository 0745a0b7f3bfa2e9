//! Rollback journal for multi-step session mutations.
//!
//! Each completed step pushes its inverse. If a later step fails, the
//! inverses run newest first so the store ends up where it started. A
//! journal that is committed simply forgets its inverses.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::error::RepositoryError;
use crate::session_index::{self, INDEX_FILE_NAME};
use crate::types::Session;

/// Inverse of one completed step.
pub enum Undo {
    /// Move `to` back to `from`.
    Rename { from: PathBuf, to: PathBuf },
    /// Put `entry` back into the index of `project_dir`.
    Reinsert { project_dir: PathBuf, entry: Session },
    /// Drop `session_id` from the index of `project_dir`.
    RemoveEntry { project_dir: PathBuf, session_id: String },
    /// Replace `path` with the saved copy of its previous contents.
    RestoreContents { path: PathBuf, saved: TempPath },
    /// Remove the directory `path` if nothing but an empty index is left in it.
    CreateDir { path: PathBuf },
}

impl fmt::Debug for Undo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Undo::Rename { from, to } => write!(f, "rename {} -> {}", to.display(), from.display()),
            Undo::Reinsert { project_dir, entry } => {
                write!(f, "reinsert {} into {}", entry.session_id, project_dir.display())
            }
            Undo::RemoveEntry { project_dir, session_id } => {
                write!(f, "remove {} from {}", session_id, project_dir.display())
            }
            Undo::RestoreContents { path, .. } => write!(f, "restore contents of {}", path.display()),
            Undo::CreateDir { path } => write!(f, "remove created {}", path.display()),
        }
    }
}

impl Undo {
    fn apply(self) -> Result<(), RepositoryError> {
        match self {
            Undo::Rename { from, to } => {
                std::fs::rename(&to, &from).map_err(|e| RepositoryError::io(&to, e))
            }
            Undo::Reinsert { project_dir, entry } => {
                session_index::upsert_entry(&project_dir, &entry)?;
                Ok(())
            }
            Undo::RemoveEntry { project_dir, session_id } => {
                session_index::remove_entry(&project_dir, &session_id)?;
                Ok(())
            }
            Undo::RestoreContents { path, saved } => saved
                .persist(&path)
                .map_err(|e| RepositoryError::io(&path, e.error)),
            Undo::CreateDir { path } => remove_if_vacant(&path),
        }
    }
}

/// Remove `dir` when it is empty or holds only an index with no entries.
fn remove_if_vacant(dir: &Path) -> Result<(), RepositoryError> {
    let names = std::fs::read_dir(dir)
        .and_then(|entries| entries.map(|e| e.map(|e| e.file_name())).collect::<io::Result<Vec<_>>>())
        .map_err(|e| RepositoryError::io(dir, e))?;

    match names.as_slice() {
        [] => {}
        [name] if name.to_str() == Some(INDEX_FILE_NAME) => {
            let index = session_index::read_index(dir)?;
            if !index.entries.is_empty() {
                debug!("Keeping {}: index still has entries", dir.display());
                return Ok(());
            }
            let path = session_index::index_path(dir);
            std::fs::remove_file(&path).map_err(|e| RepositoryError::io(&path, e))?;
        }
        _ => {
            debug!("Keeping {}: not empty", dir.display());
            return Ok(());
        }
    }
    std::fs::remove_dir(dir).map_err(|e| RepositoryError::io(dir, e))
}

/// Ordered record of completed steps.
#[derive(Debug, Default)]
pub struct Journal {
    steps: Vec<Undo>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, undo: Undo) {
        self.steps.push(undo);
    }

    /// Record a completed rename of `from` to `to`.
    pub fn renamed(&mut self, from: &Path, to: &Path) {
        self.record(Undo::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }

    /// Create `dir` and its missing parents, recording each directory made
    /// so a rollback can take it away again.
    pub fn create_dir_all(&mut self, dir: &Path) -> io::Result<()> {
        let missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        std::fs::create_dir_all(dir)?;
        for path in missing.into_iter().rev() {
            self.record(Undo::CreateDir { path });
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Keep every step.
    pub fn commit(self) {
        debug!("Committed {} step(s)", self.steps.len());
    }

    /// Undo every step, newest first. Keeps going past failures and returns
    /// whether all inverses succeeded.
    pub fn rollback(self) -> bool {
        let mut complete = true;
        for undo in self.steps.into_iter().rev() {
            let label = format!("{undo:?}");
            match undo.apply() {
                Ok(()) => debug!("Rolled back: {}", label),
                Err(e) => {
                    warn!("Rollback step failed ({}): {}", label, e);
                    complete = false;
                }
            }
        }
        complete
    }

    /// Roll back and wrap `error`. An empty journal means nothing changed on
    /// disk, so the error is returned as is.
    pub fn abort(self, error: RepositoryError) -> RepositoryError {
        if self.is_empty() {
            return error;
        }
        let rolled_back = self.rollback();
        RepositoryError::PartialMove {
            source: Box::new(error),
            rolled_back,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_index::{read_index, upsert_entry};
    use tempfile::TempDir;

    #[test]
    fn test_rollback_runs_newest_first() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        std::fs::write(&a, "x").unwrap();

        let mut journal = Journal::new();
        std::fs::rename(&a, &b).unwrap();
        journal.renamed(&a, &b);
        std::fs::rename(&b, &c).unwrap();
        journal.renamed(&b, &c);

        assert!(journal.rollback());
        assert!(a.exists());
        assert!(!b.exists());
        assert!(!c.exists());
    }

    #[test]
    fn test_rollback_reports_failed_step() {
        let dir = TempDir::new().unwrap();
        let mut journal = Journal::new();
        journal.renamed(&dir.path().join("from"), &dir.path().join("never-existed"));
        assert!(!journal.rollback());
    }

    #[test]
    fn test_rollback_index_steps() {
        let dir = TempDir::new().unwrap();
        let kept = Session::new("kept", dir.path().join("kept.jsonl"));
        let added = Session::new("added", dir.path().join("added.jsonl"));
        upsert_entry(dir.path(), &added).unwrap();

        let mut journal = Journal::new();
        journal.record(Undo::Reinsert {
            project_dir: dir.path().to_path_buf(),
            entry: kept,
        });
        journal.record(Undo::RemoveEntry {
            project_dir: dir.path().to_path_buf(),
            session_id: "added".into(),
        });
        assert!(journal.rollback());

        let index = read_index(dir.path()).unwrap();
        let ids: Vec<&str> = index.entries.iter().map(|e| e.session_id.as_str()).collect();
        assert_eq!(ids, vec!["kept"]);
    }

    #[test]
    fn test_restore_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.jsonl");
        std::fs::write(&path, "new").unwrap();

        let saved = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        std::fs::write(saved.path(), "old").unwrap();

        let mut journal = Journal::new();
        journal.record(Undo::RestoreContents {
            path: path.clone(),
            saved: saved.into_temp_path(),
        });
        assert!(journal.rollback());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn test_commit_discards_saved_contents() {
        let dir = TempDir::new().unwrap();
        let saved = tempfile::NamedTempFile::new_in(dir.path()).unwrap().into_temp_path();
        let saved_path = saved.to_path_buf();

        let mut journal = Journal::new();
        journal.record(Undo::RestoreContents {
            path: dir.path().join("t.jsonl"),
            saved,
        });
        journal.commit();
        assert!(!saved_path.exists());
    }

    #[test]
    fn test_created_dirs_removed_when_vacant() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("trash");
        let project = root.join("-work-app");

        let mut journal = Journal::new();
        journal.create_dir_all(&project).unwrap();
        assert_eq!(journal.len(), 2);

        let entry = Session::new("s1", project.join("s1.jsonl"));
        upsert_entry(&project, &entry).unwrap();
        journal.record(Undo::RemoveEntry {
            project_dir: project.clone(),
            session_id: "s1".into(),
        });

        assert!(journal.rollback());
        assert!(!project.exists());
        assert!(!root.exists());
        assert!(tmp.path().exists());
    }

    #[test]
    fn test_created_dir_kept_when_occupied() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("-work-app");

        let mut journal = Journal::new();
        journal.create_dir_all(&project).unwrap();
        std::fs::write(project.join("other.jsonl"), "").unwrap();

        assert!(journal.rollback());
        assert!(project.join("other.jsonl").exists());
    }

    #[test]
    fn test_create_existing_dir_records_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut journal = Journal::new();
        journal.create_dir_all(tmp.path()).unwrap();
        assert!(journal.is_empty());
    }

    #[test]
    fn test_abort_on_empty_journal_returns_error_unchanged() {
        let err = Journal::new().abort(RepositoryError::NotFound {
            path: PathBuf::from("/x"),
        });
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
