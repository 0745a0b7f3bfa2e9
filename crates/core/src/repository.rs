// crates/core/src/repository.rs
//! The session catalog across the active and trash roots.
//!
//! Every mutation moves files first and then reconciles the indexes. Each
//! completed step is journaled with its inverse; when a later step fails the
//! journal is replayed so the transcript, its auxiliary directory, and both
//! indexes end up as they were before the call.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::discovery;
use crate::error::RepositoryError;
use crate::journal::{Journal, Undo};
use crate::loader::{load_project_dir, sessions_from_index};
use crate::paths::{derive_project_name, encode_project_dir, transcript_file_name, StorePaths};
use crate::relocate;
use crate::session_index::{self, INDEX_FILE_NAME};
use crate::types::Session;

/// Directory that owns `session`, derived from its current path.
pub fn project_dir(session: &Session) -> PathBuf {
    session
        .full_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Entry point for every read and write of the session store.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    paths: StorePaths,
}

impl SessionRepository {
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Directory that owns `session`.
    pub fn project_dir(&self, session: &Session) -> PathBuf {
        project_dir(session)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Every session under both roots, newest first.
    ///
    /// Fails only when the active root cannot be enumerated. A missing or
    /// unreadable trash root, and any project directory that cannot be read,
    /// contribute no sessions.
    pub fn load_all(&self) -> Result<Vec<Session>, RepositoryError> {
        let projects = self.paths.projects_dir();
        let active_dirs = discovery::list_project_dirs(projects)
            .map_err(|e| RepositoryError::not_readable(projects, e))?;

        let mut sessions = Vec::new();
        for dir in &active_dirs {
            sessions.extend(load_project_dir(dir, false));
        }

        match discovery::list_project_dirs(self.paths.trash_dir()) {
            Ok(trash_dirs) => {
                for dir in &trash_dirs {
                    sessions.extend(load_project_dir(dir, true));
                }
            }
            Err(e) => debug!("Skipping trash root {}: {}", self.paths.trash_dir().display(), e),
        }

        sessions.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        debug!("Loaded {} session(s)", sessions.len());
        Ok(sessions)
    }

    // ========================================================================
    // Trash
    // ========================================================================

    /// Move `session` into the trash root. No-op when already trashed.
    pub fn move_to_trash(&self, session: &mut Session) -> Result<(), RepositoryError> {
        self.move_between_roots(session, true)
    }

    /// Move `session` back to the active root. No-op when not trashed.
    pub fn restore_from_trash(&self, session: &mut Session) -> Result<(), RepositoryError> {
        self.move_between_roots(session, false)
    }

    fn move_between_roots(&self, session: &mut Session, to_trash: bool) -> Result<(), RepositoryError> {
        if session.in_trash == to_trash {
            return Ok(());
        }

        let source_dir = project_dir(session);
        let dir_name = source_dir
            .file_name()
            .ok_or_else(|| RepositoryError::NotFound {
                path: session.full_path.clone(),
            })?
            .to_owned();
        let dest_dir = self.paths.root(to_trash).join(dir_name);
        let source_file = session.full_path.clone();
        let dest_file = dest_dir.join(transcript_file_name(&session.session_id));

        if !source_file.exists() {
            return Err(RepositoryError::NotFound { path: source_file });
        }
        if dest_file.exists() {
            return Err(RepositoryError::DestinationExists { path: dest_file });
        }
        let mut journal = Journal::new();
        journal
            .create_dir_all(&dest_dir)
            .map_err(|e| RepositoryError::io(&dest_dir, e))?;
        if let Err(e) = std::fs::rename(&source_file, &dest_file) {
            journal.rollback();
            return Err(RepositoryError::io(&source_file, e));
        }
        journal.renamed(&source_file, &dest_file);
        relocate::move_aux_dir(&source_dir, &dest_dir, &session.session_id, &mut journal);

        let mut moved = session.clone();
        moved.in_trash = to_trash;
        moved.full_path = dest_file;

        match session_index::upsert_entry(&dest_dir, &moved) {
            Ok(previous) => journal.record(index_undo(&dest_dir, &moved.session_id, previous)),
            Err(e) => return Err(journal.abort(e.into())),
        }
        match session_index::remove_entry(&source_dir, &session.session_id) {
            Ok(Some(entry)) => journal.record(Undo::Reinsert {
                project_dir: source_dir.clone(),
                entry,
            }),
            Ok(None) => {}
            Err(e) => return Err(journal.abort(e.into())),
        }

        journal.commit();
        info!(
            "{} session {}",
            if to_trash { "Trashed" } else { "Restored" },
            session.session_id
        );
        *session = moved;
        Ok(())
    }

    /// Delete the transcript, its auxiliary directory, and its index entry.
    /// A transcript that is already gone is not an error.
    pub fn permanently_delete(&self, session: &Session) -> Result<(), RepositoryError> {
        let dir = project_dir(session);
        match std::fs::remove_file(&session.full_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Transcript already gone: {}", session.full_path.display());
            }
            Err(e) => return Err(RepositoryError::io(&session.full_path, e)),
        }
        relocate::remove_aux_dir(&dir, &session.session_id);
        session_index::remove_entry(&dir, &session.session_id)?;
        info!("Deleted session {}", session.session_id);
        Ok(())
    }

    /// Remove the trash root and everything in it. No-op when absent.
    pub fn empty_trash(&self) -> Result<(), RepositoryError> {
        let trash = self.paths.trash_dir();
        match std::fs::remove_dir_all(trash) {
            Ok(()) => {
                info!("Emptied trash at {}", trash.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepositoryError::Io {
                path: trash.to_path_buf(),
                source: e,
            }),
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Set the summary of `session` in its index and in memory.
    pub fn rename_session(&self, session: &mut Session, summary: &str) -> Result<(), RepositoryError> {
        let dir = project_dir(session);
        if !session_index::set_summary(&dir, &session.session_id, summary)? {
            return Err(RepositoryError::NotIndexed {
                session_id: session.session_id.clone(),
                path: session_index::index_path(&dir),
            });
        }
        session.summary = summary.to_string();
        info!("Renamed session {}", session.session_id);
        Ok(())
    }

    // ========================================================================
    // Reassignment
    // ========================================================================

    /// Move `session` to the project directory for `new_path` under the root
    /// it currently occupies, and point its records at `new_path`.
    ///
    /// Nothing happens when the session already lives in that directory.
    pub fn reassign_session_path(&self, session: &mut Session, new_path: &str) -> Result<(), RepositoryError> {
        let source_dir = project_dir(session);
        let dest_dir = self
            .paths
            .root(session.in_trash)
            .join(encode_project_dir(new_path));
        if source_dir == dest_dir {
            debug!("Session {} already in {}", session.session_id, dest_dir.display());
            return Ok(());
        }

        let source_file = session.full_path.clone();
        let dest_file = dest_dir.join(transcript_file_name(&session.session_id));
        if !source_file.exists() {
            return Err(RepositoryError::NotFound { path: source_file });
        }
        if dest_file.exists() {
            return Err(RepositoryError::DestinationExists { path: dest_file });
        }
        let mut journal = Journal::new();
        journal
            .create_dir_all(&dest_dir)
            .map_err(|e| RepositoryError::io(&dest_dir, e))?;
        if let Err(e) = std::fs::rename(&source_file, &dest_file) {
            journal.rollback();
            return Err(RepositoryError::io(&source_file, e));
        }
        journal.renamed(&source_file, &dest_file);
        relocate::move_aux_dir(&source_dir, &dest_dir, &session.session_id, &mut journal);

        let saved = match relocate::save_contents(&dest_file) {
            Ok(saved) => saved,
            Err(e) => return Err(journal.abort(RepositoryError::io(&dest_file, e))),
        };
        journal.record(Undo::RestoreContents {
            path: dest_file.clone(),
            saved,
        });
        if let Err(e) = relocate::rewrite_cwd(&dest_file, new_path) {
            return Err(journal.abort(RepositoryError::io(&dest_file, e)));
        }

        match session_index::remove_entry(&source_dir, &session.session_id) {
            Ok(Some(entry)) => journal.record(Undo::Reinsert {
                project_dir: source_dir.clone(),
                entry,
            }),
            Ok(None) => {}
            Err(e) => warn!("Could not remove stale entry from {}: {}", source_dir.display(), e),
        }

        let mut moved = session.clone();
        moved.full_path = dest_file;
        moved.project_path = new_path.to_string();
        moved.project_name = derive_project_name(&encode_project_dir(new_path));

        match session_index::insert_if_absent(&dest_dir, &moved) {
            Ok(true) => journal.record(Undo::RemoveEntry {
                project_dir: dest_dir.clone(),
                session_id: moved.session_id.clone(),
            }),
            Ok(false) => debug!("{} already indexed in {}", moved.session_id, dest_dir.display()),
            Err(e) => return Err(journal.abort(e.into())),
        }

        journal.commit();
        remove_if_only_index(&source_dir);
        info!(
            "Reassigned session {} to {}",
            session.session_id,
            new_path
        );
        *session = moved;
        Ok(())
    }

    /// Reassign every session whose working directory is `old_path`.
    ///
    /// Project directories under both roots are listed up front. In a
    /// directory with a readable index, an entry matches when its
    /// `projectPath` is `old_path`, or when it has no `projectPath` and the
    /// index's `originalPath` is `old_path`. Without a readable index, each
    /// transcript's first `user` record decides. Failures on individual
    /// sessions are logged and skipped. Returns how many sessions moved.
    pub fn reassign_project_path(&self, old_path: &str, new_path: &str) -> Result<usize, RepositoryError> {
        let projects = self.paths.projects_dir();
        let mut dirs: Vec<(PathBuf, bool)> = discovery::list_project_dirs(projects)
            .map_err(|e| RepositoryError::not_readable(projects, e))?
            .into_iter()
            .map(|dir| (dir, false))
            .collect();
        match discovery::list_project_dirs(self.paths.trash_dir()) {
            Ok(trash_dirs) => dirs.extend(trash_dirs.into_iter().map(|dir| (dir, true))),
            Err(e) => debug!("Skipping trash root {}: {}", self.paths.trash_dir().display(), e),
        }

        let mut moved = 0;
        for (dir, in_trash) in dirs {
            for mut session in sessions_with_cwd(&dir, in_trash, old_path) {
                let before = session.full_path.clone();
                match self.reassign_session_path(&mut session, new_path) {
                    Ok(()) if session.full_path != before => moved += 1,
                    Ok(()) => {}
                    Err(e) => warn!("Skipping session {}: {}", session.session_id, e),
                }
            }
        }
        info!("Reassigned {} session(s) from {} to {}", moved, old_path, new_path);
        Ok(moved)
    }
}

/// Inverse of an upsert into the index of `project_dir`.
fn index_undo(project_dir: &Path, session_id: &str, previous: Option<Session>) -> Undo {
    match previous {
        Some(entry) => Undo::Reinsert {
            project_dir: project_dir.to_path_buf(),
            entry,
        },
        None => Undo::RemoveEntry {
            project_dir: project_dir.to_path_buf(),
            session_id: session_id.to_string(),
        },
    }
}

/// Sessions in `dir` whose working directory is `cwd`.
fn sessions_with_cwd(dir: &Path, in_trash: bool, cwd: &str) -> Vec<Session> {
    match session_index::read_index(dir) {
        Ok(index) => {
            let original = index.original_path.clone();
            sessions_from_index(index, dir, in_trash)
                .into_iter()
                .filter(|s| {
                    s.project_path == cwd || (s.project_path.is_empty() && original == cwd)
                })
                .collect()
        }
        Err(e) => {
            if !e.is_absent() {
                debug!("Scanning {} instead of its index: {}", dir.display(), e);
            }
            let project_name = derive_project_name(
                &dir.file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
            discovery::list_transcripts(dir)
                .unwrap_or_default()
                .iter()
                .filter(|path| discovery::transcript_cwd(path).as_deref() == Some(cwd))
                .filter_map(|path| discovery::scan_transcript(path, &project_name, in_trash))
                .collect()
        }
    }
}

/// Remove `dir` when the only thing left in it is its index.
fn remove_if_only_index(dir: &Path) {
    let entries: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(Result::ok).map(|e| e.file_name()).collect(),
        Err(e) => {
            debug!("Cannot inspect {}: {}", dir.display(), e);
            return;
        }
    };
    if entries.iter().any(|name| name != INDEX_FILE_NAME) {
        return;
    }

    let index = session_index::index_path(dir);
    if let Err(e) = std::fs::remove_file(&index) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", index.display(), e);
            return;
        }
    }
    match std::fs::remove_dir(dir) {
        Ok(()) => debug!("Removed empty project directory {}", dir.display()),
        Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
    }
}
