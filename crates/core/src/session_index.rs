// crates/core/src/session_index.rs
//! Reader and writer for Claude Code's `sessions-index.json` files.
//!
//! Each project directory may carry a `sessions-index.json` listing its
//! sessions with metadata (summary, message count, timestamps). The index is
//! a cache over the transcripts: a missing index is treated as empty, while a
//! malformed one is an error the caller decides how to handle.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::SessionIndexError;
use crate::types::Session;

/// File name of the per-project index.
pub const INDEX_FILE_NAME: &str = "sessions-index.json";

/// Version written into freshly created indexes.
pub const INDEX_VERSION: u32 = 1;

/// Mode given to an index that did not exist before.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Contents of one `sessions-index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIndex {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<Session>,
    #[serde(default)]
    pub original_path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionIndex {
    /// An empty index for a project whose working directory is `original_path`.
    pub fn new(original_path: impl Into<String>) -> Self {
        Self {
            version: INDEX_VERSION,
            entries: Vec::new(),
            original_path: original_path.into(),
            extra: Map::new(),
        }
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.entries.iter().find(|e| e.session_id == session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.get(session_id).is_some()
    }

    /// Remove and return the entry for `session_id`.
    pub fn remove(&mut self, session_id: &str) -> Option<Session> {
        let pos = self.entries.iter().position(|e| e.session_id == session_id)?;
        Some(self.entries.remove(pos))
    }

    /// Replace the entry with the same id in place, or append. Returns the
    /// replaced entry.
    pub fn upsert(&mut self, session: Session) -> Option<Session> {
        match self.entries.iter_mut().find(|e| e.session_id == session.session_id) {
            Some(existing) => Some(std::mem::replace(existing, session)),
            None => {
                self.entries.push(session);
                None
            }
        }
    }
}

/// Path of the index inside `project_dir`.
pub fn index_path(project_dir: &Path) -> PathBuf {
    project_dir.join(INDEX_FILE_NAME)
}

/// Parse the index of `project_dir`.
pub fn read_index(project_dir: &Path) -> Result<SessionIndex, SessionIndexError> {
    let path = index_path(project_dir);
    let contents = std::fs::read_to_string(&path).map_err(|e| SessionIndexError::io(&path, e))?;
    serde_json::from_str(&contents).map_err(|e| SessionIndexError::MalformedJson {
        path,
        message: e.to_string(),
    })
}

/// Parse the index of `project_dir`, or `None` when the file does not exist.
pub fn read_index_if_present(project_dir: &Path) -> Result<Option<SessionIndex>, SessionIndexError> {
    match read_index(project_dir) {
        Ok(index) => Ok(Some(index)),
        Err(e) if e.is_absent() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write `index` as pretty-printed JSON (two-space indent).
///
/// The document goes to a temporary file in the same directory which is then
/// renamed over the index, so readers see either the old or the new file.
pub fn write_index(project_dir: &Path, index: &SessionIndex) -> Result<(), SessionIndexError> {
    let path = index_path(project_dir);
    let json = serde_json::to_vec_pretty(index).map_err(|source| SessionIndexError::Serialize {
        path: path.clone(),
        source,
    })?;

    let mut tmp = NamedTempFile::new_in(project_dir).map_err(|e| SessionIndexError::io(&path, e))?;
    tmp.write_all(&json)
        .and_then(|()| carry_permissions(tmp.as_file(), &path))
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| SessionIndexError::io(&path, e))?;
    tmp.persist(&path)
        .map_err(|e| SessionIndexError::io(&path, e.error))?;

    debug!("Wrote {} entries to {}", index.entries.len(), path.display());
    Ok(())
}

/// Give `file` the permissions of `target`, which it is about to replace.
/// A new target gets 0644 on Unix rather than the temp file's 0600.
pub(crate) fn carry_permissions(file: &File, target: &Path) -> io::Result<()> {
    match std::fs::metadata(target) {
        Ok(meta) => file.set_permissions(meta.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => set_new_file_mode(file),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn set_new_file_mode(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn set_new_file_mode(_file: &File) -> io::Result<()> {
    Ok(())
}

/// Remove the entry for `session_id` from the index of `project_dir`.
///
/// A missing index, or an index without the entry, is left untouched and
/// reported as `Ok(None)`. The removed entry is returned so it can be
/// reinserted if a later step fails.
pub fn remove_entry(project_dir: &Path, session_id: &str) -> Result<Option<Session>, SessionIndexError> {
    let Some(mut index) = read_index_if_present(project_dir)? else {
        return Ok(None);
    };
    let removed = index.remove(session_id);
    if removed.is_some() {
        write_index(project_dir, &index)?;
    }
    Ok(removed)
}

/// Insert or replace `session` in the index of `project_dir`, creating a
/// version-1 index with `session.project_path` as its `originalPath` when
/// none exists. Returns the entry that was replaced, if any.
pub fn upsert_entry(project_dir: &Path, session: &Session) -> Result<Option<Session>, SessionIndexError> {
    let mut index = read_index_if_present(project_dir)?
        .unwrap_or_else(|| SessionIndex::new(session.project_path.clone()));
    let previous = index.upsert(session.clone());
    write_index(project_dir, &index)?;
    Ok(previous)
}

/// Insert `session` unless an entry with its id already exists. Returns
/// whether the index was changed.
pub fn insert_if_absent(project_dir: &Path, session: &Session) -> Result<bool, SessionIndexError> {
    let mut index = read_index_if_present(project_dir)?
        .unwrap_or_else(|| SessionIndex::new(session.project_path.clone()));
    if index.contains(&session.session_id) {
        return Ok(false);
    }
    index.entries.push(session.clone());
    write_index(project_dir, &index)?;
    Ok(true)
}

/// Set the summary of one entry, leaving every other field as written.
///
/// Returns `Ok(false)` when the index has no entry for `session_id`; the
/// file is not rewritten in that case.
pub fn set_summary(project_dir: &Path, session_id: &str, summary: &str) -> Result<bool, SessionIndexError> {
    let mut index = read_index(project_dir)?;
    let Some(entry) = index.entries.iter_mut().find(|e| e.session_id == session_id) else {
        return Ok(false);
    };
    entry.summary = summary.to_string();
    write_index(project_dir, &index)?;
    Ok(true)
}
