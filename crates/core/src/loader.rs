//! Loading the sessions of one project directory.
//!
//! The index is a cache over the transcripts, so there are two sources that
//! produce the same [`Session`] shape: [`IndexSource`] reads
//! `sessions-index.json`, [`ScanSource`] rebuilds records from the transcript
//! files. [`load_project_dir`] tries the index first and falls back to the
//! scan when the index is missing or unreadable.

use std::path::Path;

use tracing::debug;

use crate::discovery;
use crate::error::SessionIndexError;
use crate::paths::{derive_project_name, transcript_file_name};
use crate::session_index::{self, SessionIndex};
use crate::types::Session;

/// A way of listing the sessions in one project directory.
pub trait SessionSource {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Sessions in `project_dir`, with `project_name`, `in_trash`, and
    /// `full_path` describing their current location.
    fn load(&self, project_dir: &Path, in_trash: bool) -> Result<Vec<Session>, SessionIndexError>;
}

/// Reads `sessions-index.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexSource;

impl SessionSource for IndexSource {
    fn name(&self) -> &'static str {
        "index"
    }

    fn load(&self, project_dir: &Path, in_trash: bool) -> Result<Vec<Session>, SessionIndexError> {
        let index = session_index::read_index(project_dir)?;
        Ok(sessions_from_index(index, project_dir, in_trash))
    }
}

/// Turn the entries of an index read from `project_dir` into sessions
/// located in that directory.
pub fn sessions_from_index(index: SessionIndex, project_dir: &Path, in_trash: bool) -> Vec<Session> {
    let project_name = derive_project_name(&dir_name(project_dir));
    index
        .entries
        .into_iter()
        .map(|mut session| {
            // Entries in a trashed directory still carry the path they had
            // before the move; the directory they sit in is authoritative.
            if in_trash || session.full_path.as_os_str().is_empty() {
                session.full_path = project_dir.join(transcript_file_name(&session.session_id));
            }
            session.project_name = project_name.clone();
            session.in_trash = in_trash;
            session
        })
        .collect()
}

/// Rebuilds sessions from the transcript files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSource;

impl SessionSource for ScanSource {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn load(&self, project_dir: &Path, in_trash: bool) -> Result<Vec<Session>, SessionIndexError> {
        Ok(discovery::scan_project_dir(project_dir, in_trash))
    }
}

/// Sessions of one project directory: from the index when it can be read,
/// otherwise from a scan of the transcripts.
pub fn load_project_dir(project_dir: &Path, in_trash: bool) -> Vec<Session> {
    let sources: [&dyn SessionSource; 2] = [&IndexSource, &ScanSource];
    for source in sources {
        match source.load(project_dir, in_trash) {
            Ok(sessions) => {
                debug!(
                    "Loaded {} session(s) from {} via {}",
                    sessions.len(),
                    project_dir.display(),
                    source.name()
                );
                return sessions;
            }
            Err(e) if e.is_absent() => {
                debug!("No {} for {}", source.name(), project_dir.display());
            }
            Err(e) => {
                debug!("Falling back from {} for {}: {}", source.name(), project_dir.display(), e);
            }
        }
    }
    Vec::new()
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
