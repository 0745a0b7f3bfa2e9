// crates/core/src/discovery.rs
//! Raw transcript scan: rebuild session records from `*.jsonl` files when a
//! project directory has no usable index.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::parser::Envelopes;
use crate::paths::{derive_project_name, session_id_from_path};
use crate::types::{parse_timestamp, Session};

/// Longest first prompt kept on a scanned session, in characters.
pub const FIRST_PROMPT_CHARS: usize = 200;

/// Subdirectories of `root`, sorted by name.
pub fn list_project_dirs(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root)?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read directory entry in {}: {}", root.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Transcript files directly inside `project_dir`, sorted by name.
pub fn list_transcripts(project_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(project_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && session_id_from_path(path).is_some())
        .collect();
    files.sort();
    Ok(files)
}

/// Build sessions for every transcript in `project_dir`.
pub fn scan_project_dir(project_dir: &Path, in_trash: bool) -> Vec<Session> {
    let dir_name = project_dir
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let project_name = derive_project_name(&dir_name);

    let files = match list_transcripts(project_dir) {
        Ok(files) => files,
        Err(e) => {
            debug!("Cannot scan {}: {}", project_dir.display(), e);
            return Vec::new();
        }
    };

    files
        .iter()
        .filter_map(|path| scan_transcript(path, &project_name, in_trash))
        .collect()
}

/// Build one session record from a transcript.
///
/// The first `user` record supplies the working directory, branch, sidechain
/// flag and creation time. The first prompt is the text of the first
/// non-sidechain user record. `user` and `assistant` records are counted.
/// Returns `None` for unreadable files and files without any `user` record.
pub fn scan_transcript(path: &Path, project_name: &str, in_trash: bool) -> Option<Session> {
    let session_id = session_id_from_path(path)?;
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(time) => DateTime::<Utc>::from(time),
        Err(e) => {
            debug!("Cannot stat {}: {}", path.display(), e);
            return None;
        }
    };
    let envelopes = match Envelopes::open(path) {
        Ok(envelopes) => envelopes,
        Err(e) => {
            debug!("Cannot open {}: {}", path.display(), e);
            return None;
        }
    };

    let mut session = Session::new(session_id, path);
    let mut seen_user = false;
    let mut first_prompt: Option<String> = None;

    for envelope in envelopes {
        if !envelope.is_conversation() {
            continue;
        }
        session.message_count += 1;
        if !envelope.is_user() {
            continue;
        }

        if !seen_user {
            seen_user = true;
            session.project_path = envelope.cwd.clone().unwrap_or_default();
            session.git_branch = envelope.git_branch.clone().unwrap_or_default();
            session.is_sidechain = envelope.is_sidechain();
            session.created = envelope
                .timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_default();
        }

        if first_prompt.is_none() && !envelope.is_sidechain() {
            first_prompt = envelope
                .user_text()
                .filter(|text| !text.is_empty())
                .map(str::to_string);
        }
    }

    if !seen_user {
        debug!("No user record in {}, skipping", path.display());
        return None;
    }

    session.first_prompt = first_prompt
        .map(|text| shorten_prompt(&text))
        .unwrap_or_default();
    session.modified = modified;
    session.project_name = project_name.to_string();
    session.in_trash = in_trash;
    Some(session)
}

/// At most [`FIRST_PROMPT_CHARS`] characters; longer prompts keep one less
/// than the limit followed by `…`.
fn shorten_prompt(text: &str) -> String {
    if text.chars().count() <= FIRST_PROMPT_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(FIRST_PROMPT_CHARS - 1).collect();
    short.push('…');
    short
}

/// First `user` record's working directory, used when a project directory
/// has no readable index.
pub fn transcript_cwd(path: &Path) -> Option<String> {
    Envelopes::open(path)
        .ok()?
        .find(|envelope| envelope.is_user())
        .and_then(|envelope| envelope.cwd)
}
