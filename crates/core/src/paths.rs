//! Store locations and project directory naming.
//!
//! `StorePaths` is built once at startup and handed to the repository, so
//! every component works against the same roots and tests can point the
//! whole system at a temporary directory.

use std::path::{Path, PathBuf};

use crate::error::RepositoryError;

/// Directory holding active project directories, relative to the base dir.
pub const PROJECTS_DIR_NAME: &str = "projects";

/// Directory holding trashed project directories, relative to the base dir.
pub const TRASH_DIR_NAME: &str = "faustus-trash";

/// Environment variable Claude Code uses to relocate its config directory.
pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

/// Extension of transcript files.
pub const TRANSCRIPT_EXTENSION: &str = "jsonl";

/// Immutable description of where sessions live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    base: PathBuf,
    projects: PathBuf,
    trash: PathBuf,
}

impl StorePaths {
    /// Build paths rooted at `base` (normally `~/.claude`).
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            projects: base.join(PROJECTS_DIR_NAME),
            trash: base.join(TRASH_DIR_NAME),
            base,
        }
    }

    /// Resolve the base directory: `$CLAUDE_CONFIG_DIR` when set and
    /// non-empty, else `~/.claude`.
    pub fn discover() -> Result<Self, RepositoryError> {
        if let Some(dir) = std::env::var_os(CLAUDE_CONFIG_DIR_ENV) {
            if !dir.is_empty() {
                return Ok(Self::new(PathBuf::from(dir)));
            }
        }
        let home = dirs::home_dir().ok_or(RepositoryError::HomeDirNotFound)?;
        Ok(Self::new(home.join(".claude")))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Active root: `<base>/projects`.
    pub fn projects_dir(&self) -> &Path {
        &self.projects
    }

    /// Trash root: `<base>/faustus-trash`.
    pub fn trash_dir(&self) -> &Path {
        &self.trash
    }

    /// Root for the requested location.
    pub fn root(&self, in_trash: bool) -> &Path {
        if in_trash {
            &self.trash
        } else {
            &self.projects
        }
    }

    /// Transcript path for `session_id` inside `project_dir_name` under the
    /// requested root.
    pub fn transcript_path(&self, project_dir_name: &str, session_id: &str, in_trash: bool) -> PathBuf {
        self.root(in_trash)
            .join(project_dir_name)
            .join(transcript_file_name(session_id))
    }
}

/// `<session_id>.jsonl`
pub fn transcript_file_name(session_id: &str) -> String {
    format!("{session_id}.{TRANSCRIPT_EXTENSION}")
}

/// Encode a working-directory path into a project directory name.
///
/// Claude stores `/Users/foo/my-project` as `-Users-foo-my-project`. The
/// encoding is lossy: hyphens inside path components are indistinguishable
/// from separators.
pub fn encode_project_dir(working_dir: &str) -> String {
    working_dir.replace('/', "-")
}

/// Short display name for a project directory: the last two non-empty
/// hyphen-separated parts joined with `/` (`-Users-foo-app` → `foo/app`),
/// or just the last part when its predecessor is empty.
pub fn derive_project_name(dir_name: &str) -> String {
    let parts: Vec<&str> = dir_name.split('-').collect();
    match parts.iter().rposition(|p| !p.is_empty()) {
        Some(idx) if idx > 0 && !parts[idx - 1].is_empty() => {
            format!("{}/{}", parts[idx - 1], parts[idx])
        }
        Some(idx) => parts[idx].to_string(),
        None => dir_name.to_string(),
    }
}

/// Session id derived from a transcript file name (`abc.jsonl` → `abc`).
pub fn session_id_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(TRANSCRIPT_EXTENSION) {
        return None;
    }
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_paths_layout() {
        let paths = StorePaths::new("/home/u/.claude");
        assert_eq!(paths.projects_dir(), Path::new("/home/u/.claude/projects"));
        assert_eq!(paths.trash_dir(), Path::new("/home/u/.claude/faustus-trash"));
        assert_eq!(paths.root(true), paths.trash_dir());
        assert_eq!(paths.root(false), paths.projects_dir());
    }

    #[test]
    fn test_transcript_path() {
        let paths = StorePaths::new("/b");
        assert_eq!(
            paths.transcript_path("-tmp-app", "abc", true),
            PathBuf::from("/b/faustus-trash/-tmp-app/abc.jsonl")
        );
    }

    #[test]
    fn test_encode_project_dir() {
        assert_eq!(encode_project_dir("/Users/foo/my-project"), "-Users-foo-my-project");
        assert_eq!(encode_project_dir("/"), "-");
        assert_eq!(encode_project_dir(""), "");
    }

    #[test]
    fn test_derive_project_name() {
        assert_eq!(derive_project_name("-Users-foo-app"), "foo/app");
        assert_eq!(derive_project_name("-tmp"), "tmp");
        assert_eq!(derive_project_name("-home-me-"), "home/me");
        assert_eq!(derive_project_name("plain"), "plain");
        assert_eq!(derive_project_name("---"), "---");
    }

    #[test]
    fn test_session_id_from_path() {
        assert_eq!(
            session_id_from_path(Path::new("/p/abc-123.jsonl")).as_deref(),
            Some("abc-123")
        );
        assert_eq!(session_id_from_path(Path::new("/p/sessions-index.json")), None);
        assert_eq!(session_id_from_path(Path::new("/p/abc")), None);
    }
}
