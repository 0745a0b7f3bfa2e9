//! Subcommand handlers. Each loads what it needs through the repository and
//! prints plain text to stdout.

use std::path::Path;

use anyhow::{Context as _, Result};
use faustus_core::{load_session_preview, RepositoryError, Session, SessionRepository, StorePaths};
use faustus_search::{filter_sessions, search_all_sessions, search_preview, SessionScope};
use serde::Serialize;
use tracing::debug;

use crate::resolve::{resolve, Resolution};

/// Width of the id column in `list` output.
const SHORT_ID_CHARS: usize = 8;

pub struct Context {
    repo: SessionRepository,
}

/// A session as printed by `list --json`, including the derived fields the
/// index format leaves out.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView<'a> {
    session_id: &'a str,
    title: &'a str,
    project_name: &'a str,
    project_path: &'a str,
    git_branch: &'a str,
    message_count: usize,
    modified: String,
    in_trash: bool,
    full_path: &'a Path,
}

impl<'a> From<&'a Session> for SessionView<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            session_id: &session.session_id,
            title: session.title(),
            project_name: &session.project_name,
            project_path: &session.project_path,
            git_branch: &session.git_branch,
            message_count: session.message_count,
            modified: session.modified.to_rfc3339(),
            in_trash: session.in_trash,
            full_path: &session.full_path,
        }
    }
}

impl Context {
    pub fn new(paths: StorePaths) -> Self {
        debug!("Using store at {}", paths.base_dir().display());
        Self {
            repo: SessionRepository::new(paths),
        }
    }

    fn load(&self) -> Result<Vec<Session>> {
        self.repo.load_all().context("failed to load sessions")
    }

    /// Load every session and pick the one `id` names. Prints why when
    /// nothing is picked.
    fn select(&self, id: &str) -> Result<Option<(Vec<Session>, usize)>> {
        let sessions = self.load()?;
        match resolve(&sessions, id) {
            Resolution::Found(index) => Ok(Some((sessions, index))),
            Resolution::Missing => {
                println!("No session matches '{id}'");
                Ok(None)
            }
            Resolution::Ambiguous(ids) => {
                println!("'{id}' matches {} sessions:", ids.len());
                for id in ids {
                    println!("  {id}");
                }
                Ok(None)
            }
        }
    }

    pub fn list(&self, scope: SessionScope, query: Option<&str>, json: bool) -> Result<()> {
        let sessions = self.load()?;
        let shown = filter_sessions(&sessions, query.unwrap_or(""), scope);

        if json {
            let views: Vec<SessionView<'_>> = shown.into_iter().map(SessionView::from).collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
            return Ok(());
        }

        for session in shown {
            let id: String = session.session_id.chars().take(SHORT_ID_CHARS).collect();
            let marker = if session.in_trash { " [trash]" } else { "" };
            println!(
                "{id:<width$}  {}  {}{marker}  {}",
                format_modified(session),
                session.project_name,
                session.title(),
                width = SHORT_ID_CHARS,
            );
        }
        Ok(())
    }

    pub fn search(&self, query: &str, scope: SessionScope, json: bool) -> Result<()> {
        let sessions = self.load()?;
        let in_scope: Vec<Session> = filter_sessions(&sessions, "", scope)
            .into_iter()
            .cloned()
            .collect();
        let results = search_all_sessions(&in_scope, query);

        if json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }

        if results.is_empty() {
            println!("No matches for '{query}'");
            return Ok(());
        }
        for result in &results {
            println!(
                "{} #{} [{}] {}",
                result.session_id, result.message_index, result.role, result.snippet
            );
        }
        println!("{} match(es)", results.len());
        Ok(())
    }

    pub fn preview(&self, id: &str, limit: usize, find: Option<&str>) -> Result<()> {
        let Some((sessions, index)) = self.select(id)? else {
            return Ok(());
        };
        let preview = load_session_preview(Some(&sessions[index]), limit);
        if let Some(reason) = preview.unavailable_reason() {
            println!("{reason}");
            return Ok(());
        }

        let hits = find.map(|q| search_preview(&preview, q)).unwrap_or_default();
        for (i, message) in preview.messages().iter().enumerate() {
            let marker = if hits.contains(&i) { ">" } else { " " };
            println!("{marker} [{}] {}", message.role, message.content);
        }
        if let Some(q) = find {
            println!("{} message(s) match '{q}'", hits.len());
        }
        Ok(())
    }

    pub fn trash(&self, id: &str) -> Result<()> {
        self.mutate(id, "trash", |repo, session| repo.move_to_trash(session))
    }

    pub fn restore(&self, id: &str) -> Result<()> {
        self.mutate(id, "restore", |repo, session| repo.restore_from_trash(session))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.mutate(id, "delete", |repo, session| repo.permanently_delete(session))
    }

    pub fn rename(&self, id: &str, summary: &str) -> Result<()> {
        self.mutate(id, "rename", |repo, session| repo.rename_session(session, summary))
    }

    pub fn reassign(&self, id: &str, new_path: &str) -> Result<()> {
        self.mutate(id, "reassign", |repo, session| {
            repo.reassign_session_path(session, new_path)
        })
    }

    pub fn empty_trash(&self) -> Result<()> {
        self.repo.empty_trash().context("failed to empty trash")?;
        println!("Trash emptied");
        Ok(())
    }

    pub fn reassign_all(&self, old_path: &str, new_path: &str) -> Result<()> {
        let moved = self
            .repo
            .reassign_project_path(old_path, new_path)
            .with_context(|| format!("failed to reassign sessions from {old_path}"))?;
        println!("Reassigned {moved} session(s) from {old_path} to {new_path}");
        Ok(())
    }

    /// Run one repository mutation on the session `id` names. A session that
    /// vanished in the meantime is reported, not treated as a failure.
    fn mutate<F>(&self, id: &str, action: &str, op: F) -> Result<()>
    where
        F: FnOnce(&SessionRepository, &mut Session) -> Result<(), RepositoryError>,
    {
        let Some((mut sessions, index)) = self.select(id)? else {
            return Ok(());
        };
        let session = &mut sessions[index];
        match op(&self.repo, session) {
            Ok(()) => {
                println!("{action}: {} -> {}", session.session_id, session.full_path.display());
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                println!("Session {} no longer exists", session.session_id);
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("failed to {action} session {}", session.session_id)),
        }
    }
}

fn format_modified(session: &Session) -> String {
    session.modified.format("%Y-%m-%d %H:%M").to_string()
}
