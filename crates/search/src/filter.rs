//! Metadata filter and preview search. Neither touches the disk.

use std::fmt;
use std::str::FromStr;

use faustus_core::{PreviewContent, Session};
use serde::{Deserialize, Serialize};

use crate::snippet::snippet_anchor;
use crate::types::SearchResult;

/// Which sessions a list view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    #[default]
    Active,
    Trash,
    All,
}

impl SessionScope {
    pub fn includes(&self, session: &Session) -> bool {
        match self {
            SessionScope::Active => !session.in_trash,
            SessionScope::Trash => session.in_trash,
            SessionScope::All => true,
        }
    }
}

impl fmt::Display for SessionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionScope::Active => "active",
            SessionScope::Trash => "trash",
            SessionScope::All => "all",
        })
    }
}

impl FromStr for SessionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(SessionScope::Active),
            "trash" => Ok(SessionScope::Trash),
            "all" => Ok(SessionScope::All),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}

/// Sessions in `scope` whose summary, first prompt, project name, or branch
/// contains `query`, ignoring case. An empty query matches everything in
/// scope. Order is preserved.
pub fn filter_sessions<'a>(sessions: &'a [Session], query: &str, scope: SessionScope) -> Vec<&'a Session> {
    let query = query.to_lowercase();
    sessions
        .iter()
        .filter(|session| scope.includes(session))
        .filter(|session| query.is_empty() || searchable_text(session).contains(&query))
        .collect()
}

fn searchable_text(session: &Session) -> String {
    format!(
        "{} {} {} {}",
        session.summary, session.first_prompt, session.project_name, session.git_branch
    )
    .to_lowercase()
}

/// Indices of preview messages containing `query`, ignoring case.
pub fn search_preview(preview: &PreviewContent, query: &str) -> Vec<usize> {
    if query.is_empty() {
        return Vec::new();
    }
    let query = query.to_lowercase();
    preview
        .messages()
        .iter()
        .enumerate()
        .filter(|(_, message)| message.content.to_lowercase().contains(&query))
        .map(|(index, _)| index)
        .collect()
}

/// Preview message that best corresponds to a deep-search hit.
///
/// Among the messages matching `query`, picks the first whose content also
/// contains the hit's [`snippet_anchor`]; falls back to the first match.
/// `None` when nothing in the preview matches.
pub fn locate_preview_match(preview: &PreviewContent, query: &str, result: &SearchResult) -> Option<usize> {
    let matches = search_preview(preview, query);
    let first = *matches.first()?;
    let anchor = snippet_anchor(&result.snippet).to_lowercase();
    if anchor.is_empty() {
        return Some(first);
    }
    let messages = preview.messages();
    Some(
        matches
            .into_iter()
            .find(|&index| messages[index].content.to_lowercase().contains(&anchor))
            .unwrap_or(first),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use faustus_core::{PreviewMessage, PreviewUnavailable, Role};
    use pretty_assertions::assert_eq;

    fn session(id: &str, summary: &str, in_trash: bool) -> Session {
        let mut session = Session::new(id, format!("/p/{id}.jsonl"));
        session.summary = summary.into();
        session.first_prompt = format!("prompt for {id}");
        session.project_name = "work/app".into();
        session.git_branch = "feature/login".into();
        session.in_trash = in_trash;
        session
    }

    fn ids(sessions: Vec<&Session>) -> Vec<&str> {
        sessions.into_iter().map(|s| s.session_id.as_str()).collect()
    }

    #[test]
    fn test_filter_by_scope() {
        let sessions = vec![session("a", "", false), session("b", "", true), session("c", "", false)];
        assert_eq!(ids(filter_sessions(&sessions, "", SessionScope::Active)), vec!["a", "c"]);
        assert_eq!(ids(filter_sessions(&sessions, "", SessionScope::Trash)), vec!["b"]);
        assert_eq!(ids(filter_sessions(&sessions, "", SessionScope::All)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filter_matches_metadata_fields() {
        let sessions = vec![
            session("a", "Refactor Parser", false),
            session("b", "", false),
            session("c", "", true),
        ];
        assert_eq!(ids(filter_sessions(&sessions, "parser", SessionScope::All)), vec!["a"]);
        assert_eq!(ids(filter_sessions(&sessions, "PROMPT FOR B", SessionScope::All)), vec!["b"]);
        assert_eq!(ids(filter_sessions(&sessions, "login", SessionScope::Trash)), vec!["c"]);
        assert_eq!(filter_sessions(&sessions, "work/app", SessionScope::Active).len(), 2);
        assert!(filter_sessions(&sessions, "nothing", SessionScope::All).is_empty());
    }

    #[test]
    fn test_scope_parse_and_display() {
        assert_eq!("Trash".parse::<SessionScope>(), Ok(SessionScope::Trash));
        assert!("bin".parse::<SessionScope>().is_err());
        assert_eq!(SessionScope::All.to_string(), "all");
        assert_eq!(SessionScope::default(), SessionScope::Active);
    }

    fn preview(contents: &[&str]) -> PreviewContent {
        PreviewContent::Ready(
            contents
                .iter()
                .map(|c| PreviewMessage::new(Role::User, *c))
                .collect(),
        )
    }

    #[test]
    fn test_search_preview() {
        let p = preview(&["alpha", "Beta", "alphabet"]);
        assert_eq!(search_preview(&p, "ALPHA"), vec![0, 2]);
        assert_eq!(search_preview(&p, "bet"), vec![1, 2]);
        assert!(search_preview(&p, "").is_empty());
        assert!(search_preview(
            &PreviewContent::Unavailable(PreviewUnavailable::NoMessages),
            "alpha"
        )
        .is_empty());
    }

    fn hit(snippet: &str) -> SearchResult {
        SearchResult::new(&session("a", "", false), 0, Role::User, snippet.into(), 0)
    }

    #[test]
    fn test_locate_preview_match_uses_snippet() {
        let p = preview(&["the needle once", "unrelated", "second needle here"]);
        assert_eq!(locate_preview_match(&p, "needle", &hit("… second needle here")), Some(2));
        assert_eq!(locate_preview_match(&p, "needle", &hit("no overlap at all")), Some(0));
        assert_eq!(locate_preview_match(&p, "absent", &hit("x")), None);
    }
}
