use std::path::PathBuf;

use faustus_core::{Role, Session};
use serde::Serialize;

/// One matching message found by deep search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub session_id: String,
    pub full_path: PathBuf,
    pub project_name: String,
    pub in_trash: bool,
    /// Zero-based position among the session's `user` and `assistant`
    /// records, counting records that did not match.
    pub message_index: usize,
    /// `user` or `assistant`.
    pub role: Role,
    /// Whitespace-collapsed context around the match, with `… ` / ` …`
    /// markers where it was clipped.
    pub snippet: String,
    /// Character offset of the match within the original message text.
    pub match_position: usize,
}

impl SearchResult {
    pub(crate) fn new(
        session: &Session,
        message_index: usize,
        role: Role,
        snippet: String,
        match_position: usize,
    ) -> Self {
        Self {
            session_id: session.session_id.clone(),
            full_path: session.full_path.clone(),
            project_name: session.project_name.clone(),
            in_trash: session.in_trash,
            message_index,
            role,
            snippet,
            match_position,
        }
    }

    /// Whether this result belongs to `session`.
    pub fn is_for(&self, session: &Session) -> bool {
        self.session_id == session.session_id
    }
}
