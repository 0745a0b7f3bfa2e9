//! Deep search: linear scan of transcripts on disk.

use faustus_core::{ContentBlock, Envelope, Envelopes, Role, Session};
use serde_json::Value;
use tracing::debug;

use crate::matching::FoldedQuery;
use crate::snippet::match_context;
use crate::types::SearchResult;

/// Search every session's transcript for `query`.
///
/// Results come in the order of `sessions`, then in file order within each
/// transcript. An empty query yields nothing; unreadable transcripts are
/// skipped.
pub fn search_all_sessions(sessions: &[Session], query: &str) -> Vec<SearchResult> {
    let query = FoldedQuery::new(query);
    if query.is_empty() {
        return Vec::new();
    }
    let results: Vec<SearchResult> = sessions
        .iter()
        .flat_map(|session| search_with(session, &query))
        .collect();
    debug!(
        "Deep search matched {} message(s) across {} session(s)",
        results.len(),
        sessions.len()
    );
    results
}

/// Search one session's transcript for `query`.
pub fn search_session(session: &Session, query: &str) -> Vec<SearchResult> {
    let query = FoldedQuery::new(query);
    if query.is_empty() {
        return Vec::new();
    }
    search_with(session, &query)
}

fn search_with(session: &Session, query: &FoldedQuery) -> Vec<SearchResult> {
    let envelopes = match Envelopes::open(&session.full_path) {
        Ok(envelopes) => envelopes,
        Err(e) => {
            debug!("Skipping {} in deep search: {}", session.session_id, e);
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    let mut message_index = 0;
    for envelope in envelopes.filter(Envelope::is_conversation) {
        search_envelope(session, &envelope, query, message_index, &mut results);
        message_index += 1;
    }
    results
}

/// Matches within one record. A user record is searched only when its
/// content is a plain string; each assistant `text` block is searched on
/// its own.
fn search_envelope(
    session: &Session,
    envelope: &Envelope,
    query: &FoldedQuery,
    message_index: usize,
    results: &mut Vec<SearchResult>,
) {
    let mut check = |role: Role, text: &str| {
        if let Some(m) = query.find_in(text) {
            results.push(SearchResult::new(
                session,
                message_index,
                role,
                match_context(text, m),
                m.start,
            ));
        }
    };

    if envelope.is_user() {
        let content = envelope
            .message
            .as_ref()
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str);
        if let Some(text) = content {
            check(Role::User, text);
        }
        return;
    }

    for block in envelope.content_blocks() {
        if let ContentBlock::Text { text } = block {
            check(Role::Assistant, &text);
        }
    }
}
