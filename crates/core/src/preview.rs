//! Bounded previews of the most recent messages in a transcript.

use std::collections::VecDeque;

use tracing::debug;

use crate::parser::TranscriptReader;
use crate::types::{PreviewContent, PreviewUnavailable, Session};

/// Number of messages a preview keeps when the caller has no preference.
pub const DEFAULT_PREVIEW_MESSAGES: usize = 50;

/// Build a preview of the last `max_messages` messages of `session`.
///
/// Only the window is retained while streaming, so memory stays bounded by
/// `max_messages` regardless of transcript length.
pub fn load_session_preview(session: Option<&Session>, max_messages: usize) -> PreviewContent {
    let Some(session) = session.filter(|s| !s.full_path.as_os_str().is_empty()) else {
        return PreviewContent::Unavailable(PreviewUnavailable::NoSession);
    };

    let reader = match TranscriptReader::open(&session.full_path) {
        Ok(reader) => reader,
        Err(e) => {
            debug!("Preview unavailable for {}: {}", session.session_id, e);
            return PreviewContent::Unavailable(PreviewUnavailable::NotReadable);
        }
    };

    let mut window = VecDeque::with_capacity(max_messages.min(DEFAULT_PREVIEW_MESSAGES * 4));
    for message in reader {
        if max_messages == 0 {
            continue;
        }
        if window.len() == max_messages {
            window.pop_front();
        }
        window.push_back(message);
    }

    if window.is_empty() {
        return PreviewContent::Unavailable(PreviewUnavailable::NoMessages);
    }
    PreviewContent::Ready(window.into())
}

/// Single-slot preview cache keyed by session id.
///
/// Holds at most one parsed preview. The owner calls [`PreviewCache::invalidate`]
/// when the selection changes or the session list is reloaded; until then
/// repeated lookups for the same session reuse the parsed result.
#[derive(Debug, Default)]
pub struct PreviewCache {
    slot: Option<(String, PreviewContent)>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached preview for `session`, parsing it on a miss.
    pub fn get_or_load(&mut self, session: Option<&Session>, max_messages: usize) -> &PreviewContent {
        let key = session.map(|s| s.session_id.clone()).unwrap_or_default();
        if !matches!(&self.slot, Some((cached, _)) if *cached == key) {
            self.slot = None;
        }
        &self
            .slot
            .get_or_insert_with(|| {
                let preview = load_session_preview(session, max_messages);
                (key, preview)
            })
            .1
    }

    /// Session id of the cached preview, if any.
    pub fn cached_for(&self) -> Option<&str> {
        self.slot.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PreviewMessage, Role};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_transcript(dir: &Path, name: &str, lines: &[String]) -> Session {
        let path = dir.join(format!("{name}.jsonl"));
        std::fs::write(&path, lines.join("\n")).unwrap();
        Session::new(name, path)
    }

    fn user_line(text: &str) -> String {
        format!(r#"{{"type":"user","message":{{"role":"user","content":"{text}"}}}}"#)
    }

    #[test]
    fn test_preview_keeps_most_recent_window() {
        let dir = TempDir::new().unwrap();
        let lines: Vec<String> = (0..10).map(|i| user_line(&format!("m{i}"))).collect();
        let session = write_transcript(dir.path(), "s", &lines);

        let preview = load_session_preview(Some(&session), 3);
        let contents: Vec<&str> = preview.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m7", "m8", "m9"]);
    }

    #[test]
    fn test_preview_malformed_line_between_two_user_lines() {
        let dir = TempDir::new().unwrap();
        let lines = vec![user_line("before"), "{broken".to_string(), user_line("after")];
        let session = write_transcript(dir.path(), "s", &lines);

        let preview = load_session_preview(Some(&session), DEFAULT_PREVIEW_MESSAGES);
        assert_eq!(
            preview,
            PreviewContent::Ready(vec![
                PreviewMessage::new(Role::User, "before"),
                PreviewMessage::new(Role::User, "after"),
            ])
        );
    }

    #[test]
    fn test_preview_keeps_records_with_odd_side_fields() {
        let dir = TempDir::new().unwrap();
        let lines = vec![
            r#"{"type":"user","timestamp":1700000000,"message":{"content":"first"}}"#.to_string(),
            r#"{"type":"user","isSidechain":"false","message":{"content":"second"}}"#.to_string(),
            user_line("third"),
        ];
        let session = write_transcript(dir.path(), "s", &lines);

        let preview = load_session_preview(Some(&session), DEFAULT_PREVIEW_MESSAGES);
        let contents: Vec<&str> = preview.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_preview_no_session() {
        assert_eq!(
            load_session_preview(None, 10),
            PreviewContent::Unavailable(PreviewUnavailable::NoSession)
        );
        let pathless = Session::new("x", "");
        assert_eq!(
            load_session_preview(Some(&pathless), 10),
            PreviewContent::Unavailable(PreviewUnavailable::NoSession)
        );
    }

    #[test]
    fn test_preview_missing_file() {
        let session = Session::new("gone", "/nonexistent/gone.jsonl");
        assert_eq!(
            load_session_preview(Some(&session), 10),
            PreviewContent::Unavailable(PreviewUnavailable::NotReadable)
        );
    }

    #[test]
    fn test_preview_no_displayable_messages() {
        let dir = TempDir::new().unwrap();
        let lines = vec![r#"{"type":"summary","summary":"x"}"#.to_string()];
        let session = write_transcript(dir.path(), "s", &lines);
        assert_eq!(
            load_session_preview(Some(&session), 10),
            PreviewContent::Unavailable(PreviewUnavailable::NoMessages)
        );
    }

    #[test]
    fn test_cache_reuses_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let session = write_transcript(dir.path(), "s", &[user_line("v1")]);

        let mut cache = PreviewCache::new();
        assert_eq!(cache.get_or_load(Some(&session), 10).messages()[0].content, "v1");
        assert_eq!(cache.cached_for(), Some("s"));

        std::fs::write(&session.full_path, user_line("v2")).unwrap();
        assert_eq!(cache.get_or_load(Some(&session), 10).messages()[0].content, "v1");

        cache.invalidate();
        assert_eq!(cache.cached_for(), None);
        assert_eq!(cache.get_or_load(Some(&session), 10).messages()[0].content, "v2");
    }

    #[test]
    fn test_cache_reloads_on_selection_change() {
        let dir = TempDir::new().unwrap();
        let a = write_transcript(dir.path(), "a", &[user_line("from a")]);
        let b = write_transcript(dir.path(), "b", &[user_line("from b")]);

        let mut cache = PreviewCache::new();
        cache.get_or_load(Some(&a), 10);
        assert_eq!(cache.get_or_load(Some(&b), 10).messages()[0].content, "from b");
        assert_eq!(cache.cached_for(), Some("b"));
    }
}
