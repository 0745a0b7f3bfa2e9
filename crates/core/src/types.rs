// crates/core/src/types.rs
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One conversation transcript as listed in a `sessions-index.json` entry.
///
/// `project_name` and `in_trash` are derived from where the transcript lives
/// and are never written to an index. Fields this crate does not know about
/// are kept in `extra` so rewriting an index preserves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub full_path: PathBuf,
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_prompt: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default)]
    pub message_count: usize,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub git_branch: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub project_path: String,
    #[serde(default)]
    pub is_sidechain: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(skip)]
    pub project_name: String,
    #[serde(skip)]
    pub in_trash: bool,
}

impl Session {
    /// A session with only an id and a path; everything else empty.
    pub fn new(session_id: impl Into<String>, full_path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            full_path: full_path.into(),
            first_prompt: String::new(),
            summary: String::new(),
            message_count: 0,
            created: DateTime::<Utc>::default(),
            modified: DateTime::<Utc>::default(),
            git_branch: String::new(),
            project_path: String::new(),
            is_sidechain: false,
            extra: Map::new(),
            project_name: String::new(),
            in_trash: false,
        }
    }

    /// Summary when set, otherwise the first prompt.
    pub fn title(&self) -> &str {
        if self.summary.is_empty() {
            &self.first_prompt
        } else {
            &self.summary
        }
    }
}

/// `null` and missing both become an empty string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 strings; `null`, empty, or unparseable values become the
/// epoch instead of failing the whole index.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp).unwrap_or_default())
}

/// Parse an RFC 3339 timestamp as written by Claude Code.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Kind of a normalized transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    Thinking,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Thinking => "thinking",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A display-ready message derived from a transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewMessage {
    pub role: Role,
    pub content: String,
}

impl PreviewMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Why a preview has nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreviewUnavailable {
    NoSession,
    NotReadable,
    NoMessages,
}

impl fmt::Display for PreviewUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PreviewUnavailable::NoSession => "No session selected",
            PreviewUnavailable::NotReadable => "Could not open session file",
            PreviewUnavailable::NoMessages => "No messages in session",
        })
    }
}

/// Bounded window of the most recent messages of one transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "data")]
pub enum PreviewContent {
    Ready(Vec<PreviewMessage>),
    Unavailable(PreviewUnavailable),
}

impl PreviewContent {
    /// Messages in display order; empty when unavailable.
    pub fn messages(&self) -> &[PreviewMessage] {
        match self {
            PreviewContent::Ready(messages) => messages,
            PreviewContent::Unavailable(_) => &[],
        }
    }

    pub fn unavailable_reason(&self) -> Option<PreviewUnavailable> {
        match self {
            PreviewContent::Ready(_) => None,
            PreviewContent::Unavailable(reason) => Some(*reason),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewContent::Ready(_))
    }
}
