// crates/core/src/parser.rs
//! Streaming parser for Claude Code JSONL transcripts.
//!
//! Two layers:
//! - [`Envelopes`] decodes each line into an [`Envelope`] (the `type`
//!   discriminator plus the raw `message` payload and the session-level
//!   fields). Malformed lines are skipped and logged at debug level.
//! - [`TranscriptReader`] turns envelopes into normalized
//!   [`PreviewMessage`]s. One line can yield several messages (an assistant
//!   record with multiple content blocks yields one per block).
//!
//! Both are plain iterators. Re-reading a transcript means opening it again.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::ParseError;
use crate::lines::JsonlLines;
use crate::types::{PreviewMessage, Role};

/// Longest user or assistant text shown in a preview, in characters.
pub const MAX_TEXT_CHARS: usize = 500;

/// Longest reasoning block shown in a preview, in characters.
pub const MAX_THINKING_CHARS: usize = 200;

/// Longest shell command shown in a tool summary, in characters.
pub const MAX_COMMAND_CHARS: usize = 60;

/// Marker appended to truncated preview text.
pub const ELLIPSIS: &str = " …";

/// One decoded transcript line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub git_branch: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_sidechain: Option<bool>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub timestamp: Option<String>,
}

/// Side fields never fail a record: anything but a string reads as absent.
fn lenient_str<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// A boolean, or the strings `"true"` / `"false"`; anything else is absent.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl Envelope {
    pub fn is_user(&self) -> bool {
        self.kind == "user"
    }

    pub fn is_assistant(&self) -> bool {
        self.kind == "assistant"
    }

    /// User and assistant records form the logical message stream.
    pub fn is_conversation(&self) -> bool {
        self.is_user() || self.is_assistant()
    }

    pub fn is_sidechain(&self) -> bool {
        self.is_sidechain.unwrap_or(false)
    }

    fn content(&self) -> Option<&Value> {
        self.message.as_ref().and_then(|m| m.get("content"))
    }

    /// Plain text of a user record: the string content, or the first block
    /// carrying a string `text` field. Not truncated.
    pub fn user_text(&self) -> Option<&str> {
        match self.content()? {
            Value::String(s) => Some(s.as_str()),
            Value::Array(blocks) => blocks
                .iter()
                .find_map(|b| b.get("text").and_then(Value::as_str)),
            _ => None,
        }
    }

    /// Content blocks of an assistant record. Blocks that don't decode are
    /// reported as [`ContentBlock::Other`].
    pub fn content_blocks(&self) -> Vec<ContentBlock> {
        match self.content() {
            Some(Value::Array(blocks)) => blocks
                .iter()
                .map(|b| ContentBlock::deserialize(b).unwrap_or(ContentBlock::Other))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A typed block inside an assistant message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

/// Iterator over the decodable lines of a transcript.
pub struct Envelopes<R> {
    lines: JsonlLines<R>,
    path: PathBuf,
}

impl Envelopes<BufReader<File>> {
    /// Open a transcript file for streaming.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        let file = File::open(path).map_err(|e| ParseError::io(path, e))?;
        Ok(Self::from_reader(BufReader::new(file), path))
    }
}

impl<R: BufRead> Envelopes<R> {
    pub fn from_reader(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            lines: JsonlLines::new(reader),
            path: path.into(),
        }
    }
}

impl<R: BufRead> Iterator for Envelopes<R> {
    type Item = Envelope;

    fn next(&mut self) -> Option<Envelope> {
        while let Some(line) = self.lines.next() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    debug!("Stopped reading {:?}: {}", self.path, e);
                    return None;
                }
            };
            match serde_json::from_slice::<Envelope>(&line) {
                Ok(envelope) => return Some(envelope),
                Err(e) => {
                    debug!(
                        "Skipping malformed JSON at line {} in {:?}: {}",
                        self.lines.line_number(),
                        self.path,
                        e
                    );
                }
            }
        }
        None
    }
}

/// Lazily yields normalized messages from one transcript.
pub struct TranscriptReader<R = BufReader<File>> {
    envelopes: Envelopes<R>,
    pending: VecDeque<PreviewMessage>,
}

impl TranscriptReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        Ok(Self::from_envelopes(Envelopes::open(path)?))
    }
}

impl<R: BufRead> TranscriptReader<R> {
    pub fn from_envelopes(envelopes: Envelopes<R>) -> Self {
        Self {
            envelopes,
            pending: VecDeque::new(),
        }
    }
}

impl<R: BufRead> Iterator for TranscriptReader<R> {
    type Item = PreviewMessage;

    fn next(&mut self) -> Option<PreviewMessage> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(message);
            }
            let envelope = self.envelopes.next()?;
            self.pending.extend(normalize_entry(&envelope));
        }
    }
}

/// Parse a whole transcript into normalized messages.
pub fn parse_transcript(path: &Path) -> Result<Vec<PreviewMessage>, ParseError> {
    Ok(TranscriptReader::open(path)?.collect())
}

/// Normalize one envelope. Unknown types yield nothing.
pub fn normalize_entry(envelope: &Envelope) -> Vec<PreviewMessage> {
    if envelope.is_user() {
        return envelope
            .user_text()
            .filter(|text| !text.is_empty())
            .map(|text| vec![PreviewMessage::new(Role::User, truncate_chars(text, MAX_TEXT_CHARS))])
            .unwrap_or_default();
    }

    if !envelope.is_assistant() {
        return Vec::new();
    }

    envelope
        .content_blocks()
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } if !text.is_empty() => Some(PreviewMessage::new(
                Role::Assistant,
                truncate_chars(&text, MAX_TEXT_CHARS),
            )),
            ContentBlock::ToolUse { name, input } => {
                summarize_tool_use(&name, &input).map(|s| PreviewMessage::new(Role::Tool, s))
            }
            ContentBlock::Thinking { thinking } if !thinking.is_empty() => Some(
                PreviewMessage::new(Role::Thinking, truncate_chars(&thinking, MAX_THINKING_CHARS)),
            ),
            _ => None,
        })
        .collect()
}

/// `Name` or `Name: argument` for a tool invocation.
///
/// The argument is the first of `command` (shortened), `pattern`, or the last
/// segment of `file_path` that is present. A present but non-string field
/// still wins and contributes nothing.
pub fn summarize_tool_use(name: &str, input: &Value) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let Some(fields) = input.as_object() else {
        return Some(name.to_string());
    };

    let argument = if let Some(command) = fields.get("command") {
        command
            .as_str()
            .map(|c| truncate_chars(c, MAX_COMMAND_CHARS))
    } else if let Some(pattern) = fields.get("pattern") {
        pattern.as_str().map(str::to_string)
    } else if let Some(file_path) = fields.get("file_path") {
        file_path
            .as_str()
            .map(|p| p.rsplit('/').next().unwrap_or(p).to_string())
    } else {
        None
    };

    Some(match argument {
        Some(arg) => format!("{name}: {arg}"),
        None => name.to_string(),
    })
}

/// Keep the first `max_chars` characters, appending [`ELLIPSIS`] when
/// anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}
