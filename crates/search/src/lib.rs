//! Search over Claude Code sessions.
//!
//! Three entry points, all case-insensitive substring matches with no
//! ranking:
//!
//! - **Deep search** ([`search_all_sessions`]) streams every transcript from
//!   disk and reports each matching user message or assistant text block
//!   with a context snippet.
//! - **Preview search** ([`search_preview`]) finds matches inside an
//!   already-built preview.
//! - **Shallow filter** ([`filter_sessions`]) matches session metadata only
//!   and never touches the disk.

pub mod filter;
pub mod matching;
pub mod query;
pub mod snippet;
pub mod types;

pub use filter::{filter_sessions, locate_preview_match, search_preview, SessionScope};
pub use matching::{find_ignore_case, Match};
pub use query::{search_all_sessions, search_session};
pub use snippet::{match_context, snippet_anchor, CONTEXT_CHARS, SNIPPET_ANCHOR_CHARS};
pub use types::SearchResult;
