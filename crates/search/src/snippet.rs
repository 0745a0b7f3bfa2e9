//! Context snippets for deep-search hits.

use crate::matching::Match;

/// Characters of context kept around a match, split evenly before and after.
pub const CONTEXT_CHARS: usize = 100;

/// Characters of a snippet used to find the matching preview message.
pub const SNIPPET_ANCHOR_CHARS: usize = 30;

const LEADING_MARKER: &str = "… ";
const TRAILING_MARKER: &str = " …";

/// Up to `CONTEXT_CHARS / 2` characters on each side of `m`, with newlines
/// and runs of whitespace collapsed to single spaces.
///
/// `… ` is prepended when text before the window was cut and ` …` appended
/// when text after it was cut; each is decided on its own.
pub fn match_context(text: &str, m: Match) -> String {
    let half = CONTEXT_CHARS / 2;
    let total = text.chars().count();
    let start = m.start.saturating_sub(half);
    let end = (m.end() + half).min(total);

    let window: String = text.chars().skip(start).take(end.saturating_sub(start)).collect();
    let collapsed = window.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut snippet = String::with_capacity(collapsed.len() + 8);
    if start > 0 {
        snippet.push_str(LEADING_MARKER);
    }
    snippet.push_str(&collapsed);
    if end < total {
        snippet.push_str(TRAILING_MARKER);
    }
    snippet
}

/// Snippet text without clipping markers, cut to [`SNIPPET_ANCHOR_CHARS`].
pub fn snippet_anchor(snippet: &str) -> String {
    let body = snippet.strip_prefix(LEADING_MARKER).unwrap_or(snippet);
    let body = body.strip_suffix(TRAILING_MARKER).unwrap_or(body);
    body.trim().chars().take(SNIPPET_ANCHOR_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::find_ignore_case;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn context(text: &str, query: &str) -> String {
        match_context(text, find_ignore_case(text, query).unwrap())
    }

    #[test]
    fn test_short_text_has_no_markers() {
        assert_eq!(context("find the needle here", "needle"), "find the needle here");
    }

    #[test]
    fn test_clipped_both_sides() {
        let text = format!("{}needle{}", "a".repeat(80), "b".repeat(80));
        let snippet = context(&text, "needle");
        assert_eq!(
            snippet,
            format!("… {}needle{} …", "a".repeat(50), "b".repeat(50))
        );
    }

    #[test]
    fn test_clipped_end_only() {
        let text = format!("needle{}", "b".repeat(80));
        let snippet = context(&text, "needle");
        assert!(!snippet.starts_with('…'));
        assert!(snippet.ends_with(" …"));
    }

    #[test]
    fn test_clipped_start_only() {
        let text = format!("{}needle", "a".repeat(80));
        let snippet = context(&text, "needle");
        assert!(snippet.starts_with("… "));
        assert!(!snippet.ends_with('…'));
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(context("line one\n\n  needle\tline", "needle"), "line one needle line");
    }

    #[test]
    fn test_multibyte_text_is_not_split() {
        let text = format!("{}needle{}", "é".repeat(60), "ü".repeat(60));
        let snippet = context(&text, "NEEDLE");
        assert!(snippet.contains("needle"));
        assert_eq!(snippet.chars().filter(|c| *c == 'é').count(), 50);
    }

    #[test]
    fn test_snippet_anchor() {
        assert_eq!(snippet_anchor("… some context …"), "some context");
        assert_eq!(snippet_anchor("plain"), "plain");
        let long = format!("… {} …", "x".repeat(40));
        assert_eq!(snippet_anchor(&long).chars().count(), SNIPPET_ANCHOR_CHARS);
    }

    proptest! {
        #[test]
        fn prop_snippet_bounded_and_contains_match(
            before in "[a-z ]{0,120}",
            after in "[a-z ]{0,120}",
            needle in "[A-Z]{1,10}",
        ) {
            let text = format!("{before}{needle}{after}");
            let m = find_ignore_case(&text, &needle).unwrap();
            let snippet = match_context(&text, m);

            let body = snippet
                .strip_prefix(LEADING_MARKER)
                .unwrap_or(&snippet);
            let body = body.strip_suffix(TRAILING_MARKER).unwrap_or(body);
            prop_assert!(body.chars().count() <= CONTEXT_CHARS + needle.chars().count());
            prop_assert!(snippet.to_lowercase().contains(&needle.to_lowercase()));
            prop_assert_eq!(snippet.starts_with(LEADING_MARKER), m.start > CONTEXT_CHARS / 2);
            prop_assert_eq!(
                snippet.ends_with(TRAILING_MARKER),
                m.end() + CONTEXT_CHARS / 2 < text.chars().count()
            );
        }

        #[test]
        fn prop_anchor_never_exceeds_limit(snippet in "\\PC{0,80}") {
            prop_assert!(snippet_anchor(&snippet).chars().count() <= SNIPPET_ANCHOR_CHARS);
        }
    }
}
