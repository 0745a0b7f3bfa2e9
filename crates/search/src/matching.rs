//! Case-insensitive substring search that reports positions in the
//! original text's characters.
//!
//! Lowercasing can change the number of characters (`İ` lowercases to two),
//! so a match found in a lowercased copy is mapped back through a table from
//! each folded character to the original character it came from.

/// Location of a match, in characters of the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub len: usize,
}

impl Match {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// A query lowercased once and reused across many texts.
#[derive(Debug, Clone)]
pub struct FoldedQuery {
    chars: Vec<char>,
}

impl FoldedQuery {
    pub fn new(query: &str) -> Self {
        Self {
            chars: query.chars().flat_map(char::to_lowercase).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// First occurrence of the query in `text`, ignoring case.
    pub fn find_in(&self, text: &str) -> Option<Match> {
        if self.chars.is_empty() {
            return None;
        }

        let mut folded = Vec::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len());
        for (index, c) in text.chars().enumerate() {
            for lower in c.to_lowercase() {
                folded.push(lower);
                origin.push(index);
            }
        }

        let pos = folded
            .windows(self.chars.len())
            .position(|window| window == self.chars.as_slice())?;
        let start = origin[pos];
        let last = origin[pos + self.chars.len() - 1];
        Some(Match {
            start,
            len: last - start + 1,
        })
    }
}

/// First case-insensitive occurrence of `query` in `text`.
pub fn find_ignore_case(text: &str, query: &str) -> Option<Match> {
    FoldedQuery::new(query).find_in(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ignore_case_ascii() {
        assert_eq!(
            find_ignore_case("Hello World", "WORLD"),
            Some(Match { start: 6, len: 5 })
        );
        assert_eq!(find_ignore_case("Hello", "xyz"), None);
    }

    #[test]
    fn test_positions_are_characters_not_bytes() {
        let m = find_ignore_case("héllo wörld", "wö").unwrap();
        assert_eq!(m, Match { start: 6, len: 2 });
    }

    #[test]
    fn test_expanding_lowercase_maps_back() {
        // 'İ' lowercases to two characters.
        let m = find_ignore_case("xİy", "y").unwrap();
        assert_eq!(m.start, 2);
        let m = find_ignore_case("aİb", "i\u{307}b").unwrap();
        assert_eq!(m, Match { start: 1, len: 2 });
    }

    #[test]
    fn test_empty_query_never_matches() {
        assert_eq!(find_ignore_case("anything", ""), None);
        assert!(FoldedQuery::new("").is_empty());
    }

    #[test]
    fn test_query_longer_than_text() {
        assert_eq!(find_ignore_case("ab", "abc"), None);
    }
}
