//! HTML normalization for scraped comment text.
//!
//! Hacker News comment bodies arrive as a small HTML dialect (`<p>`, `<i>`,
//! `<a href>`, a handful of named entities). `strip` removes markup,
//! collapses entities, and normalizes whitespace so downstream matching
//! (quote sourcing, display snippets) operates on plain text.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_entities(input: &str) -> String {
    input
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Strip tags, collapse entities, and normalize whitespace.
pub fn strip(input: &str) -> String {
    let no_tags = TAG_RE.replace_all(input, " ");
    let collapsed = collapse_entities(&no_tags);
    WHITESPACE_RE.replace_all(collapsed.trim(), " ").to_string()
}

/// Truncate to at most `max_len` chars, preferring a char boundary.
pub fn truncate(input: &str, max_len: usize) -> String {
    if input.chars().count() <= max_len {
        return input.to_string();
    }
    input.chars().take(max_len).collect()
}

/// Strip and truncate in one step, the shape both quote persistence and
/// event display snippets need.
pub fn strip_and_truncate(input: &str, max_len: usize) -> String {
    truncate(&strip(input), max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_entities() {
        let input = "<p>This is <b>great</b> &amp; useful &nbsp;tool</p>";
        assert_eq!(strip(input), "This is great & useful tool");
    }

    #[test]
    fn normalizes_internal_whitespace() {
        let input = "line one\n\n  line   two";
        assert_eq!(strip(input), "line one line two");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let input = "hello world";
        assert_eq!(truncate(input, 5), "hello");
        assert_eq!(truncate(input, 100), "hello world");
    }
}
