//! Markdown residue cleanup and line splitting for text-based extractors.

use std::sync::LazyLock;

use regex::Regex;

static RE_HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Strip heading markers, HTML comments and pandoc underline spans, and
/// unwrap a fully bracketed line.
pub fn pure_text(text: &str) -> String {
    let text = text
        .replace("### ", "")
        .replace("## ", "")
        .replace("# ", "");
    let text = RE_HTML_COMMENT.replace_all(&text, "");
    let text = text.replace("{.underline}", "");
    match text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        Some(inner) => inner.to_string(),
        None => text,
    }
}

/// Trimmed, non-blank lines of `text`.
pub fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_residue() {
        assert_eq!(pure_text("## Scope"), "Scope");
        assert_eq!(pure_text("Intro<!-- note -->duction"), "Introduction");
        assert_eq!(pure_text("Key{.underline} term"), "Key term");
        assert_eq!(pure_text("[Chapter 1]"), "Chapter 1");
        assert_eq!(pure_text("[a](b)"), "[a](b)");
    }

    #[test]
    fn lines_skip_blanks() {
        let lines: Vec<_> = content_lines("  one \n\n\t\n two").collect();
        assert_eq!(lines, vec!["one", "two"]);
    }
}
