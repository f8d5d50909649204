//! Character-safe text helpers.
//!
//! Transcripts are Chinese, so every length here counts `char`s, never bytes.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::unwrap_used)]
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

#[allow(clippy::unwrap_used)]
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());

/// Escapes text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Masks a secret for diagnostics: the first 10 characters followed by
/// `...****`. Secrets of 10 characters or fewer are fully masked.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= 10 {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(10).collect();
    format!("{prefix}...****")
}

/// Returns the first `max_chars` characters of `text`.
#[must_use]
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Splits `text` into chunks of at most `max_chars` characters.
#[must_use]
pub fn chunk_chars(text: &str, max_chars: usize) -> Vec<&str> {
    if max_chars == 0 {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let head = excerpt(rest, max_chars);
        chunks.push(head);
        rest = &rest[head.len()..];
    }
    chunks
}

/// Reduces an HTML fragment to readable text: tags dropped, common entities
/// decoded, runs of blank lines collapsed.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let stripped = TAG.replace_all(html, "\n");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    BLANK_LINES.replace_all(decoded.trim(), "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<b>"a" & 'b'</b>"#),
            "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("AIzaSyD-1234567890abcdef"), "AIzaSyD-12...****");
        assert_eq!(mask_secret("short"), "****");
        assert!(!mask_secret("AIzaSyD-1234567890abcdef").contains("abcdef"));
    }

    #[test]
    fn test_excerpt_counts_chars() {
        assert_eq!(excerpt("新闻联播文字版", 4), "新闻联播");
        assert_eq!(excerpt("abc", 10), "abc");
    }

    #[test]
    fn test_chunk_chars() {
        let text = "一二三四五六七";
        assert_eq!(chunk_chars(text, 3), vec!["一二三", "四五六", "七"]);
        assert!(chunk_chars("", 3).is_empty());
        assert_eq!(chunk_chars(&"a".repeat(4000), 2000).len(), 2);
    }

    #[test]
    fn test_html_to_text() {
        let text = html_to_text("<h1>标题</h1>\n<p>A &amp; B</p><br/><p>C</p>");
        assert_eq!(text, "标题\n\nA & B\n\nC");
    }
}
