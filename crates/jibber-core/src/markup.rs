//! Markup detection and validation for replies.
//!
//! Handler bodies that start with one of [`MARKUP_OPENERS`] are treated as
//! XHTML: the markup is sent as a companion and a plain-text body is derived
//! by [`strip_tags`]. Markup must be well-formed to be sent at all.

use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;

use crate::error::MarkupError;

/// Leading strings that mark a body as markup.
pub const MARKUP_OPENERS: &[&str] = &["<p>", "<html>", "<!"];

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new("<[^>]*>").expect("static regex"));

/// Returns true if `body` should be treated as markup.
pub fn looks_like_markup(body: &str) -> bool {
    MARKUP_OPENERS.iter().any(|opener| body.starts_with(opener))
}

/// Removes everything between `<` and `>`.
///
/// This is a textual fallback, not an HTML parser: entities are left alone and
/// a stray `<` swallows text up to the next `>`.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// What a well-formed markup fragment contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSummary {
    /// Name of the root element.
    pub root: String,
    /// Concatenated text content.
    pub text: String,
}

/// Checks that `markup` is a single well-formed element, optionally preceded
/// by a doctype, comments or processing instructions.
pub fn validate(markup: &str) -> Result<MarkupSummary, MarkupError> {
    let mut reader = Reader::from_str(markup);
    let mut depth = 0usize;
    let mut root: Option<String> = None;
    let mut text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| MarkupError::Malformed(e.to_string()))?;
        match event {
            Event::Start(start) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err(MarkupError::MultipleRoots);
                    }
                    root = Some(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                }
                depth += 1;
            }
            Event::Empty(start) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err(MarkupError::MultipleRoots);
                    }
                    root = Some(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                }
            }
            Event::End(_) => {
                // quick-xml rejects mismatched end tags itself
                depth = depth.saturating_sub(1);
            }
            Event::Text(content) => {
                let unescaped = content
                    .unescape()
                    .map_err(|e| MarkupError::Malformed(e.to_string()))?;
                if depth == 0 {
                    if !unescaped.trim().is_empty() {
                        return Err(MarkupError::TextOutsideRoot);
                    }
                } else {
                    text.push_str(&unescaped);
                }
            }
            Event::CData(content) => {
                if depth == 0 {
                    return Err(MarkupError::TextOutsideRoot);
                }
                text.push_str(&String::from_utf8_lossy(&content));
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if depth != 0 {
        return Err(MarkupError::Unclosed);
    }

    root.map(|root| MarkupSummary { root, text })
        .ok_or(MarkupError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("test string"), "test string");
        assert_eq!(strip_tags("test <b>string</b>"), "test string");
        assert_eq!(strip_tags("<test string>"), "");
    }

    #[test]
    fn test_looks_like_markup() {
        assert!(looks_like_markup("<p>Hello</p>"));
        assert!(looks_like_markup("<html><body>x</body></html>"));
        assert!(looks_like_markup("<!DOCTYPE html><html></html>"));
        assert!(!looks_like_markup("<b>bold</b>"));
        assert!(!looks_like_markup("plain"));
    }

    #[test]
    fn test_validate_well_formed() {
        let summary = validate("<p>Hello</p>").unwrap();
        assert_eq!(summary.root, "p");
        assert_eq!(summary.text, "Hello");

        let summary = validate("<html><body>a <b>b</b></body></html>").unwrap();
        assert_eq!(summary.root, "html");
        assert_eq!(summary.text, "a b");
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert!(validate("<p>Hello").is_err());
        assert!(validate("<p>Hello</b>").is_err());
        assert!(matches!(validate("<p>a</p><p>b</p>"), Err(MarkupError::MultipleRoots)));
        assert!(matches!(validate(""), Err(MarkupError::Empty)));
    }
}
