//! Markup stripping and text normalization helpers

use pulldown_cmark::{Event, Parser as MdParser, TagEnd};

/// Render a markdown fragment as collapsed plain text.
///
/// Emphasis, list bullets, heading markers and link syntax are dropped;
/// text and inline code survive. Line and block breaks become single spaces.
#[must_use]
pub fn plain_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());

    for event in MdParser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Item | TagEnd::Heading(_)) => out.push(' '),
            _ => {}
        }
    }

    collapse_whitespace(&out)
}

/// Collapse every whitespace run into one space and trim both ends
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep at most `max` characters (not bytes)
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Lowercase slug with `_` separators, e.g. `"Care Medical (WA)"` -> `"care_medical_wa"`
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_strips_emphasis() {
        assert_eq!(
            plain_text("Is the **provider** _Vita Health_?"),
            "Is the provider Vita Health?"
        );
    }

    #[test]
    fn plain_text_joins_lines() {
        assert_eq!(plain_text("first line\nsecond   line\n"), "first line second line");
    }

    #[test]
    fn plain_text_keeps_inline_code() {
        assert_eq!(plain_text("use `PR.OP.CL.2862` here"), "use PR.OP.CL.2862 here");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Care Medical (WA)"), "care_medical_wa");
        assert_eq!(slugify("  **Crossover Clinics:** "), "crossover_clinics");
        assert_eq!(slugify("---"), "");
    }
}
