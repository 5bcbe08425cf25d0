//! Named pattern recognizers
//!
//! Each recognizer inspects a slice of text and reports an optional
//! structured match. Recognizers never fail; absence is `None` or an empty
//! list. Offsets are byte offsets into the slice that was passed in.
//!
//! Recognizer lists are plain data so new heading styles or marker glyphs can
//! be added without touching the parser.

use crate::markup::{collapse_whitespace, plain_text, truncate_chars};
use crate::record::{BranchKind, ReferenceMention, RevisionEntry};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_REVISION_DESCRIPTION: usize = 500;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("recognizer patterns are valid")
}

static TITLE: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^#[ \t]+\*{0,2}(.+?)\*{0,2}[ \t]*$"));

static DOCUMENT_TYPE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\*{0,2}Document Type:\*{0,2}[ \t]*\*{0,2}([A-Za-z0-9.\-]+)"));

static DOCUMENT_NUMBER: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\*{0,2}Document Number:\*{0,2}[ \t]*\*{0,2}([A-Za-z0-9.\-]+)"));

static STATUS: Lazy<Regex> =
    Lazy::new(|| compile(r"(?im)^[ \t|]*\*{0,2}Status:\*{0,2}[ \t]*([^\n|]+)"));

static CAUSE_EXPLANATION: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\*{0,2}Cause/Explanation:\*{0,2}[ \t]*\n{0,2}[ \t]*([^\n]+(?:\n[^\n*#|]+)*)")
});

static PEND_CODE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\*{0,2}Pend Code:\*{0,2}[ \t]*\*{0,2}([A-Z0-9]+)"));

static REVISION_ROW: Lazy<Regex> =
    Lazy::new(|| compile(r"^\|\s*(\d+\.\d+)\s*\|([^|]+)\|([^|]+)\|"));

static ACTION_REQUIRED: Lazy<Regex> =
    Lazy::new(|| compile(r"(?mi)^[ \t]*#{1,3}[ \t]+\**_?Action Required_?\**[ \t]*$"));

/// Heading styles that open a category, tried in order
static CATEGORY_HEADINGS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^[ \t]*###[ \t]+\*\*_?([^*\n]+?)_?\*\*[ \t]*$",
        r"(?m)^[ \t]*###[ \t]+([^*\s][^\n]*?)[ \t]*$",
        r"(?m)^[ \t]*\*\*([^*\n]*\bClaims)\*\*[ \t]*$",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

static STEP_START: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^[ \t]{0,3}(\d{1,3})\.[ \t]+"));

static INTERROGATIVE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)^\W*(?:is|are|does|do|did|has|have|had|was|were|can|could|should|will|would|may|must)\b",
    )
});

/// Bullet glyphs accepted in front of a branch marker; `I` is a common
/// transcription of a nested bullet.
static BRANCH_MARKER: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?mi)^([ \t]*)(?:([-–•*+]|I)[ \t]*)?\*{0,2}(yes|no|unsure)\*{0,2}[ \t]*:[ \t]*\*{0,2}[ \t]*",
    )
});

static LABELED_ITEM: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?m)^([ \t]*)(?:[-–•*+]|I)[ \t]*\*\*([^*:\n]{1,60}?):\*\*[ \t]*")
});

static CONTINUE_NEXT_STEP: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)continue\s+to\s+(?:the\s+)?next\s+step"));

static PROCEED_TO_SECTION: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)proceed\s+to\s+(?:the\s+)?(.+?)\s+section\b"));

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\b(PR\.OP\.CL\.\d+)(?:[ \t]*[-–:][ \t]*([^.\n]+))?"));

static IMPORTANT_NOTE: Lazy<Regex> = Lazy::new(|| compile(r"(?is)\*\*Important Note:(.+?)\*\*"));

/// A category heading occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingMatch {
    /// Heading text without markup
    pub name: String,
    /// Offset of the heading line
    pub start: usize,
    /// Offset just past the heading line
    pub end: usize,
}

/// A numbered step marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepStart {
    /// Number as written
    pub number: u32,
    /// Offset of the marker line
    pub start: usize,
    /// Offset where the step text begins
    pub body_start: usize,
}

/// A yes/no/unsure marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchMarker {
    /// Outcome named by the marker
    pub kind: BranchKind,
    /// Leading indentation width (tab counts as four)
    pub indent: usize,
    /// Bullet glyph, if any
    pub glyph: Option<char>,
    /// Offset of the marker line
    pub start: usize,
    /// Offset where the branch text begins
    pub body_start: usize,
}

/// A bold-labeled scenario bullet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledItem {
    /// Label text without the colon
    pub label: String,
    /// Leading indentation width
    pub indent: usize,
    /// Offset of the item line
    pub start: usize,
    /// Offset where the item text begins
    pub body_start: usize,
}

fn indent_width(prefix: &str) -> usize {
    prefix.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum()
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    let value = plain_text(pattern.captures(text)?.get(1)?.as_str());
    (!value.is_empty()).then_some(value)
}

/// Title from the first level-one heading
#[must_use]
pub fn recognize_title(text: &str) -> Option<String> {
    first_capture(&TITLE, text)
}

/// `Document Type:` field
#[must_use]
pub fn recognize_document_type(text: &str) -> Option<String> {
    first_capture(&DOCUMENT_TYPE, text)
}

/// `Document Number:` field
#[must_use]
pub fn recognize_document_number(text: &str) -> Option<String> {
    first_capture(&DOCUMENT_NUMBER, text)
}

/// `Status:` field
#[must_use]
pub fn recognize_status(text: &str) -> Option<String> {
    first_capture(&STATUS, text)
}

/// `Cause/Explanation:` paragraph
#[must_use]
pub fn recognize_cause_explanation(text: &str) -> Option<String> {
    first_capture(&CAUSE_EXPLANATION, text)
}

/// `Pend Code:` field
#[must_use]
pub fn recognize_pend_code(text: &str) -> Option<String> {
    first_capture(&PEND_CODE, text).map(|code| code.to_ascii_uppercase())
}

/// A revision-history table row `| 1.0 | date | description |`
#[must_use]
pub fn recognize_revision_row(line: &str) -> Option<RevisionEntry> {
    let caps = REVISION_ROW.captures(line.trim())?;
    Some(RevisionEntry {
        revision: caps.get(1)?.as_str().to_string(),
        date: collapse_whitespace(caps.get(2)?.as_str()),
        description: truncate_chars(
            &collapse_whitespace(caps.get(3)?.as_str()),
            MAX_REVISION_DESCRIPTION,
        ),
    })
}

/// All revision rows in document order
#[must_use]
pub fn recognize_revisions(text: &str) -> Vec<RevisionEntry> {
    text.lines().filter_map(recognize_revision_row).collect()
}

/// Offset just past an "Action Required" heading
#[must_use]
pub fn recognize_action_required(text: &str) -> Option<usize> {
    ACTION_REQUIRED.find(text).map(|m| m.end())
}

/// Category headings in text order.
///
/// When several heading styles match the same line the first style wins.
#[must_use]
pub fn recognize_category_headings(text: &str) -> Vec<HeadingMatch> {
    let mut headings: Vec<HeadingMatch> = Vec::new();

    for pattern in CATEGORY_HEADINGS.iter() {
        for caps in pattern.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if headings.iter().any(|h| h.start == whole.start()) {
                continue;
            }
            let name = plain_text(name.as_str());
            if name.is_empty() {
                continue;
            }
            headings.push(HeadingMatch {
                name,
                start: whole.start(),
                end: whole.end(),
            });
        }
    }

    headings.sort_by_key(|h| h.start);
    headings
}

/// Case-folded category key used for duplicate detection
#[must_use]
pub fn category_key(name: &str) -> String {
    collapse_whitespace(&name.to_lowercase())
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Numbered step markers in text order
#[must_use]
pub fn recognize_step_starts(text: &str) -> Vec<StepStart> {
    STEP_START
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(StepStart {
                number: caps.get(1)?.as_str().parse().ok()?,
                start: whole.start(),
                body_start: whole.end(),
            })
        })
        .collect()
}

/// Leading sentence opens with an interrogative verb
#[must_use]
pub fn recognize_interrogative(text: &str) -> bool {
    let sentence = text
        .split(['.', '?', '!', '\n'])
        .next()
        .unwrap_or_default();
    INTERROGATIVE.is_match(sentence.trim_start_matches(|c: char| !c.is_alphanumeric()))
}

/// Yes/no/unsure markers in text order
#[must_use]
pub fn recognize_branch_markers(text: &str) -> Vec<BranchMarker> {
    BRANCH_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(BranchMarker {
                kind: BranchKind::from_word(caps.get(3)?.as_str())?,
                indent: indent_width(caps.get(1).map_or("", |m| m.as_str())),
                glyph: caps.get(2).and_then(|m| m.as_str().chars().next()),
                start: whole.start(),
                body_start: whole.end(),
            })
        })
        .collect()
}

/// Bold-labeled scenario bullets in text order
///
/// Yes/no/unsure and note labels are not scenarios.
#[must_use]
pub fn recognize_labeled_items(text: &str) -> Vec<LabeledItem> {
    LABELED_ITEM
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = collapse_whitespace(caps.get(2)?.as_str());
            let lowered = label.to_ascii_lowercase();
            if matches!(lowered.as_str(), "yes" | "no" | "unsure")
                || lowered.starts_with("note")
                || lowered.starts_with("important note")
            {
                return None;
            }
            Some(LabeledItem {
                label,
                indent: indent_width(caps.get(1).map_or("", |m| m.as_str())),
                start: whole.start(),
                body_start: whole.end(),
            })
        })
        .collect()
}

/// "Continue to the next step" phrasing
#[must_use]
pub fn recognize_continue_to_next_step(text: &str) -> bool {
    CONTINUE_NEXT_STEP.is_match(text)
}

/// Section named by "proceed to the ... section"
#[must_use]
pub fn recognize_proceed_to_section(text: &str) -> Option<String> {
    first_capture(&PROCEED_TO_SECTION, text)
}

/// Reference codes with optional titles, deduplicated by code
#[must_use]
pub fn recognize_references(text: &str) -> Vec<ReferenceMention> {
    let mut found: Vec<ReferenceMention> = Vec::new();

    for caps in REFERENCE.captures_iter(text) {
        let Some(code) = caps.get(1) else { continue };
        let code = code.as_str().to_ascii_uppercase();
        let title = caps
            .get(2)
            .map(|m| plain_text(m.as_str().trim_matches(|c: char| c == '*' || c.is_whitespace())))
            .filter(|t| !t.is_empty());

        match found.iter_mut().find(|r| r.code == code) {
            Some(existing) => {
                if existing.title.is_none() {
                    existing.title = title;
                }
            }
            None => found.push(ReferenceMention { code, title }),
        }
    }

    found
}

/// Bold "Important Note:" spans
#[must_use]
pub fn recognize_important_notes(text: &str) -> Vec<String> {
    IMPORTANT_NOTE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| collapse_whitespace(m.as_str()))
        .filter(|note| !note.is_empty())
        .collect()
}
