//! Structural record produced by the parser

use crate::entity::{EntityId, EntityRegistry};
use crate::tables::LookupTables;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Everything the parser recovered from one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralRecord {
    /// Normalized source text (`\r\n` folded to `\n`)
    pub source: String,
    /// Document header fields
    pub header: DocumentHeader,
    /// Revision history rows, in document order
    pub revisions: Vec<RevisionEntry>,
    /// Claim categories in first-appearance order
    pub categories: Vec<CategoryRecord>,
    /// Provider lookup tables keyed by table name
    pub lookup_tables: LookupTables,
    /// Every reference code in the full text, first-seen order
    pub references: IndexMap<String, ReferenceMention>,
    /// Entities seen inside steps, branches and tables
    pub entities: EntityRegistry,
}

impl StructuralRecord {
    /// Total number of steps across all categories
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.categories.iter().map(|c| c.steps.len()).sum()
    }

    /// Find a category by exact name
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryRecord> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Document header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    /// Title from the first level-one heading
    pub title: Option<String>,
    /// Document type, e.g. `PR.OP.CL`
    pub document_type: Option<String>,
    /// Document number
    pub document_number: Option<String>,
    /// Lifecycle status, e.g. `Active`
    pub status: Option<String>,
    /// Cause/explanation paragraph
    pub cause_explanation: Option<String>,
    /// Pend code the procedure handles
    pub pend_code: Option<String>,
}

/// One revision-history row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEntry {
    /// Revision number, e.g. `1.3`
    pub revision: String,
    /// Revision date as written
    pub date: String,
    /// Change description (bounded length)
    pub description: String,
}

/// A claim-type category and its numbered steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Display name from the heading
    pub name: String,
    /// Steps in document order
    pub steps: Vec<StepRecord>,
    /// Byte length of the category body
    pub raw_len: usize,
}

/// Step classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Question with conditional branches
    Decision,
    /// Plain instruction
    Plain,
}

/// One numbered step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Number as written in the document
    pub number: u32,
    /// Decision or plain
    pub kind: StepKind,
    /// Question text for decisions, full instruction text otherwise
    pub text: String,
    /// Important-note spans attached to the step
    pub notes: Vec<String>,
    /// Branches (empty for plain steps)
    pub branches: Vec<BranchRecord>,
    /// Entities mentioned in the step's own text
    pub entity_ids: Vec<EntityId>,
    /// References mentioned in the step's own text
    pub references: Vec<ReferenceMention>,
    /// Raw excerpt of the step body
    pub raw: String,
}

/// Top-level branch outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// Affirmative answer
    Yes,
    /// Negative answer
    No,
    /// Undetermined answer
    Unsure,
}

impl BranchKind {
    /// Upper-case condition label (`YES`, `NO`, `UNSURE`)
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Unsure => "UNSURE",
        }
    }

    pub(crate) fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "unsure" => Some(Self::Unsure),
            _ => None,
        }
    }
}

/// A conditional branch of a decision step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Outcome
    pub kind: BranchKind,
    /// Action text preceding any sub-conditions
    pub action: String,
    /// Action says to continue with the next step
    pub continues_to_next_step: bool,
    /// Target section named by "proceed to the ... section"
    pub proceed_to_section: Option<String>,
    /// Nested conditions and labeled scenarios
    pub sub_conditions: Vec<SubConditionRecord>,
    /// Entities mentioned in the action text
    pub entity_ids: Vec<EntityId>,
    /// References mentioned in the action text
    pub references: Vec<ReferenceMention>,
    /// Raw excerpt of the branch body
    pub raw: String,
}

/// Kind of nested item inside a branch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "label", rename_all = "snake_case")]
pub enum SubConditionKind {
    /// Nested affirmative outcome
    NestedYes,
    /// Nested negative outcome
    NestedNo,
    /// Nested undetermined outcome
    NestedUnsure,
    /// Bold-labeled scenario (`- **Provider-submitted:** ...`)
    Labeled(String),
}

impl SubConditionKind {
    /// Condition label used on the edge into this item
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::NestedYes => "YES".to_string(),
            Self::NestedNo => "NO".to_string(),
            Self::NestedUnsure => "UNSURE".to_string(),
            Self::Labeled(label) => label.clone(),
        }
    }

    pub(crate) fn nested(kind: BranchKind) -> Self {
        match kind {
            BranchKind::Yes => Self::NestedYes,
            BranchKind::No => Self::NestedNo,
            BranchKind::Unsure => Self::NestedUnsure,
        }
    }
}

/// A nested condition or scenario under a branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubConditionRecord {
    /// Nested outcome or scenario label
    pub kind: SubConditionKind,
    /// Plain text of the item
    pub text: String,
    /// Item says to continue with the next step
    pub continues_to_next_step: bool,
    /// Target section named by "proceed to the ... section"
    pub proceed_to_section: Option<String>,
    /// Entities mentioned in the item
    pub entity_ids: Vec<EntityId>,
    /// References mentioned in the item
    pub references: Vec<ReferenceMention>,
}

/// A reference to another procedure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceMention {
    /// Upper-cased procedure code, e.g. `PR.OP.CL.2862`
    pub code: String,
    /// Title written after the code, if any
    pub title: Option<String>,
}
