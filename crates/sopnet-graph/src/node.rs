//! Nodes and edges of a world network

use crate::ids::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sopnet_parser::{BranchKind, EntityId};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Metadata key: important notes attached to a step
pub const META_NOTES: &str = "notes";
/// Metadata key: raw source excerpt
pub const META_RAW: &str = "raw";
/// Metadata key: scenario label of a labeled sub-item
pub const META_SCENARIO: &str = "scenario";
/// Metadata key: branch text says to continue with the next step
pub const META_CONTINUE: &str = "continue_to_next_step";
/// Metadata key: section named by "proceed to the ... section"
pub const META_PROCEED: &str = "proceed_to_section";
/// Metadata key: reference code of a pointer or linked root
pub const META_REFERENCE_CODE: &str = "reference_code";
/// Metadata key: reference title
pub const META_REFERENCE_TITLE: &str = "reference_title";
/// Metadata key: document key of a root or linked root
pub const META_DOCUMENT_KEY: &str = "document_key";
/// Metadata key: reference code of the document a merged node came from
pub const META_ORIGIN: &str = "origin";

/// Node kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Document root
    Root,
    /// Root of one category's flow
    CategoryRoot,
    /// Question step with branches
    Decision,
    /// Plain instruction step
    Step,
    /// Affirmative branch (top-level or nested)
    BranchYes,
    /// Negative branch (top-level or nested)
    BranchNo,
    /// Undetermined branch
    BranchUnsure,
    /// Generic nested condition
    SubCondition,
    /// Labeled scenario action
    Action,
    /// Placeholder pointing at another document
    ReferencePointer,
    /// Root of a merged external document
    LinkedRoot,
}

impl NodeKind {
    /// All kinds
    pub const ALL: [Self; 11] = [
        Self::Root,
        Self::CategoryRoot,
        Self::Decision,
        Self::Step,
        Self::BranchYes,
        Self::BranchNo,
        Self::BranchUnsure,
        Self::SubCondition,
        Self::Action,
        Self::ReferencePointer,
        Self::LinkedRoot,
    ];

    /// Node kind for a top-level branch outcome
    #[must_use]
    pub const fn for_branch(kind: BranchKind) -> Self {
        match kind {
            BranchKind::Yes => Self::BranchYes,
            BranchKind::No => Self::BranchNo,
            BranchKind::Unsure => Self::BranchUnsure,
        }
    }

    /// Branch-like kinds that may carry nested conditions
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Self::BranchYes | Self::BranchNo | Self::BranchUnsure | Self::SubCondition | Self::Action
        )
    }

    /// Stable snake_case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::CategoryRoot => "category_root",
            Self::Decision => "decision",
            Self::Step => "step",
            Self::BranchYes => "branch_yes",
            Self::BranchNo => "branch_no",
            Self::BranchUnsure => "branch_unsure",
            Self::SubCondition => "sub_condition",
            Self::Action => "action",
            Self::ReferencePointer => "reference_pointer",
            Self::LinkedRoot => "linked_root",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Step order within a category
    Sequence,
    /// Decision to its yes branch
    ConditionYes,
    /// Decision to its no branch
    ConditionNo,
    /// Decision to its unsure branch
    ConditionUnsure,
    /// Branch to a nested yes
    NestedYes,
    /// Branch to a nested no
    NestedNo,
    /// Branch to a nested unsure or labeled scenario
    Nested,
    /// Root to category
    Contains,
    /// Owner to reference pointer
    Reference,
    /// Reference pointer to linked root
    DeepLink,
    /// Branch to the category it sends the reader to
    ProceedToSection,
}

impl EdgeKind {
    /// All kinds
    pub const ALL: [Self; 11] = [
        Self::Sequence,
        Self::ConditionYes,
        Self::ConditionNo,
        Self::ConditionUnsure,
        Self::NestedYes,
        Self::NestedNo,
        Self::Nested,
        Self::Contains,
        Self::Reference,
        Self::DeepLink,
        Self::ProceedToSection,
    ];

    /// Edge kind from a decision to a top-level branch
    #[must_use]
    pub const fn for_branch(kind: BranchKind) -> Self {
        match kind {
            BranchKind::Yes => Self::ConditionYes,
            BranchKind::No => Self::ConditionNo,
            BranchKind::Unsure => Self::ConditionUnsure,
        }
    }

    /// Edges taken only when their condition is answered
    #[must_use]
    pub const fn is_conditional(self) -> bool {
        matches!(
            self,
            Self::ConditionYes
                | Self::ConditionNo
                | Self::ConditionUnsure
                | Self::NestedYes
                | Self::NestedNo
                | Self::Nested
        )
    }

    /// Stable snake_case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::ConditionYes => "condition_yes",
            Self::ConditionNo => "condition_no",
            Self::ConditionUnsure => "condition_unsure",
            Self::NestedYes => "nested_yes",
            Self::NestedNo => "nested_no",
            Self::Nested => "nested",
            Self::Contains => "contains",
            Self::Reference => "reference",
            Self::DeepLink => "deep_link",
            Self::ProceedToSection => "proceed_to_section",
        }
    }
}

impl Display for EdgeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A graph vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier
    pub id: NodeId,
    /// Kind tag
    #[serde(rename = "node_type")]
    pub kind: NodeKind,
    /// Free-text content
    pub content: String,
    /// Step number for step, decision and branch nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
    /// Category label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Structural parent (category for steps, decision for branches, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    /// Auxiliary metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    /// Entities mentioned in the node's text
    #[serde(default)]
    pub entities: Vec<EntityId>,
}

impl Node {
    /// Reference code of a pointer or linked root
    #[must_use]
    pub fn reference_code(&self) -> Option<&str> {
        self.metadata.get(META_REFERENCE_CODE).and_then(Value::as_str)
    }

    /// Branch text says to continue with the next step
    #[must_use]
    pub fn continues_to_next_step(&self) -> bool {
        self.metadata.get(META_CONTINUE) == Some(&Value::Bool(true))
    }

    /// Scenario label of a labeled action
    #[must_use]
    pub fn scenario(&self) -> Option<&str> {
        self.metadata.get(META_SCENARIO).and_then(Value::as_str)
    }
}

/// Node under construction; ids are assigned on insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub(crate) kind: NodeKind,
    pub(crate) content: String,
    pub(crate) step_number: Option<u32>,
    pub(crate) section: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) metadata: BTreeMap<String, Value>,
    pub(crate) entities: Vec<EntityId>,
}

impl NodeDraft {
    /// Start a draft
    #[must_use]
    pub fn new(kind: NodeKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            step_number: None,
            section: None,
            parent: None,
            metadata: BTreeMap::new(),
            entities: Vec::new(),
        }
    }

    /// Draft copying everything except id and parent from an existing node
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        Self {
            kind: node.kind,
            content: node.content.clone(),
            step_number: node.step_number,
            section: node.section.clone(),
            parent: None,
            metadata: node.metadata.clone(),
            entities: node.entities.clone(),
        }
    }

    /// Set step number
    #[inline]
    #[must_use]
    pub fn with_step(mut self, number: u32) -> Self {
        self.step_number = Some(number);
        self
    }

    /// Set category label
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: Option<impl Into<String>>) -> Self {
        self.section = section.map(Into::into);
        self
    }

    /// Set structural parent
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: Option<NodeId>) -> Self {
        self.parent = parent;
        self
    }

    /// Add a metadata entry
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Set mentioned entities
    #[inline]
    #[must_use]
    pub fn with_entities(mut self, entities: Vec<EntityId>) -> Self {
        self.entities = entities;
        self
    }

    pub(crate) fn into_node(self, id: NodeId) -> Node {
        Node {
            id,
            kind: self.kind,
            content: self.content,
            step_number: self.step_number,
            section: self.section,
            parent: self.parent,
            metadata: self.metadata,
            entities: self.entities,
        }
    }
}

/// A directed relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Stable identifier
    pub id: EdgeId,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Kind tag
    #[serde(rename = "edge_type")]
    pub kind: EdgeKind,
    /// Condition label, e.g. `YES`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&NodeKind::ReferencePointer).unwrap(),
            "\"reference_pointer\""
        );
        assert_eq!(
            serde_json::to_string(&EdgeKind::ProceedToSection).unwrap(),
            "\"proceed_to_section\""
        );
    }

    #[test]
    fn as_str_matches_serde_tag() {
        for kind in NodeKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.as_str());
        }
        for kind in EdgeKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.as_str());
        }
    }

    #[test]
    fn conditional_edges() {
        assert!(EdgeKind::ConditionYes.is_conditional());
        assert!(EdgeKind::Nested.is_conditional());
        assert!(!EdgeKind::Sequence.is_conditional());
        assert!(!EdgeKind::DeepLink.is_conditional());
    }

    #[test]
    fn draft_builds_node_with_metadata() {
        let node = NodeDraft::new(NodeKind::BranchNo, "Continue to the next step.")
            .with_step(1)
            .with_section(Some("Amazon Claims"))
            .with_metadata(META_CONTINUE, true)
            .into_node(NodeId::new(3));

        assert_eq!(node.id, NodeId::new(3));
        assert!(node.continues_to_next_step());
        assert_eq!(node.section.as_deref(), Some("Amazon Claims"));
    }

    #[test]
    fn node_serializes_kind_as_node_type() {
        let node = NodeDraft::new(NodeKind::Root, "Doc").into_node(NodeId::new(1));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["node_type"], "root");
        assert_eq!(json["id"], "node_0001");
        assert!(json.get("metadata").is_none());
    }
}
