//! World network
//!
//! One document's decision graph plus everything merged into it: nodes,
//! edges, entities, procedure references, versions, category roots and
//! linked procedures. Id counters and adjacency are owned by the value and
//! rebuilt after deserialization.

use crate::category::CategoryPath;
use crate::error::GraphError;
use crate::hash::ContentHash;
use crate::ids::{EdgeId, NodeId};
use crate::node::{Edge, EdgeKind, Node, NodeDraft, NodeKind, META_DOCUMENT_KEY};
use crate::reference::{ProcedureReference, ReferenceStatus};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sopnet_parser::{DocumentHeader, EntityRegistry, LookupTables, RevisionEntry};
use std::collections::HashMap;

/// Document metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Natural key (reference code or derived hash key)
    pub key: String,
    /// Display name
    pub name: String,
    /// Document type, e.g. `PR.OP.CL`
    #[serde(default)]
    pub document_type: Option<String>,
    /// Document number
    #[serde(default)]
    pub document_number: Option<String>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
    /// Cause/explanation paragraph
    #[serde(default)]
    pub cause_explanation: Option<String>,
    /// Pend code handled by the procedure
    #[serde(default)]
    pub pend_code: Option<String>,
    /// Revision number of the newest history row
    #[serde(default)]
    pub current_version: Option<String>,
}

impl DocumentInfo {
    /// Metadata with only key and name
    #[must_use]
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Metadata from a parsed header
    #[must_use]
    pub fn from_header(key: &str, name: &str, header: &DocumentHeader) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            document_type: header.document_type.clone(),
            document_number: header.document_number.clone(),
            status: header.status.clone(),
            cause_explanation: header.cause_explanation.clone(),
            pend_code: header.pend_code.clone(),
            current_version: None,
        }
    }
}

/// One revision-history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Revision number
    pub revision: String,
    /// Date as written
    pub date: String,
    /// Change description
    pub description: String,
    /// Short Blake3 fingerprint of the description
    pub content_hash: String,
}

impl Version {
    /// Version from a parsed revision row
    #[must_use]
    pub fn from_revision(entry: &RevisionEntry) -> Self {
        Self {
            revision: entry.revision.clone(),
            date: entry.date.clone(),
            description: entry.description.clone(),
            content_hash: ContentHash::compute(entry.description.as_bytes()).short(),
        }
    }
}

pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// A document's decision graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldNetwork {
    document: DocumentInfo,
    root: NodeId,
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    /// Deduplicated entities
    pub entities: EntityRegistry,
    procedure_refs: IndexMap<String, ProcedureReference>,
    /// Revision history, newest first as written
    pub versions: Vec<Version>,
    claim_type_roots: IndexMap<CategoryPath, NodeId>,
    linked_procedures: IndexMap<String, NodeId>,
    /// Provider lookup tables
    pub lookup_tables: LookupTables,
    #[serde(skip)]
    next_node: u32,
    #[serde(skip)]
    next_edge: u32,
    #[serde(skip)]
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
}

impl WorldNetwork {
    /// Empty network holding only its root node
    #[must_use]
    pub fn new(document: DocumentInfo) -> Self {
        let mut network = Self {
            document,
            root: NodeId::new(0),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            entities: EntityRegistry::new(),
            procedure_refs: IndexMap::new(),
            versions: Vec::new(),
            claim_type_roots: IndexMap::new(),
            linked_procedures: IndexMap::new(),
            lookup_tables: LookupTables::new(),
            next_node: 0,
            next_edge: 0,
            outgoing: HashMap::new(),
        };
        let root = NodeDraft::new(NodeKind::Root, network.document.name.clone())
            .with_metadata(META_DOCUMENT_KEY, network.document.key.clone());
        network.root = network.insert_node(root);
        network
    }

    /// Document metadata
    #[inline]
    #[must_use]
    pub fn document(&self) -> &DocumentInfo {
        &self.document
    }

    /// Mutable document metadata
    #[inline]
    pub fn document_mut(&mut self) -> &mut DocumentInfo {
        &mut self.document
    }

    /// Root node id
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate an id and insert a node
    pub fn insert_node(&mut self, draft: NodeDraft) -> NodeId {
        self.next_node += 1;
        let id = NodeId::new(self.next_node);
        self.nodes.insert(id, draft.into_node(id));
        id
    }

    /// Allocate an id and insert an edge
    ///
    /// # Errors
    /// Returns [`GraphError::DanglingEdge`] if either endpoint is missing
    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: EdgeKind,
        condition: Option<String>,
    ) -> Result<EdgeId, GraphError> {
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return Err(GraphError::DanglingEdge { from, to });
        }
        self.next_edge += 1;
        let id = EdgeId::new(self.next_edge);
        self.edges.insert(
            id,
            Edge {
                id,
                source: from,
                target: to,
                kind,
                condition,
            },
        );
        self.outgoing.entry(from).or_default().push(id);
        Ok(id)
    }

    /// Append entity ids to an existing node
    ///
    /// # Errors
    /// Returns [`GraphError::NodeNotFound`] if the node is missing
    pub fn append_entities(
        &mut self,
        id: NodeId,
        entities: impl IntoIterator<Item = sopnet_parser::EntityId>,
    ) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        for entity in entities {
            if !node.entities.contains(&entity) {
                node.entities.push(entity);
            }
        }
        Ok(())
    }

    /// Look up a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Look up an edge
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in creation order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Outgoing edges of a node in creation order
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|edge| self.edges.get(edge))
    }

    /// Check for an edge of a given kind between two nodes
    #[must_use]
    pub fn has_edge(&self, from: NodeId, to: NodeId, kind: EdgeKind) -> bool {
        self.outgoing(from).any(|e| e.target == to && e.kind == kind)
    }

    /// Map a category key to its root node
    ///
    /// # Errors
    /// Returns [`GraphError::DuplicateCategory`] if the key is taken, or
    /// [`GraphError::NodeNotFound`] if the node is missing
    pub fn register_category(&mut self, path: CategoryPath, node: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&node) {
            return Err(GraphError::NodeNotFound(node));
        }
        match self.claim_type_roots.entry(path) {
            Entry::Occupied(entry) => Err(GraphError::DuplicateCategory(entry.key().to_string())),
            Entry::Vacant(entry) => {
                entry.insert(node);
                Ok(())
            }
        }
    }

    /// Root node of a category
    #[must_use]
    pub fn category_root(&self, path: &CategoryPath) -> Option<NodeId> {
        self.claim_type_roots.get(path).copied()
    }

    /// All category keys and their roots
    #[must_use]
    pub fn claim_type_roots(&self) -> &IndexMap<CategoryPath, NodeId> {
        &self.claim_type_roots
    }

    /// Register a reference as pending, or fill in a missing title and context
    ///
    /// Returns `true` if the code was new.
    pub fn register_reference(
        &mut self,
        code: &str,
        title: Option<String>,
        depth: u32,
        source_context: Option<String>,
    ) -> bool {
        match self.procedure_refs.entry(normalize_code(code)) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.title.is_none() {
                    existing.title = title;
                }
                if existing.source_context.is_none() {
                    existing.source_context = source_context;
                }
                false
            }
            Entry::Vacant(entry) => {
                let mut reference = ProcedureReference::pending(entry.key().clone(), title, depth);
                reference.source_context = source_context;
                entry.insert(reference);
                true
            }
        }
    }

    /// Look up a reference
    #[must_use]
    pub fn reference(&self, code: &str) -> Option<&ProcedureReference> {
        self.procedure_refs.get(&normalize_code(code))
    }

    /// All references in registration order
    pub fn references(&self) -> impl Iterator<Item = &ProcedureReference> {
        self.procedure_refs.values()
    }

    /// Codes currently pending, in registration order
    #[must_use]
    pub fn pending_codes(&self) -> Vec<String> {
        self.procedure_refs
            .values()
            .filter(|r| r.status == ReferenceStatus::Pending)
            .map(|r| r.code.clone())
            .collect()
    }

    /// Move a reference to a new status through the state machine
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownReference`] for unregistered codes and
    /// [`GraphError::IllegalTransition`] for disallowed changes
    pub fn set_reference_status(
        &mut self,
        code: &str,
        status: ReferenceStatus,
        message: Option<String>,
    ) -> Result<(), GraphError> {
        let code = normalize_code(code);
        let reference = self
            .procedure_refs
            .get_mut(&code)
            .ok_or_else(|| GraphError::UnknownReference(code.clone()))?;
        if !reference.status.can_transition_to(status) {
            return Err(GraphError::IllegalTransition {
                code,
                from: reference.status,
                to: status,
            });
        }
        reference.status = status;
        if message.is_some() {
            reference.message = message;
        }
        Ok(())
    }

    /// Return every `resolving` reference to `pending`
    ///
    /// Only a resolution call that was dropped mid-fetch leaves codes in
    /// `resolving`; nothing was merged for them. Returns the re-queued codes.
    pub fn requeue_resolving(&mut self) -> Vec<String> {
        let mut requeued = Vec::new();
        for reference in self.procedure_refs.values_mut() {
            if reference.status == ReferenceStatus::Resolving {
                reference.status = ReferenceStatus::Pending;
                requeued.push(reference.code.clone());
            }
        }
        requeued
    }

    /// Record the node standing in for a resolved code
    pub fn link_procedure(&mut self, code: &str, node: NodeId) {
        self.linked_procedures.insert(normalize_code(code), node);
    }

    /// Node standing in for a resolved code
    #[must_use]
    pub fn linked_root(&self, code: &str) -> Option<NodeId> {
        self.linked_procedures.get(&normalize_code(code)).copied()
    }

    /// All resolved codes and their linked roots
    #[must_use]
    pub fn linked_procedures(&self) -> &IndexMap<String, NodeId> {
        &self.linked_procedures
    }

    /// Reference-pointer nodes naming `code`
    #[must_use]
    pub fn pointers_to(&self, code: &str) -> Vec<NodeId> {
        let code = normalize_code(code);
        self.nodes
            .values()
            .filter(|n| n.kind == NodeKind::ReferencePointer && n.reference_code() == Some(code.as_str()))
            .map(|n| n.id)
            .collect()
    }

    /// Pretty JSON rendering of the serialized contract
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild a network from its JSON rendering
    ///
    /// # Errors
    /// Returns error on malformed JSON or on edges whose endpoints are missing
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let mut network: Self = serde_json::from_str(json)?;
        network.reindex()?;
        Ok(network)
    }

    /// Check every edge endpoint and the root
    ///
    /// # Errors
    /// Returns the first violation found
    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&self.root) {
            return Err(GraphError::NodeNotFound(self.root));
        }
        for edge in self.edges.values() {
            if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
                return Err(GraphError::DanglingEdge {
                    from: edge.source,
                    to: edge.target,
                });
            }
        }
        Ok(())
    }

    fn reindex(&mut self) -> Result<(), GraphError> {
        self.validate()?;
        self.next_node = self.nodes.keys().map(|id| id.get()).max().unwrap_or(0);
        self.next_edge = self.edges.keys().map(|id| id.get()).max().unwrap_or(0);
        self.outgoing.clear();
        for edge in self.edges.values() {
            self.outgoing.entry(edge.source).or_default().push(edge.id);
        }
        Ok(())
    }
}
