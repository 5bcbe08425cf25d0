//! Read-only queries over a finished network
//!
//! Every traversal keeps a visited set, so cycles introduced by deep links
//! (A -> B -> A) never loop.

use crate::category::CategoryPath;
use crate::error::GraphError;
use crate::ids::{EdgeId, NodeId};
use crate::network::WorldNetwork;
use crate::node::{Edge, EdgeKind, Node, NodeKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Nodes and edges reachable from one root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    /// Traversal start
    pub root: NodeId,
    /// Reached nodes in first-visit order
    pub nodes: IndexMap<NodeId, Node>,
    /// Edges whose source was reached
    pub edges: IndexMap<EdgeId, Edge>,
}

impl Subgraph {
    /// Check whether a node was reached
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}

/// Answers to decision conditions, keyed by node and condition label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionAnswers {
    answers: HashMap<(NodeId, String), bool>,
}

impl ConditionAnswers {
    /// No answers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer; labels compare case-insensitively
    #[inline]
    #[must_use]
    pub fn with_answer(mut self, node: NodeId, label: &str, value: bool) -> Self {
        self.answer(node, label, value);
        self
    }

    /// Record an answer in place
    pub fn answer(&mut self, node: NodeId, label: &str, value: bool) {
        self.answers.insert((node, label.to_uppercase()), value);
    }

    /// Look up an answer
    #[must_use]
    pub fn get(&self, node: NodeId, label: &str) -> Option<bool> {
        self.answers.get(&(node, label.to_uppercase())).copied()
    }
}

impl WorldNetwork {
    /// Subgraph under a category key or a resolved reference code
    ///
    /// Keys are tried as `claim_type_roots` entries first (`Amazon Claims`,
    /// `PR.OP.CL.2862/Amazon Claims`), then as linked procedure codes.
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownKey`] if neither lookup matches
    pub fn subgraph_for(&self, key: &str) -> Result<Subgraph, GraphError> {
        let category = key
            .parse::<CategoryPath>()
            .ok()
            .and_then(|path| self.category_root(&path));
        let start = category
            .or_else(|| self.linked_root(key))
            .ok_or_else(|| GraphError::UnknownKey(key.to_string()))?;
        self.subgraph_from(start)
    }

    /// Everything reachable from `start` along outgoing edges
    ///
    /// # Errors
    /// Returns [`GraphError::NodeNotFound`] if `start` is not in the network
    pub fn subgraph_from(&self, start: NodeId) -> Result<Subgraph, GraphError> {
        if self.node(start).is_none() {
            return Err(GraphError::NodeNotFound(start));
        }

        let mut nodes = IndexMap::new();
        let mut edges = IndexMap::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if nodes.contains_key(&id) {
                continue;
            }
            let node = self.node(id).ok_or(GraphError::NodeNotFound(id))?;
            nodes.insert(id, node.clone());

            let outgoing: Vec<&Edge> = self.outgoing(id).collect();
            for edge in &outgoing {
                edges.insert(edge.id, (*edge).clone());
            }
            // reversed so the first edge is explored first
            stack.extend(
                outgoing
                    .iter()
                    .rev()
                    .map(|e| e.target)
                    .filter(|t| !nodes.contains_key(t)),
            );
        }

        Ok(Subgraph {
            root: start,
            nodes,
            edges,
        })
    }

    /// Walk the flow from `start` under a set of answered conditions
    ///
    /// Sequence edges are followed unconditionally. At a node with
    /// conditional out-edges the first edge answered `true` is taken; with
    /// no such answer the walk stops. A branch that says "continue to the
    /// next step" resumes after its decision.
    ///
    /// # Errors
    /// Returns [`GraphError::NodeNotFound`] if `start` is not in the network
    pub fn evaluate_path(
        &self,
        start: NodeId,
        answers: &ConditionAnswers,
    ) -> Result<Vec<NodeId>, GraphError> {
        let mut current = self.node(start).ok_or(GraphError::NodeNotFound(start))?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(current.id) {
                break;
            }
            path.push(current.id);

            let next = if self.has_conditions(current) {
                self.answered_edge(current.id, answers)
            } else if current.continues_to_next_step() {
                self.step_after_decision(current)
            } else {
                self.first_edge(current.id, EdgeKind::Sequence)
                    .or_else(|| self.first_edge(current.id, EdgeKind::ProceedToSection))
            };

            match next.and_then(|id| self.node(id)) {
                Some(node) => current = node,
                None => break,
            }
        }

        Ok(path)
    }

    fn has_conditions(&self, node: &Node) -> bool {
        node.kind == NodeKind::Decision
            || (node.kind.is_branch() && self.outgoing(node.id).any(|e| e.kind.is_conditional()))
    }

    fn answered_edge(&self, id: NodeId, answers: &ConditionAnswers) -> Option<NodeId> {
        self.outgoing(id)
            .filter(|e| e.kind.is_conditional())
            .find(|e| {
                e.condition
                    .as_deref()
                    .and_then(|label| answers.get(id, label))
                    .unwrap_or(false)
            })
            .map(|e| e.target)
    }

    fn first_edge(&self, id: NodeId, kind: EdgeKind) -> Option<NodeId> {
        self.outgoing(id).find(|e| e.kind == kind).map(|e| e.target)
    }

    /// Sequence successor of the decision a branch hangs under
    fn step_after_decision(&self, node: &Node) -> Option<NodeId> {
        let mut seen = HashSet::new();
        let mut parent = node.parent;
        while let Some(id) = parent {
            if !seen.insert(id) {
                return None;
            }
            let ancestor = self.node(id)?;
            if ancestor.kind == NodeKind::Decision {
                return self.first_edge(id, EdgeKind::Sequence);
            }
            parent = ancestor.parent;
        }
        None
    }
}
