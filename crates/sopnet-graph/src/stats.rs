//! Network statistics

use crate::network::WorldNetwork;
use crate::node::{EdgeKind, NodeKind};
use crate::reference::ReferenceStatus;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sopnet_parser::EntityKind;
use std::collections::{BTreeMap, HashSet};

/// Counts and depths over a network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    /// Total nodes
    pub node_count: usize,
    /// Total edges
    pub edge_count: usize,
    /// Nodes per kind
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    /// Edges per kind
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    /// Maximum depth below each category root
    pub category_depths: IndexMap<String, usize>,
    /// References per resolution status
    pub references_by_status: BTreeMap<ReferenceStatus, usize>,
    /// Total entities
    pub entity_count: usize,
    /// Entities per kind
    pub entities_by_kind: BTreeMap<EntityKind, usize>,
    /// Revision rows
    pub version_count: usize,
    /// Newest revision
    pub current_version: Option<String>,
    /// Decision nodes
    pub decision_points: usize,
    /// Resolved codes with a linked root
    pub linked_procedures: usize,
    /// Rows across all lookup tables
    pub lookup_table_rows: usize,
}

impl GraphStatistics {
    /// References in a given status
    #[must_use]
    pub fn count(&self, status: ReferenceStatus) -> usize {
        self.references_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Check for references still pending or in flight
    #[must_use]
    pub fn has_unresolved(&self) -> bool {
        self.count(ReferenceStatus::Pending) + self.count(ReferenceStatus::Resolving) > 0
    }
}

impl WorldNetwork {
    /// Compute statistics
    #[must_use]
    pub fn statistics(&self) -> GraphStatistics {
        let mut stats = GraphStatistics {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            entity_count: self.entities.len(),
            version_count: self.versions.len(),
            current_version: self.document().current_version.clone(),
            linked_procedures: self.linked_procedures().len(),
            lookup_table_rows: self.lookup_tables.values().map(Vec::len).sum(),
            ..GraphStatistics::default()
        };

        for node in self.nodes() {
            *stats.nodes_by_kind.entry(node.kind).or_default() += 1;
        }
        for edge in self.edges() {
            *stats.edges_by_kind.entry(edge.kind).or_default() += 1;
        }
        for reference in self.references() {
            *stats.references_by_status.entry(reference.status).or_default() += 1;
        }
        for entity in self.entities.iter() {
            *stats.entities_by_kind.entry(entity.kind).or_default() += 1;
        }
        stats.decision_points = stats
            .nodes_by_kind
            .get(&NodeKind::Decision)
            .copied()
            .unwrap_or(0);

        for (path, root) in self.claim_type_roots() {
            stats
                .category_depths
                .insert(path.to_string(), self.max_depth(*root));
        }

        stats
    }

    /// Deepest first-visit depth below `start`
    fn max_depth(&self, start: crate::ids::NodeId) -> usize {
        let mut visited = HashSet::new();
        let mut stack = vec![(start, 0_usize)];
        let mut deepest = 0;
        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            deepest = deepest.max(depth);
            let targets: Vec<_> = self.outgoing(id).map(|e| e.target).collect();
            // reversed so the first edge is explored first
            stack.extend(
                targets
                    .into_iter()
                    .rev()
                    .filter(|t| !visited.contains(t))
                    .map(|t| (t, depth + 1)),
            );
        }
        deepest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use pretty_assertions::assert_eq;
    use sopnet_parser::SopParser;

    const TEXT: &str = "\
| 1.1 | 01/01/2024 | First |
### Amazon Claims
1. Is the provider Vita Health?
 - Yes: Assign ID ABC123DEF and process.
 - No: Refer to PR.OP.CL.2862.
2. Close the pend.
";

    fn stats() -> GraphStatistics {
        let record = SopParser::new().parse(TEXT);
        GraphBuilder::new()
            .build(&record, "MAIN", "Main")
            .unwrap()
            .statistics()
    }

    #[test]
    fn counts_by_kind() {
        let stats = stats();
        assert_eq!(stats.nodes_by_kind[&NodeKind::Root], 1);
        assert_eq!(stats.nodes_by_kind[&NodeKind::Decision], 1);
        assert_eq!(stats.nodes_by_kind[&NodeKind::ReferencePointer], 1);
        assert_eq!(stats.edges_by_kind[&EdgeKind::Sequence], 2);
        assert_eq!(stats.decision_points, 1);
        assert_eq!(stats.nodes_by_kind.values().sum::<usize>(), stats.node_count);
        assert_eq!(stats.current_version.as_deref(), Some("1.1"));
    }

    #[test]
    fn category_depth_counts_longest_chain() {
        // category -> decision -> no branch -> pointer
        assert_eq!(stats().category_depths["Amazon Claims"], 3);
    }

    #[test]
    fn depth_follows_first_edge_first() {
        use crate::network::DocumentInfo;
        use crate::node::NodeDraft;

        // root -> a -> b -> c, with a shortcut root -> c added second
        let mut net = WorldNetwork::new(DocumentInfo::new("MAIN", "Main"));
        let root = net.root();
        let a = net.insert_node(NodeDraft::new(NodeKind::Step, "a"));
        let b = net.insert_node(NodeDraft::new(NodeKind::Step, "b"));
        let c = net.insert_node(NodeDraft::new(NodeKind::Step, "c"));
        net.add_edge(root, a, EdgeKind::Sequence, None).unwrap();
        net.add_edge(root, c, EdgeKind::Sequence, None).unwrap();
        net.add_edge(a, b, EdgeKind::Sequence, None).unwrap();
        net.add_edge(b, c, EdgeKind::Sequence, None).unwrap();

        assert_eq!(net.max_depth(root), 3);
    }

    #[test]
    fn reference_counts() {
        let stats = stats();
        assert_eq!(stats.count(ReferenceStatus::Pending), 1);
        assert_eq!(stats.count(ReferenceStatus::Resolved), 0);
        assert!(stats.has_unresolved());
    }

    #[test]
    fn entity_counts() {
        let stats = stats();
        assert_eq!(stats.entities_by_kind[&EntityKind::ProviderId], 1);
        assert_eq!(stats.entities_by_kind.values().sum::<usize>(), stats.entity_count);
    }
}
