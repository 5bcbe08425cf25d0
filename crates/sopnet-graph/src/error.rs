//! Graph error types

use crate::category::CategoryPathError;
use crate::ids::{EdgeId, NodeId};
use crate::reference::ReferenceStatus;

/// Errors raised by world-network mutations and queries
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node id not present in the network
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Edge endpoint missing at creation time
    #[error("edge {from} -> {to} references a missing node")]
    DanglingEdge {
        /// Source endpoint
        from: NodeId,
        /// Target endpoint
        to: NodeId,
    },

    /// Edge id not present in the network
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// Category key already mapped to a node
    #[error("category already registered: {0}")]
    DuplicateCategory(String),

    /// No category or linked procedure under this key
    #[error("unknown category or procedure key: {0}")]
    UnknownKey(String),

    /// Reference code never registered
    #[error("unknown reference code: {0}")]
    UnknownReference(String),

    /// Reference status change not allowed by the state machine
    #[error("illegal status transition for {code}: {from} -> {to}")]
    IllegalTransition {
        /// Reference code
        code: String,
        /// Current status
        from: ReferenceStatus,
        /// Requested status
        to: ReferenceStatus,
    },

    /// Malformed category key
    #[error("invalid category key: {0}")]
    CategoryPath(#[from] CategoryPathError),

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
