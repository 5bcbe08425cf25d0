//! SOP Graph
//!
//! The world network: a directed decision graph built from one procedural
//! document, extended in place as referenced documents are merged in.
//!
//! # Core Concepts
//!
//! - [`WorldNetwork`]: Owns nodes, edges, entities, references and category roots
//! - [`GraphBuilder`]: Structural record to un-resolved network, deterministically
//! - [`merge_into`]: Graph union of a sub-network under a reference code
//! - [`ReferenceStatus`]: Monotonic resolution state machine
//! - [`Subgraph`] / [`ConditionAnswers`]: Reachability and path queries
//! - [`ObservationNetwork`]: Entities and clinic rows across documents
//!
//! # Example
//!
//! ```rust,ignore
//! use sopnet_graph::GraphBuilder;
//! use sopnet_parser::SopParser;
//!
//! let record = SopParser::new().parse(text);
//! let network = GraphBuilder::new().build(&record, "PR.OP.CL.2862", "Returning Claims")?;
//! let amazon = network.subgraph_for("Amazon Claims")?;
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod builder;
mod category;
mod error;
mod hash;
mod ids;
mod merge;
mod network;
mod node;
mod observation;
mod query;
mod reference;
mod stats;

pub use builder::GraphBuilder;
pub use category::{CategoryPath, CategoryPathError, SEPARATOR};
pub use error::GraphError;
pub use hash::{document_key_for, ContentHash, DOCUMENT_KEY_LEN};
pub use ids::{EdgeId, IdParseError, NodeId};
pub use merge::{add_deep_links, link_self_reference, merge_into, MergeOutcome};
pub use network::{DocumentInfo, Version, WorldNetwork};
pub use node::{
    Edge, EdgeKind, Node, NodeDraft, NodeKind, META_CONTINUE, META_DOCUMENT_KEY, META_NOTES,
    META_ORIGIN, META_PROCEED, META_RAW, META_REFERENCE_CODE, META_REFERENCE_TITLE,
    META_SCENARIO,
};
pub use observation::{ObservationNetwork, ObservationSummary};
pub use query::{ConditionAnswers, Subgraph};
pub use reference::{ProcedureReference, ReferenceStatus};
pub use stats::GraphStatistics;

/// Commonly used types
pub mod prelude {
    pub use crate::{
        CategoryPath, ConditionAnswers, EdgeKind, GraphBuilder, GraphError, NodeId, NodeKind,
        ReferenceStatus, WorldNetwork,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
