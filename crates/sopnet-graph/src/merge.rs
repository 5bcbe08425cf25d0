//! Graph union
//!
//! Splices a self-contained sub-network (one referenced document, freshly
//! built) into a main network under its reference code. The sub-network's
//! root collapses into a single `linked_root` node; every other node and
//! edge is copied under fresh ids through a remap table. Deep-link edges
//! from reference pointers are spliced in only after the copy.

use crate::category::{CategoryPath, SEPARATOR};
use crate::error::GraphError;
use crate::ids::NodeId;
use crate::network::{normalize_code, WorldNetwork};
use crate::node::{
    EdgeKind, NodeDraft, NodeKind, META_DOCUMENT_KEY, META_ORIGIN, META_REFERENCE_CODE,
};
use crate::reference::{ProcedureReference, ReferenceStatus};
use indexmap::IndexMap;

/// Result of one [`merge_into`] call
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Sub-network node id -> main network node id
    pub remap: IndexMap<NodeId, NodeId>,
    /// Node standing in for the sub-network's root
    pub linked_root: NodeId,
    /// Codes referenced by the sub-network and unknown to the main network
    pub discovered: Vec<ProcedureReference>,
}

/// Merge `sub` into `main` under reference code `code`
///
/// The sub-network is validated before anything is written: a `sub` with
/// dangling edges or a missing root is rejected with `main` untouched. An
/// error raised after copying has started can leave partially copied nodes
/// in `main`. Discovered codes are returned, not registered; the caller
/// decides their depth.
///
/// # Errors
/// Returns a [`GraphError`] if `sub` fails validation, or if an edge or
/// category cannot be added to `main` during the copy
pub fn merge_into(
    main: &mut WorldNetwork,
    sub: &WorldNetwork,
    code: &str,
) -> Result<MergeOutcome, GraphError> {
    sub.validate()?;
    let code = normalize_code(code);

    let linked_root = main.insert_node(
        NodeDraft::new(NodeKind::LinkedRoot, sub.document().name.clone())
            .with_metadata(META_REFERENCE_CODE, code.clone())
            .with_metadata(META_DOCUMENT_KEY, sub.document().key.clone()),
    );

    let mut remap = IndexMap::with_capacity(sub.node_count());
    remap.insert(sub.root(), linked_root);
    for node in sub.nodes().filter(|n| n.id != sub.root()) {
        let section = node
            .section
            .as_deref()
            .map(|s| CategoryPath::namespaced(&code, s).to_string());
        let draft = NodeDraft::from_node(node)
            .with_section(section)
            .with_metadata(META_ORIGIN, code.clone());
        remap.insert(node.id, main.insert_node(draft));
    }

    // parents may be declared after their children in deserialized input
    for node in sub.nodes() {
        let (Some(parent), Some(&copy)) = (node.parent, remap.get(&node.id)) else {
            continue;
        };
        if copy == linked_root {
            continue;
        }
        let parent = remap.get(&parent).copied();
        if let Some(copied) = main.node_mut(copy) {
            copied.parent = parent;
        }
    }

    for edge in sub.edges() {
        let source = lookup(&remap, edge.source)?;
        let target = lookup(&remap, edge.target)?;
        main.add_edge(source, target, edge.kind, edge.condition.clone())?;
    }

    main.link_procedure(&code, linked_root);

    for (path, node) in sub.claim_type_roots() {
        let key = if path.is_native() {
            CategoryPath::namespaced(&code, path.name())
        } else {
            path.clone()
        };
        if main.category_root(&key).is_some() {
            tracing::debug!(category = %key, "namespaced category already present");
            continue;
        }
        main.register_category(key, lookup(&remap, *node)?)?;
    }

    for (name, rows) in &sub.lookup_tables {
        main.lookup_tables
            .entry(format!("{code}{SEPARATOR}{name}"))
            .or_insert_with(|| rows.clone());
    }
    main.entities.absorb(&sub.entities);

    let main_key = normalize_code(&main.document().key);
    let mut discovered = Vec::new();
    for reference in sub.references() {
        if reference.code == code || main.reference(&reference.code).is_some() {
            continue;
        }
        if reference.code == main_key {
            main.register_reference(
                &reference.code,
                reference.title.clone(),
                0,
                reference.source_context.clone(),
            );
            link_self_reference(main)?;
            continue;
        }
        discovered.push(ProcedureReference {
            status: ReferenceStatus::Pending,
            message: None,
            ..reference.clone()
        });
    }

    let deep_links = add_deep_links(main)?;

    tracing::debug!(
        code = %code,
        nodes = remap.len(),
        edges = sub.edge_count(),
        discovered = discovered.len(),
        deep_links,
        "merged sub-network"
    );

    Ok(MergeOutcome {
        remap,
        linked_root,
        discovered,
    })
}

/// Resolve a pending reference to the main document's own key in place
///
/// The root stands in as the linked root; nothing is fetched. Returns
/// `true` if a reference was resolved.
///
/// # Errors
/// Returns a [`GraphError`] if a deep-link edge cannot be added
pub fn link_self_reference(main: &mut WorldNetwork) -> Result<bool, GraphError> {
    let key = normalize_code(&main.document().key);
    let pending = main
        .reference(&key)
        .is_some_and(|r| r.status == ReferenceStatus::Pending);
    if !pending {
        return Ok(false);
    }

    main.set_reference_status(
        &key,
        ReferenceStatus::Resolved,
        Some("self reference".to_string()),
    )?;
    main.link_procedure(&key, main.root());
    add_deep_links(main)?;
    Ok(true)
}

/// Add a deep-link edge from every pointer to its code's linked root
///
/// Returns the number of edges added. Existing deep links are kept, so the
/// call is idempotent.
///
/// # Errors
/// Returns a [`GraphError`] if an edge endpoint is missing
pub fn add_deep_links(main: &mut WorldNetwork) -> Result<usize, GraphError> {
    let links: Vec<(String, NodeId)> = main
        .linked_procedures()
        .iter()
        .map(|(code, node)| (code.clone(), *node))
        .collect();

    let mut added = 0;
    for (code, linked) in links {
        for pointer in main.pointers_to(&code) {
            if !main.has_edge(pointer, linked, EdgeKind::DeepLink) {
                main.add_edge(pointer, linked, EdgeKind::DeepLink, None)?;
                added += 1;
            }
        }
    }
    Ok(added)
}

fn lookup(remap: &IndexMap<NodeId, NodeId>, id: NodeId) -> Result<NodeId, GraphError> {
    remap.get(&id).copied().ok_or(GraphError::NodeNotFound(id))
}
