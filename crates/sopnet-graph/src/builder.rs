//! Graph builder
//!
//! Turns a [`StructuralRecord`] into a [`WorldNetwork`]: one root, one
//! category root per category, a sequence chain of steps, a fan-out of
//! branches under every decision, nested sub-conditions under branches and a
//! reference pointer for every reference code. Ids come from the network's
//! own counters, so the same record always yields the same graph.

use crate::category::CategoryPath;
use crate::error::GraphError;
use crate::ids::NodeId;
use crate::network::{DocumentInfo, Version, WorldNetwork};
use crate::node::{
    EdgeKind, NodeDraft, NodeKind, META_CONTINUE, META_NOTES, META_PROCEED, META_RAW,
    META_REFERENCE_CODE, META_REFERENCE_TITLE, META_SCENARIO,
};
use sopnet_parser::{
    BranchRecord, MentionContext, ReferenceMention, StepKind, StepRecord, StructuralRecord,
    SubConditionKind, SubConditionRecord,
};
use std::collections::HashSet;

/// Builds world networks from structural records
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder;

/// Mutable state threaded through one build pass
struct BuildPass<'a> {
    net: &'a mut WorldNetwork,
    /// Branch nodes waiting for their proceed-to-section edge
    proceeds: Vec<(NodeId, String)>,
    /// Codes that already have at least one pointer
    pointed: HashSet<String>,
}

/// Where a node sits, for pointer placement and reference context
#[derive(Clone, Copy)]
struct Placement<'a> {
    section: &'a str,
    step: u32,
    owner: NodeId,
}

impl GraphBuilder {
    /// Create builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the un-resolved network for one document
    ///
    /// # Errors
    /// Returns a [`GraphError`] only if an internal invariant is broken
    /// (an edge endpoint missing); well-formed records always build.
    pub fn build(
        &self,
        record: &StructuralRecord,
        key: &str,
        name: &str,
    ) -> Result<WorldNetwork, GraphError> {
        let mut net = WorldNetwork::new(DocumentInfo::from_header(key, name, &record.header));
        net.versions = record.revisions.iter().map(Version::from_revision).collect();
        net.document_mut().current_version = net.versions.first().map(|v| v.revision.clone());
        net.entities = record.entities.clone();
        net.lookup_tables = record.lookup_tables.clone();

        // text-scan order fixes procedure_refs order; pointers fill in context
        for mention in record.references.values() {
            net.register_reference(&mention.code, mention.title.clone(), 0, None);
        }

        let mut pass = BuildPass {
            net: &mut net,
            proceeds: Vec::new(),
            pointed: HashSet::new(),
        };
        let root = pass.net.root();

        for category in &record.categories {
            let path = CategoryPath::native(&category.name);
            let category_node = pass.net.insert_node(
                NodeDraft::new(NodeKind::CategoryRoot, category.name.clone())
                    .with_section(Some(category.name.clone()))
                    .with_parent(Some(root))
                    .with_metadata("step_count", category.steps.len()),
            );
            pass.net
                .add_edge(root, category_node, EdgeKind::Contains, None)?;
            if pass.net.category_root(&path).is_some() {
                tracing::warn!(category = %path, "category key collision, keeping first");
            } else {
                pass.net.register_category(path, category_node)?;
            }

            let mut previous = category_node;
            for step in &category.steps {
                previous = pass.add_step(step, &category.name, category_node, previous)?;
            }
        }

        pass.link_proceeds()?;
        pass.add_root_pointers(record.references.values())?;

        let swept = net.entities.sweep(&record.source, &MentionContext::document());
        net.append_entities(root, swept)?;

        tracing::info!(
            key,
            nodes = net.node_count(),
            edges = net.edge_count(),
            references = net.references().count(),
            categories = net.claim_type_roots().len(),
            "built world network"
        );

        Ok(net)
    }
}

impl BuildPass<'_> {
    fn add_step(
        &mut self,
        step: &StepRecord,
        section: &str,
        category_node: NodeId,
        previous: NodeId,
    ) -> Result<NodeId, GraphError> {
        let kind = match step.kind {
            StepKind::Decision => NodeKind::Decision,
            StepKind::Plain => NodeKind::Step,
        };
        let mut draft = NodeDraft::new(kind, step.text.clone())
            .with_step(step.number)
            .with_section(Some(section))
            .with_parent(Some(category_node))
            .with_entities(step.entity_ids.clone())
            .with_metadata(META_RAW, step.raw.clone());
        if !step.notes.is_empty() {
            draft = draft.with_metadata(META_NOTES, step.notes.clone());
        }

        let node = self.net.insert_node(draft);
        self.net.add_edge(previous, node, EdgeKind::Sequence, None)?;

        let placement = Placement {
            section,
            step: step.number,
            owner: node,
        };
        self.add_pointers(placement, &step.references)?;
        for branch in &step.branches {
            self.add_branch(placement, branch)?;
        }
        Ok(node)
    }

    fn add_branch(&mut self, decision: Placement<'_>, branch: &BranchRecord) -> Result<(), GraphError> {
        let mut draft = NodeDraft::new(NodeKind::for_branch(branch.kind), branch.action.clone())
            .with_step(decision.step)
            .with_section(Some(decision.section))
            .with_parent(Some(decision.owner))
            .with_entities(branch.entity_ids.clone())
            .with_metadata(META_RAW, branch.raw.clone());
        draft = with_flow_metadata(draft, branch.continues_to_next_step, branch.proceed_to_section.as_deref());

        let node = self.net.insert_node(draft);
        self.net.add_edge(
            decision.owner,
            node,
            EdgeKind::for_branch(branch.kind),
            Some(branch.kind.label().to_string()),
        )?;
        if let Some(section) = &branch.proceed_to_section {
            self.proceeds.push((node, section.clone()));
        }

        let placement = Placement { owner: node, ..decision };
        self.add_pointers(placement, &branch.references)?;
        for sub in &branch.sub_conditions {
            self.add_sub_condition(placement, sub)?;
        }
        Ok(())
    }

    fn add_sub_condition(
        &mut self,
        branch: Placement<'_>,
        sub: &SubConditionRecord,
    ) -> Result<(), GraphError> {
        let (node_kind, edge_kind) = match &sub.kind {
            SubConditionKind::NestedYes => (NodeKind::BranchYes, EdgeKind::NestedYes),
            SubConditionKind::NestedNo => (NodeKind::BranchNo, EdgeKind::NestedNo),
            SubConditionKind::NestedUnsure => (NodeKind::SubCondition, EdgeKind::Nested),
            SubConditionKind::Labeled(_) => (NodeKind::Action, EdgeKind::Nested),
        };
        let mut draft = NodeDraft::new(node_kind, sub.text.clone())
            .with_step(branch.step)
            .with_section(Some(branch.section))
            .with_parent(Some(branch.owner))
            .with_entities(sub.entity_ids.clone());
        if let SubConditionKind::Labeled(label) = &sub.kind {
            draft = draft.with_metadata(META_SCENARIO, label.clone());
        }
        draft = with_flow_metadata(draft, sub.continues_to_next_step, sub.proceed_to_section.as_deref());

        let node = self.net.insert_node(draft);
        self.net
            .add_edge(branch.owner, node, edge_kind, Some(sub.kind.label()))?;
        if let Some(section) = &sub.proceed_to_section {
            self.proceeds.push((node, section.clone()));
        }

        self.add_pointers(Placement { owner: node, ..branch }, &sub.references)
    }

    fn add_pointers(
        &mut self,
        placement: Placement<'_>,
        references: &[ReferenceMention],
    ) -> Result<(), GraphError> {
        for mention in references {
            let context = format!("{} step {}", placement.section, placement.step);
            self.add_pointer(
                placement.owner,
                mention,
                Some(placement.section),
                Some(placement.step),
                context,
            )?;
        }
        Ok(())
    }

    fn add_pointer(
        &mut self,
        owner: NodeId,
        mention: &ReferenceMention,
        section: Option<&str>,
        step: Option<u32>,
        context: String,
    ) -> Result<(), GraphError> {
        let mut draft = NodeDraft::new(NodeKind::ReferencePointer, mention.code.clone())
            .with_section(section)
            .with_parent(Some(owner))
            .with_metadata(META_REFERENCE_CODE, mention.code.clone());
        if let Some(step) = step {
            draft = draft.with_step(step);
        }
        if let Some(title) = &mention.title {
            draft = draft.with_metadata(META_REFERENCE_TITLE, title.clone());
        }

        let pointer = self.net.insert_node(draft);
        self.net.add_edge(owner, pointer, EdgeKind::Reference, None)?;
        self.net
            .register_reference(&mention.code, mention.title.clone(), 0, Some(context));
        self.pointed.insert(mention.code.clone());
        Ok(())
    }

    /// Codes mentioned only outside steps hang off the root
    fn add_root_pointers<'r>(
        &mut self,
        references: impl Iterator<Item = &'r ReferenceMention>,
    ) -> Result<(), GraphError> {
        let root = self.net.root();
        for mention in references {
            if !self.pointed.contains(&mention.code) {
                self.add_pointer(root, mention, None, None, "document".to_string())?;
            }
        }
        Ok(())
    }

    /// Second pass: branch -> category edges for "proceed to the X section"
    fn link_proceeds(&mut self) -> Result<(), GraphError> {
        for (node, section) in std::mem::take(&mut self.proceeds) {
            let wanted = section.to_lowercase();
            let target = self
                .net
                .claim_type_roots()
                .iter()
                .filter(|(path, _)| path.is_native())
                .find(|(path, _)| {
                    let name = path.name().to_lowercase();
                    name.contains(&wanted) || wanted.contains(&name)
                })
                .map(|(_, id)| *id);

            match target {
                Some(target) => {
                    self.net
                        .add_edge(node, target, EdgeKind::ProceedToSection, Some(section))?;
                }
                None => tracing::debug!(section = %section, "proceed target not found"),
            }
        }
        Ok(())
    }
}

fn with_flow_metadata(draft: NodeDraft, continues: bool, proceed: Option<&str>) -> NodeDraft {
    let draft = if continues {
        draft.with_metadata(META_CONTINUE, true)
    } else {
        draft
    };
    match proceed {
        Some(section) => draft.with_metadata(META_PROCEED, section.to_string()),
        None => draft,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceStatus;
    use pretty_assertions::assert_eq;
    use sopnet_parser::{EntityId, EntityKind, SopParser};

    const AMAZON: &str = "### **Amazon Claims**\n\n\
1. Is the provider Vita Health?\n - Yes: Assign ID ABC123DEF and process.\n - No: Continue to the next step.\n\
2. Refer to PR.OP.CL.2862.\n";

    fn build(text: &str) -> WorldNetwork {
        let record = SopParser::new().parse(text);
        GraphBuilder::new().build(&record, "MAIN", "Main SOP").unwrap()
    }

    fn children(net: &WorldNetwork, id: NodeId, kind: EdgeKind) -> Vec<NodeId> {
        net.outgoing(id)
            .filter(|e| e.kind == kind)
            .map(|e| e.target)
            .collect()
    }

    #[test]
    fn example_document_shape() {
        let net = build(AMAZON);

        let category = net.category_root(&CategoryPath::native("Amazon Claims")).unwrap();
        assert_eq!(net.node(category).unwrap().content, "Amazon Claims");

        let steps = children(&net, category, EdgeKind::Sequence);
        assert_eq!(steps.len(), 1);
        let decision = net.node(steps[0]).unwrap();
        assert_eq!(decision.kind, NodeKind::Decision);

        let labels: Vec<_> = net
            .outgoing(decision.id)
            .filter(|e| e.kind.is_conditional())
            .filter_map(|e| e.condition.clone())
            .collect();
        assert_eq!(labels, vec!["YES".to_string(), "NO".to_string()]);

        let yes = children(&net, decision.id, EdgeKind::ConditionYes)[0];
        assert!(net
            .node(yes)
            .unwrap()
            .entities
            .contains(&EntityId::new(EntityKind::ProviderId, "ABC123DEF")));
        let no = children(&net, decision.id, EdgeKind::ConditionNo)[0];
        assert!(net.node(no).unwrap().continues_to_next_step());

        let plain = children(&net, decision.id, EdgeKind::Sequence)[0];
        assert_eq!(net.node(plain).unwrap().kind, NodeKind::Step);
        let pointers = children(&net, plain, EdgeKind::Reference);
        assert_eq!(pointers.len(), 1);
        assert_eq!(
            net.node(pointers[0]).unwrap().reference_code(),
            Some("PR.OP.CL.2862")
        );
        assert_eq!(
            net.reference("PR.OP.CL.2862").unwrap().status,
            ReferenceStatus::Pending
        );
    }

    #[test]
    fn build_is_deterministic() {
        let first = serde_json::to_value(build(AMAZON)).unwrap();
        let second = serde_json::to_value(build(AMAZON)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn decision_without_branches_is_kept() {
        let net = build("### Amazon Claims\n1. Is the TIN valid?\n");
        let decision = net
            .nodes()
            .find(|n| n.kind == NodeKind::Decision)
            .unwrap();
        assert_eq!(net.outgoing(decision.id).count(), 0);
    }

    #[test]
    fn proceed_to_section_links_category() {
        let text = "### Amazon Claims\n1. Is it Vita?\n - Yes: Proceed to the Vita Health section.\n### Vita Health Claims\n1. Process.\n";
        let net = build(text);

        let edge = net
            .edges()
            .find(|e| e.kind == EdgeKind::ProceedToSection)
            .unwrap();
        assert_eq!(
            Some(edge.target),
            net.category_root(&CategoryPath::native("Vita Health Claims"))
        );
    }

    #[test]
    fn nested_and_labeled_children() {
        let text = "### Amazon Claims\n1. Is it valid?\n - **Yes:** Check.\n     - **No:** Hold.\n     - **Member-submitted:** Return PR.OP.CL.1100.\n";
        let net = build(text);

        let yes = net.nodes().find(|n| n.kind == NodeKind::BranchYes).unwrap();
        let nested_no = children(&net, yes.id, EdgeKind::NestedNo);
        assert_eq!(nested_no.len(), 1);
        assert_eq!(net.node(nested_no[0]).unwrap().kind, NodeKind::BranchNo);

        let scenario = children(&net, yes.id, EdgeKind::Nested)[0];
        let action = net.node(scenario).unwrap();
        assert_eq!(action.kind, NodeKind::Action);
        assert_eq!(action.scenario(), Some("Member-submitted"));
        assert_eq!(children(&net, scenario, EdgeKind::Reference).len(), 1);
    }

    #[test]
    fn branch_keeps_reference_and_nested_children() {
        let text = "### Amazon Claims\n1. Is it valid?\n - **Yes:** Refer to PR.OP.CL.2000 first.\n     - **No:** Refer to PR.OP.CL.3000.\n";
        let net = build(text);

        let yes = net.nodes().find(|n| n.kind == NodeKind::BranchYes).unwrap();
        let pointers = children(&net, yes.id, EdgeKind::Reference);
        assert_eq!(pointers.len(), 1);
        assert_eq!(net.node(pointers[0]).unwrap().reference_code(), Some("PR.OP.CL.2000"));

        let nested = children(&net, yes.id, EdgeKind::NestedNo);
        assert_eq!(nested.len(), 1);
        let nested_pointers = children(&net, nested[0], EdgeKind::Reference);
        assert_eq!(nested_pointers.len(), 1);
        assert_eq!(
            net.node(nested_pointers[0]).unwrap().reference_code(),
            Some("PR.OP.CL.3000")
        );
        assert!(children(&net, net.root(), EdgeKind::Reference).is_empty());
    }

    #[test]
    fn deeply_indented_first_branch_keeps_its_content() {
        let text = "### Amazon Claims\n1. Is it valid?\n     - **Yes:** Nested first, stray PR.OP.CL.4000 text.\n - **No:** Top.\n";
        let net = build(text);

        let decision = net.nodes().find(|n| n.kind == NodeKind::Decision).unwrap();
        let yes = children(&net, decision.id, EdgeKind::ConditionYes);
        assert_eq!(yes.len(), 1);
        assert!(net.node(yes[0]).unwrap().content.contains("Nested first"));
        assert_eq!(children(&net, yes[0], EdgeKind::Reference).len(), 1);
        assert_eq!(children(&net, decision.id, EdgeKind::ConditionNo).len(), 1);
        assert!(children(&net, net.root(), EdgeKind::Reference).is_empty());
    }

    #[test]
    fn references_outside_steps_hang_off_root() {
        let text = "# SOP\nSee PR.OP.CL.5000 - Overview.\n### Amazon Claims\n1. Refer to PR.OP.CL.2862.\n";
        let net = build(text);

        let root_pointers = children(&net, net.root(), EdgeKind::Reference);
        assert_eq!(root_pointers.len(), 1);
        assert_eq!(
            net.node(root_pointers[0]).unwrap().reference_code(),
            Some("PR.OP.CL.5000")
        );
        let codes: Vec<_> = net.references().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["PR.OP.CL.5000", "PR.OP.CL.2862"]);
    }

    #[test]
    fn versions_and_current_version() {
        let text = "| 1.2 | 01/01/2024 | Newer |\n| 1.1 | 01/01/2023 | Older |\n";
        let net = build(text);
        assert_eq!(net.versions.len(), 2);
        assert_eq!(net.document().current_version.as_deref(), Some("1.2"));
        assert_eq!(net.versions[0].content_hash.len(), 16);
    }

    #[test]
    fn document_sweep_attaches_to_root() {
        let text = "# SOP\nProvider XYZ987QRS is mentioned only here.\n";
        let net = build(text);
        let root = net.node(net.root()).unwrap();
        assert_eq!(
            root.entities,
            vec![EntityId::new(EntityKind::ProviderId, "XYZ987QRS")]
        );
    }
}
