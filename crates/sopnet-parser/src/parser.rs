//! Structural parser
//!
//! Splits a document into header, revisions, categories, steps and branches
//! using the recognizers in [`crate::recognizers`]. Parsing never fails;
//! anything the recognizers miss is left empty.

use crate::entity::{EntityId, EntityKind, EntityRegistry, MentionContext};
use crate::markup::{plain_text, truncate_chars};
use crate::recognizers::{
    category_key, recognize_action_required, recognize_branch_markers,
    recognize_category_headings, recognize_cause_explanation, recognize_continue_to_next_step,
    recognize_document_number, recognize_document_type, recognize_important_notes,
    recognize_interrogative, recognize_labeled_items, recognize_pend_code,
    recognize_proceed_to_section, recognize_references, recognize_revisions, recognize_status,
    recognize_step_starts, recognize_title, BranchMarker,
};
use crate::record::{
    BranchKind, BranchRecord, CategoryRecord, DocumentHeader, StepKind, StepRecord,
    StructuralRecord, SubConditionKind, SubConditionRecord,
};
use crate::tables::extract_lookup_tables;
use indexmap::IndexMap;

const DEFAULT_EXCERPT_LEN: usize = 1000;

/// Structural parser for procedural documents
#[derive(Debug, Clone, Copy)]
pub struct SopParser {
    excerpt_len: usize,
}

impl Default for SopParser {
    fn default() -> Self {
        Self {
            excerpt_len: DEFAULT_EXCERPT_LEN,
        }
    }
}

/// Shared state for one parse pass
struct ParseContext<'a> {
    section: &'a str,
    entities: &'a mut EntityRegistry,
}

impl SopParser {
    /// Create parser with default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum characters kept in raw excerpts
    #[inline]
    #[must_use]
    pub fn with_excerpt_len(mut self, excerpt_len: usize) -> Self {
        self.excerpt_len = excerpt_len;
        self
    }

    /// Parse raw document text into a structural record
    #[must_use]
    pub fn parse(&self, text: &str) -> StructuralRecord {
        let source = text.replace("\r\n", "\n");
        let mut entities = EntityRegistry::new();

        let header = Self::parse_header(&source);
        if let Some(pend_code) = &header.pend_code {
            entities.register(
                EntityKind::PendCode,
                pend_code,
                [("document_pend_code".to_string(), "true".to_string())],
            );
        }

        let revisions = recognize_revisions(&source);
        let categories = self.parse_categories(&source, &mut entities);
        let lookup_tables = extract_lookup_tables(&source, &mut entities);
        let references = recognize_references(&source)
            .into_iter()
            .map(|mention| (mention.code.clone(), mention))
            .collect::<IndexMap<_, _>>();

        let record = StructuralRecord {
            source,
            header,
            revisions,
            categories,
            lookup_tables,
            references,
            entities,
        };

        tracing::debug!(
            categories = record.categories.len(),
            steps = record.step_count(),
            references = record.references.len(),
            tables = record.lookup_tables.len(),
            entities = record.entities.len(),
            "parsed document"
        );

        record
    }

    fn parse_header(text: &str) -> DocumentHeader {
        DocumentHeader {
            title: recognize_title(text),
            document_type: recognize_document_type(text),
            document_number: recognize_document_number(text),
            status: recognize_status(text),
            cause_explanation: recognize_cause_explanation(text),
            pend_code: recognize_pend_code(text),
        }
    }

    fn parse_categories(&self, text: &str, entities: &mut EntityRegistry) -> Vec<CategoryRecord> {
        let scope = &text[recognize_action_required(text).unwrap_or(0)..];
        let headings = recognize_category_headings(scope);

        // case-folded key -> (display name, merged body)
        let mut bodies: IndexMap<String, (String, String)> = IndexMap::new();
        for (idx, heading) in headings.iter().enumerate() {
            let end = headings.get(idx + 1).map_or(scope.len(), |next| next.start);
            let body = &scope[heading.end..end];
            if heading.name.to_lowercase().contains("overview") || body.trim().is_empty() {
                continue;
            }
            match bodies.get_mut(&category_key(&heading.name)) {
                Some((_, merged)) => {
                    merged.push('\n');
                    merged.push_str(body);
                }
                None => {
                    bodies.insert(
                        category_key(&heading.name),
                        (heading.name.clone(), body.to_string()),
                    );
                }
            }
        }

        bodies
            .into_values()
            .map(|(name, body)| {
                let mut ctx = ParseContext {
                    section: &name,
                    entities: &mut *entities,
                };
                let steps = self.parse_steps(&body, &mut ctx);
                CategoryRecord {
                    raw_len: body.len(),
                    steps,
                    name,
                }
            })
            .collect()
    }

    fn parse_steps(&self, body: &str, ctx: &mut ParseContext<'_>) -> Vec<StepRecord> {
        let starts = recognize_step_starts(body);
        starts
            .iter()
            .enumerate()
            .map(|(idx, start)| {
                let end = starts.get(idx + 1).map_or(body.len(), |next| next.start);
                self.parse_step(start.number, &body[start.body_start..end], ctx)
            })
            .collect()
    }

    fn parse_step(&self, number: u32, content: &str, ctx: &mut ParseContext<'_>) -> StepRecord {
        let mention = MentionContext::step(ctx.section, number);
        let is_decision = recognize_interrogative(content) || content.contains('?');
        let markers = if is_decision {
            recognize_branch_markers(content)
        } else {
            Vec::new()
        };
        let lead = &content[..markers.first().map_or(content.len(), |m| m.start)];
        let entity_ids = ctx.entities.observe_text(lead, &mention);

        let top = top_level_markers(&markers);
        let branches = top
            .iter()
            .enumerate()
            .map(|(idx, marker)| {
                let end = top.get(idx + 1).map_or(content.len(), |next| next.start);
                self.parse_branch(
                    marker.kind,
                    &content[marker.body_start..end],
                    &mention,
                    ctx.entities,
                )
            })
            .collect();

        StepRecord {
            number,
            kind: if is_decision {
                StepKind::Decision
            } else {
                StepKind::Plain
            },
            text: plain_text(lead),
            notes: recognize_important_notes(content),
            branches,
            entity_ids,
            references: recognize_references(lead),
            raw: truncate_chars(content.trim(), self.excerpt_len),
        }
    }

    fn parse_branch(
        &self,
        kind: BranchKind,
        body: &str,
        mention: &MentionContext,
        entities: &mut EntityRegistry,
    ) -> BranchRecord {
        // every marker inside a top-level branch body is nested
        let mut items: Vec<(usize, usize, SubConditionKind)> = recognize_branch_markers(body)
            .into_iter()
            .map(|m| (m.start, m.body_start, SubConditionKind::nested(m.kind)))
            .chain(
                recognize_labeled_items(body)
                    .into_iter()
                    .map(|item| (item.start, item.body_start, SubConditionKind::Labeled(item.label))),
            )
            .collect();
        items.sort_by_key(|(start, _, _)| *start);

        let action_src = &body[..items.first().map_or(body.len(), |(start, _, _)| *start)];
        let entity_ids: Vec<EntityId> = entities.observe_text(action_src, mention);

        let sub_conditions = items
            .iter()
            .enumerate()
            .map(|(idx, (_, body_start, sub_kind))| {
                let end = items.get(idx + 1).map_or(body.len(), |(next, _, _)| *next);
                let text = &body[*body_start..end];
                SubConditionRecord {
                    kind: sub_kind.clone(),
                    text: plain_text(text),
                    continues_to_next_step: recognize_continue_to_next_step(text),
                    proceed_to_section: recognize_proceed_to_section(text),
                    entity_ids: entities.observe_text(text, mention),
                    references: recognize_references(text),
                }
            })
            .collect();

        BranchRecord {
            kind,
            action: plain_text(action_src),
            continues_to_next_step: recognize_continue_to_next_step(action_src),
            proceed_to_section: recognize_proceed_to_section(action_src),
            sub_conditions,
            entity_ids,
            references: recognize_references(action_src),
            raw: truncate_chars(body.trim(), self.excerpt_len),
        }
    }
}

/// Markers that open top-level branches.
///
/// A marker is nested when a top-level branch is already open and the
/// marker is indented deeper than the shallowest marker, or uses the `I`
/// glyph while the open branch uses a different one. A leading marker always
/// opens a branch, however deep its indentation.
fn top_level_markers(markers: &[BranchMarker]) -> Vec<BranchMarker> {
    let Some(base) = markers.iter().map(|m| m.indent).min() else {
        return Vec::new();
    };

    let mut top: Vec<BranchMarker> = Vec::new();
    for marker in markers {
        let Some(open) = top.last() else {
            top.push(*marker);
            continue;
        };
        let nested = marker.indent > base || (marker.glyph == Some('I') && open.glyph != Some('I'));
        if !nested {
            top.push(*marker);
        }
    }
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use pretty_assertions::assert_eq;

    const AMAZON: &str = "### **Amazon Claims**\n\n\
1. Is the provider Vita Health?\n - Yes: Assign ID ABC123DEF and process.\n - No: Continue to the next step.\n\
2. Refer to PR.OP.CL.2862.\n";

    const NESTED: &str = "\
### **Amazon Claims**

1. Does the claim have a TIN?
 - **Yes:** Check the provider.
     - **Yes:** Process the claim.
     - **No:** Pend to P966.
 - **No:** Proceed to the **Vita Health Claims** section.
 - **Unsure:** Follow the scenario below:
     - **Provider-submitted:** Refer to PR.OP.CL.1100 - Provider Claims.

### **Vita Health Claims**

1. Review the claim. **Important Note: never return Vita Health claims.**
";

    #[test]
    fn example_category_and_steps() {
        let record = SopParser::new().parse(AMAZON);

        assert_eq!(record.categories.len(), 1);
        let category = &record.categories[0];
        assert_eq!(category.name, "Amazon Claims");
        assert_eq!(category.steps.len(), 2);

        let decision = &category.steps[0];
        assert_eq!(decision.kind, StepKind::Decision);
        assert_eq!(decision.text, "Is the provider Vita Health?");
        let kinds: Vec<_> = decision.branches.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BranchKind::Yes, BranchKind::No]);

        let yes = &decision.branches[0];
        assert!(yes
            .entity_ids
            .contains(&EntityId::new(EntityKind::ProviderId, "ABC123DEF")));
        assert!(!yes.continues_to_next_step);
        assert!(decision.branches[1].continues_to_next_step);

        let plain = &category.steps[1];
        assert_eq!(plain.kind, StepKind::Plain);
        assert_eq!(plain.references.len(), 1);
        assert_eq!(plain.references[0].code, "PR.OP.CL.2862");
        assert!(record.references.contains_key("PR.OP.CL.2862"));
    }

    #[test]
    fn nested_and_labeled_sub_conditions() {
        let record = SopParser::new().parse(NESTED);
        let step = &record.categories[0].steps[0];
        assert_eq!(step.branches.len(), 3);

        let yes = &step.branches[0];
        assert_eq!(yes.action, "Check the provider.");
        let nested: Vec<_> = yes.sub_conditions.iter().map(|s| s.kind.clone()).collect();
        assert_eq!(
            nested,
            vec![SubConditionKind::NestedYes, SubConditionKind::NestedNo]
        );
        assert!(yes.sub_conditions[1]
            .entity_ids
            .contains(&EntityId::new(EntityKind::PendCode, "P966")));

        let no = &step.branches[1];
        assert_eq!(no.proceed_to_section.as_deref(), Some("Vita Health Claims"));

        let unsure = &step.branches[2];
        assert_eq!(
            unsure.sub_conditions[0].kind,
            SubConditionKind::Labeled("Provider-submitted".to_string())
        );
        assert_eq!(unsure.sub_conditions[0].references[0].code, "PR.OP.CL.1100");
    }

    #[test]
    fn important_notes_attach_to_step() {
        let record = SopParser::new().parse(NESTED);
        let step = &record.categories[1].steps[0];
        assert_eq!(step.kind, StepKind::Plain);
        assert_eq!(step.notes, vec!["never return Vita Health claims.".to_string()]);
    }

    #[test]
    fn i_glyph_nests_under_open_branch() {
        let text = "### Amazon Claims\n1. Is it valid?\n- **Yes:** Go on.\nI **No:** Hold.\n- **No:** Stop.\n";
        let record = SopParser::new().parse(text);
        let step = &record.categories[0].steps[0];

        assert_eq!(step.branches.len(), 2);
        assert_eq!(step.branches[0].sub_conditions.len(), 1);
        assert_eq!(step.branches[0].sub_conditions[0].kind, SubConditionKind::NestedNo);
        assert_eq!(step.branches[1].kind, BranchKind::No);
    }

    #[test]
    fn deeply_indented_first_marker_opens_a_branch() {
        let text = "### Amazon Claims\n1. Is it valid?\n     - **Yes:** Nested first, stray PR.OP.CL.4000 text.\n - **No:** Top.\n";
        let record = SopParser::new().parse(text);
        let step = &record.categories[0].steps[0];

        let kinds: Vec<_> = step.branches.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BranchKind::Yes, BranchKind::No]);
        assert_eq!(step.branches[0].action, "Nested first, stray PR.OP.CL.4000 text.");
        assert_eq!(step.branches[0].references[0].code, "PR.OP.CL.4000");
        assert!(step.branches[0].sub_conditions.is_empty());
        assert_eq!(step.branches[1].action, "Top.");
    }

    #[test]
    fn question_mark_makes_a_decision_without_branches() {
        let text = "### Amazon Claims\n1. Check whether the TIN matches?\n";
        let record = SopParser::new().parse(text);
        let step = &record.categories[0].steps[0];
        assert_eq!(step.kind, StepKind::Decision);
        assert!(step.branches.is_empty());
    }

    #[test]
    fn duplicate_categories_merge_into_first() {
        let text = "### Amazon Claims\n1. First.\n### Concentra Claims\n1. Other.\n### amazon  claims\n2. Second.\n";
        let record = SopParser::new().parse(text);

        let names: Vec<_> = record.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Amazon Claims", "Concentra Claims"]);
        assert_eq!(record.categories[0].steps.len(), 2);
    }

    #[test]
    fn action_required_anchor_and_overview_skip() {
        let text = "### Background Claims\n1. Ignored.\n## Action Required\n### Overview\nText.\n### Amazon Claims\n1. Kept.\n### Empty Claims\n\n";
        let record = SopParser::new().parse(text);

        let names: Vec<_> = record.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Amazon Claims"]);
    }

    #[test]
    fn header_pend_code_becomes_entity() {
        let text = "# SOP\n**Pend Code:** P966\n";
        let record = SopParser::new().parse(text);
        let entity = record
            .entities
            .get(&EntityId::new(EntityKind::PendCode, "P966"))
            .unwrap();
        assert_eq!(entity.attributes["document_pend_code"], "true");
    }

    #[test]
    fn empty_input_yields_empty_record() {
        let record = SopParser::new().parse("");
        assert_eq!(record.header, DocumentHeader::default());
        assert!(record.categories.is_empty());
        assert!(record.references.is_empty());
        assert!(record.entities.is_empty());
    }

    #[test]
    fn crlf_input_parses_like_lf() {
        let record_lf = SopParser::new().parse(AMAZON);
        let record_crlf = SopParser::new().parse(&AMAZON.replace('\n', "\r\n"));
        assert_eq!(record_lf, record_crlf);
    }
}
