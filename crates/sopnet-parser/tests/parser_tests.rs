//! Parser-level properties: best-effort parsing, determinism, reference scan

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sopnet_parser::recognizers::recognize_references;
use sopnet_parser::{BranchKind, EntityKind, SopParser, StepKind};

const P966: &str = "\
# **Returning Claims with Provider Data Issues**

**Document Type:** PR.OP.CL
**Document Number:** 2862
**Status:** Active

| Revision | Date | Description |
|---|---|---|
| 1.2 | 02/14/2024 | Added Crossover clinics |
| 1.1 | 06/01/2023 | Clarified TIN lookup |

**Cause/Explanation:**

Claims pend when the billing provider cannot be matched.

**Pend Code:** P966

## Action Required

### **Amazon Claims**

1. Is the provider Vita Health?
 - **Yes:** Assign ID ABC123DEF and process.
 - **No:** Continue to the next step.
2. Does the claim show Ultra Blue message AMZ - AMAZON CLAIM on the claim?
 - **Yes:** Refer to PR.OP.CL.2862 - Returning Claims.
 - **Unsure:** Refer to PR.OP.CL.1100.
3. Close the pend.

### **Crossover Claims**

1. Is the clinic listed below?
 - **Yes:** Use the provider ID from the list.
     - Crossover Seattle: B09B4VB09B4V
 - **No:** Proceed to the Amazon Claims section.
";

#[test]
fn full_document_shape() {
    let record = SopParser::new().parse(P966);

    assert_eq!(
        record.header.title.as_deref(),
        Some("Returning Claims with Provider Data Issues")
    );
    assert_eq!(record.header.document_number.as_deref(), Some("2862"));
    assert_eq!(record.header.pend_code.as_deref(), Some("P966"));
    assert_eq!(record.revisions.len(), 2);
    assert_eq!(record.revisions[0].revision, "1.2");

    let names: Vec<_> = record.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Amazon Claims", "Crossover Claims"]);

    let amazon = record.category("Amazon Claims").unwrap();
    let kinds: Vec<_> = amazon.steps.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![StepKind::Decision, StepKind::Decision, StepKind::Plain]);

    let second = &amazon.steps[1];
    assert_eq!(second.branches[1].kind, BranchKind::Unsure);
    assert_eq!(second.branches[0].references[0].code, "PR.OP.CL.2862");
    assert_eq!(
        second.branches[0].references[0].title.as_deref(),
        Some("Returning Claims")
    );
    assert_eq!(record.entities.by_kind(EntityKind::UltraBlueMessage).count(), 1);

    let crossover = record.category("Crossover Claims").unwrap();
    assert_eq!(
        crossover.steps[0].branches[1].proceed_to_section.as_deref(),
        Some("Amazon Claims")
    );
    assert_eq!(record.lookup_tables["crossover_clinics"].len(), 1);
}

#[test]
fn references_match_direct_scan() {
    let record = SopParser::new().parse(P966);
    let scanned: Vec<_> = recognize_references(P966)
        .into_iter()
        .map(|r| r.code)
        .collect();
    let recorded: Vec<_> = record.references.keys().cloned().collect();
    assert_eq!(recorded, scanned);
}

#[test]
fn record_serializes_to_json() {
    let record = SopParser::new().parse(P966);
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["categories"][0]["steps"][0]["kind"], "decision");
    assert_eq!(json["categories"][0]["steps"][0]["branches"][0]["kind"], "yes");
}

proptest! {
    #[test]
    fn prop_parse_never_panics(text in "[ -~\n–•]{0,400}") {
        let _ = SopParser::new().parse(&text);
    }

    #[test]
    fn prop_parse_is_deterministic(
        lines in prop::collection::vec(
            prop_oneof![
                Just("### **Amazon Claims**".to_string()),
                Just("### Concentra Claims".to_string()),
                "[0-9]\\. (Is|Does|Check) [a-zA-Z ]{0,20}\\??",
                " - (Yes|No|Unsure): [a-zA-Z ]{0,20}",
                "     - \\*\\*(Yes|No):\\*\\* [a-zA-Z ]{0,20}",
                "Refer to PR\\.OP\\.CL\\.[0-9]{3,4}",
                "ID [A-Z]{3}[0-9]{3}[A-Z]{3}",
            ],
            0..30,
        )
    ) {
        let text = lines.join("\n");
        let first = SopParser::new().parse(&text);
        let second = SopParser::new().parse(&text);
        prop_assert_eq!(first, second);
    }
}
