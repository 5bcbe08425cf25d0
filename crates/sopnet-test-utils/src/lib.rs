//! Testing utilities for the SOP network workspace
//!
//! Fixture documents, a fixture library keyed by reference code, and
//! tracing setup for tests.

#![allow(missing_docs)]

use sopnet_parser::{SopParser, StructuralRecord};
use tracing_subscriber::EnvFilter;

pub const AMAZON_CODE: &str = "PR.OP.CL.2862";
pub const CYCLE_A_CODE: &str = "PR.OP.CL.1001";
pub const CYCLE_B_CODE: &str = "PR.OP.CL.1002";
pub const MISSING_CODE: &str = "PR.OP.CL.9999";

/// The worked example: one decision, one plain step with a reference
pub const AMAZON: &str = "\
# **Returning Claims with Provider Data Issues**

**Document Type:** PR.OP.CL
**Document Number:** 2862
**Status:** Active

| Revision | Date | Description |
|---|---|---|
| 1.2 | 02/14/2024 | Added Crossover clinics |
| 1.1 | 06/01/2023 | Clarified TIN lookup |

**Pend Code:** P966

## Action Required

### **Amazon Claims**

1. Is the provider Vita Health?
 - **Yes:** Assign ID ABC123DEF and process.
 - **No:** Continue to the next step.
2. Refer to PR.OP.CL.1001 - Provider Address Updates.
3. Close the pend.

### **Concentra Claims**

1. Does the TIN 123456789 match the directory?
 - **Yes:** Process the claim.
     - **No:** Refer to PR.OP.CL.9999 - Retired Procedure.
 - **Unsure:** Proceed to the Amazon Claims section.
";

/// References [`CYCLE_B`]
pub const CYCLE_A: &str = "\
# Provider Address Updates

## Action Required

### Address Claims

1. Is the address on file?
 - Yes: Process.
 - No: Refer to PR.OP.CL.1002 - Address Research.
";

/// References [`CYCLE_A`] back
pub const CYCLE_B: &str = "\
# Address Research

## Action Required

### Research Claims

1. Search the directory for the TIN.
2. Is the record current?
 - Yes: Return to PR.OP.CL.1001.
 - No: Close the pend.
";

/// Chain of `len` documents, each referencing the next
///
/// Codes are `PR.OP.CL.500<n>` for `n` in `0..len`.
#[must_use]
pub fn chain(len: usize) -> Vec<(String, String)> {
    (0..len)
        .map(|n| {
            let next = format!("PR.OP.CL.500{}", n + 1);
            let text = format!(
                "# Chain {n}\n\n### Chain Claims\n\n1. Is link {n} valid?\n - Yes: Refer to {next}.\n"
            );
            (format!("PR.OP.CL.500{n}"), text)
        })
        .collect()
}

/// Every fixture document the locators may serve, keyed by reference code
///
/// [`MISSING_CODE`] is deliberately absent.
#[must_use]
pub fn fixture_library() -> Vec<(&'static str, &'static str)> {
    vec![
        (AMAZON_CODE, AMAZON),
        (CYCLE_A_CODE, CYCLE_A),
        (CYCLE_B_CODE, CYCLE_B),
    ]
}

pub fn parse_fixture(text: &str) -> StructuralRecord {
    SopParser::new().parse(text)
}

/// Install a fmt subscriber honouring `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
