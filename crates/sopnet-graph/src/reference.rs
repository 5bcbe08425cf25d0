//! Cross-document references and their resolution state machine

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Resolution status of a reference code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStatus {
    /// Not attempted yet, or held back by the depth limit or deadline
    Pending,
    /// Fetch in progress; re-encounters are skipped
    Resolving,
    /// Merged into the network
    Resolved,
    /// Locator had no document for the code
    NotFound,
    /// Fetch, parse, build or merge failed
    Error,
}

impl ReferenceStatus {
    /// All statuses
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Resolving,
        Self::Resolved,
        Self::NotFound,
        Self::Error,
    ];

    /// Statuses reachable in one step
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [Self] {
        match self {
            // a self-reference to the main document resolves without a fetch
            Self::Pending => &[Self::Resolving, Self::Resolved],
            // back to pending only when the call that started the fetch was dropped
            Self::Resolving => &[Self::Pending, Self::Resolved, Self::NotFound, Self::Error],
            Self::Resolved | Self::NotFound | Self::Error => &[],
        }
    }

    /// Check a single transition
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// No transition leaves this status
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Stable snake_case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Resolved => "resolved",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

impl Display for ReferenceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder for a link to another document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureReference {
    /// Natural key of the referenced document
    pub code: String,
    /// First-seen title
    #[serde(default)]
    pub title: Option<String>,
    /// Resolution status
    pub status: ReferenceStatus,
    /// Hops from the main document at which the code was discovered
    #[serde(default)]
    pub depth: u32,
    /// Where the code was first mentioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<String>,
    /// Failure message for `error`, note for `not_found`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProcedureReference {
    /// New pending reference
    #[must_use]
    pub fn pending(code: impl Into<String>, title: Option<String>, depth: u32) -> Self {
        Self {
            code: code.into(),
            title,
            status: ReferenceStatus::Pending,
            depth,
            source_context: None,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_exits() {
        for status in [
            ReferenceStatus::Resolved,
            ReferenceStatus::NotFound,
            ReferenceStatus::Error,
        ] {
            assert!(status.is_terminal());
            for next in ReferenceStatus::ALL {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn pending_reentered_only_from_resolving() {
        for status in ReferenceStatus::ALL {
            assert_eq!(
                status.can_transition_to(ReferenceStatus::Pending),
                status == ReferenceStatus::Resolving
            );
        }
    }

    #[test]
    fn resolving_reaches_every_outcome() {
        let resolving = ReferenceStatus::Resolving;
        assert!(resolving.can_transition_to(ReferenceStatus::Resolved));
        assert!(resolving.can_transition_to(ReferenceStatus::NotFound));
        assert!(resolving.can_transition_to(ReferenceStatus::Error));
        assert!(!ReferenceStatus::Pending.can_transition_to(ReferenceStatus::NotFound));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReferenceStatus::NotFound).unwrap(),
            "\"not_found\""
        );
    }
}
