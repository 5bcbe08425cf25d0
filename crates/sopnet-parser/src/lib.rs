//! SOP Parser
//!
//! Best-effort structural parsing of procedural documents written in loose,
//! markdown-like text.
//!
//! # Core Concepts
//!
//! - [`SopParser`]: Turns raw text into a [`StructuralRecord`]; never fails
//! - [`StructuralRecord`]: Header, revisions, categories, steps, branches
//! - [`EntityRegistry`]: Deduplicated domain identifiers with mention contexts
//! - [`recognizers`]: Named, independently testable pattern recognizers
//!
//! # Example
//!
//! ```rust,ignore
//! use sopnet_parser::SopParser;
//!
//! let record = SopParser::new().parse(text);
//! for category in &record.categories {
//!     println!("{}: {} steps", category.name, category.steps.len());
//! }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod entity;
mod markup;
mod parser;
mod record;
mod tables;

pub mod recognizers;

pub use entity::{
    extract_entities, looks_like_provider_id, Entity, EntityId, EntityKind, EntityMention,
    EntityRegistry, MentionContext,
};
pub use markup::{collapse_whitespace, plain_text, slugify, truncate_chars};
pub use parser::SopParser;
pub use record::{
    BranchKind, BranchRecord, CategoryRecord, DocumentHeader, ReferenceMention, RevisionEntry,
    StepKind, StepRecord, StructuralRecord, SubConditionKind, SubConditionRecord,
};
pub use tables::{extract_lookup_tables, ClinicEntry, LookupTables};

/// Commonly used types
pub mod prelude {
    pub use crate::{
        BranchKind, EntityKind, EntityRegistry, SopParser, StepKind, StructuralRecord,
        SubConditionKind,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
