//! SOP Resolver
//!
//! Deep-link resolution: pending cross-document references are located,
//! parsed, built and merged into the main world network, level by level up
//! to a configured depth, with an in-progress marker that breaks reference
//! cycles.
//!
//! # Core Concepts
//!
//! - [`DocumentLocator`]: Reference code to raw text (in memory, on disk, ...)
//! - [`DeepLinkResolver`]: Bounded, cycle-safe resolution of pending references
//! - [`ResolverConfig`]: Depth limit, deadline and fetch concurrency
//! - [`SopProcessor`]: Parse, build and resolve in one call
//!
//! # Example
//!
//! ```rust,ignore
//! use sopnet_resolver::{DeepLinkResolver, DirectoryLocator, ResolverConfig, SopProcessor};
//! use std::sync::Arc;
//!
//! let locator = Arc::new(DirectoryLocator::new(["./sops"]));
//! let resolver = DeepLinkResolver::new(locator, ResolverConfig::new().with_max_depth(2))?;
//! let output = SopProcessor::new(resolver).process(&text, Some("PR.OP.CL.2862")).await?;
//! println!("{} nodes", output.statistics.node_count);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod config;
mod error;
mod locator;
mod pipeline;
mod resolver;

pub use config::ResolverConfig;
pub use error::{ConfigError, LocatorError, ResolveError};
pub use locator::{DirectoryLocator, DocumentLocator, InMemoryLocator, Located, LocatedDocument};
pub use pipeline::{ProcessOutput, SopProcessor};
pub use resolver::{DeepLinkResolver, ResolutionReport};

/// Commonly used types
pub mod prelude {
    pub use crate::{
        DeepLinkResolver, DirectoryLocator, DocumentLocator, InMemoryLocator, ResolverConfig,
        SopProcessor,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
