//! Error types for the resolver
//!
//! None of these escape [`crate::DeepLinkResolver::resolve_all`]: per-code
//! failures are written onto the reference as `error` with the message.

use sopnet_graph::GraphError;
use std::path::PathBuf;

/// Top-level resolver error
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Locator failed
    #[error("locator error: {0}")]
    Locator(#[from] LocatorError),

    /// Building or merging a network failed
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Document lookup failures other than "not found"
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    /// Reading a search root or candidate file failed
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Code cannot name a document
    #[error("invalid reference code: {0:?}")]
    InvalidCode(String),

    /// Backend-specific failure
    #[error("locator backend failed: {0}")]
    Backend(String),
}

/// Invalid resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Fetch concurrency must be at least one
    #[error("max_concurrent_fetches must be at least 1")]
    ZeroConcurrency,

    /// A zero deadline would skip every code
    #[error("timeout_ms must be greater than zero when set")]
    ZeroTimeout,
}
