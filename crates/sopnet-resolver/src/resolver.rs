//! Deep-link resolver
//!
//! Works through pending references level by level. Each batch of codes is
//! marked `resolving` before any fetch starts, fetched concurrently (bounded
//! by `max_concurrent_fetches`), then parsed, built and merged one at a time
//! in registration order. Codes discovered inside a merged document are
//! registered one level deeper and picked up by a later batch. A code is
//! attempted at most once per call and never leaves a terminal status, so
//! mutually referencing documents cannot recurse.

use crate::config::ResolverConfig;
use crate::error::{ConfigError, ResolveError};
use crate::locator::{DocumentLocator, Located, LocatedDocument};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sopnet_graph::{link_self_reference, merge_into, GraphBuilder, ReferenceStatus, WorldNetwork};
use sopnet_parser::SopParser;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;

/// What one `resolve_all` call did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Codes handed to the locator
    pub attempted: usize,
    /// Codes merged
    pub resolved: usize,
    /// Codes the locator had no document for
    pub not_found: usize,
    /// Codes that failed to fetch, parse, build or merge
    pub errors: usize,
    /// Pending codes at or beyond the depth limit
    pub depth_limited: usize,
    /// Pending codes left untouched because the deadline passed
    pub deadline_skipped: usize,
    /// References to the main document resolved to its own root
    pub self_references: usize,
    /// Nodes added by merges
    pub merged_nodes: usize,
    /// Codes found `resolving` from a dropped call and put back to pending
    #[serde(default)]
    pub requeued: usize,
}

impl ResolutionReport {
    /// Check that nothing was held back by depth or deadline
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.depth_limited == 0 && self.deadline_skipped == 0
    }
}

/// Resolves pending references by fetching and merging their documents
pub struct DeepLinkResolver {
    locator: Arc<dyn DocumentLocator>,
    config: ResolverConfig,
    parser: SopParser,
    builder: GraphBuilder,
}

impl std::fmt::Debug for DeepLinkResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLinkResolver")
            .field("config", &self.config)
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

impl DeepLinkResolver {
    /// Create a resolver
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration is invalid
    pub fn new(locator: Arc<dyn DocumentLocator>, config: ResolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            locator,
            config,
            parser: SopParser::new(),
            builder: GraphBuilder::new(),
        })
    }

    /// With a custom parser for fetched documents
    #[inline]
    #[must_use]
    pub fn with_parser(mut self, parser: SopParser) -> Self {
        self.parser = parser;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every pending reference reachable within `max_depth`
    ///
    /// Never fails: per-code failures are recorded on the reference as
    /// `not_found` or `error` and resolution of the others continues.
    ///
    /// Use `timeout_ms` to bound a call. A future dropped mid-fetch leaves
    /// its batch `resolving`; the next call puts those codes back to
    /// `pending` before anything else and attempts them again.
    pub async fn resolve_all(&self, network: &mut WorldNetwork) -> ResolutionReport {
        let deadline = self.config.timeout().map(|timeout| Instant::now() + timeout);
        let mut report = ResolutionReport::default();
        let mut attempted: HashSet<String> = HashSet::new();

        let requeued = network.requeue_resolving();
        if !requeued.is_empty() {
            tracing::warn!(codes = ?requeued, "re-queued references left resolving by a dropped call");
            report.requeued = requeued.len();
        }

        match link_self_reference(network) {
            Ok(true) => report.self_references += 1,
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %err, "failed to link self reference"),
        }

        'levels: loop {
            let batch: Vec<(String, u32)> = network
                .references()
                .filter(|r| r.status == ReferenceStatus::Pending)
                .filter(|r| r.depth < self.config.max_depth)
                .filter(|r| !attempted.contains(&r.code))
                .map(|r| (r.code.clone(), r.depth))
                .collect();
            if batch.is_empty() {
                break;
            }

            for (idx, chunk) in batch.chunks(self.config.max_concurrent_fetches).enumerate() {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    report.deadline_skipped = batch.len() - idx * self.config.max_concurrent_fetches;
                    tracing::warn!(skipped = report.deadline_skipped, "resolution deadline passed");
                    break 'levels;
                }
                self.resolve_chunk(network, chunk, &mut attempted, &mut report)
                    .await;
            }
        }

        report.depth_limited = network
            .references()
            .filter(|r| r.status == ReferenceStatus::Pending && r.depth >= self.config.max_depth)
            .count();

        tracing::info!(
            attempted = report.attempted,
            resolved = report.resolved,
            not_found = report.not_found,
            errors = report.errors,
            depth_limited = report.depth_limited,
            deadline_skipped = report.deadline_skipped,
            "resolution finished"
        );

        report
    }

    async fn resolve_chunk(
        &self,
        network: &mut WorldNetwork,
        chunk: &[(String, u32)],
        attempted: &mut HashSet<String>,
        report: &mut ResolutionReport,
    ) {
        // in-progress marker goes in before any fetch or recursion
        let mut marked = Vec::with_capacity(chunk.len());
        for (code, depth) in chunk {
            attempted.insert(code.clone());
            match network.set_reference_status(code, ReferenceStatus::Resolving, None) {
                Ok(()) => marked.push((code.as_str(), *depth)),
                Err(err) => tracing::warn!(code = %code, error = %err, "cannot start resolution"),
            }
        }
        report.attempted += marked.len();

        let fetched = join_all(marked.iter().map(|(code, depth)| async move {
            tracing::debug!(code = %code, depth, "locating document");
            (*code, *depth, self.locator.locate(code).await)
        }))
        .await;

        // merges are serialized so id allocation stays deterministic
        for (code, depth, located) in fetched {
            let outcome = match located {
                Ok(Located::Found(document)) => self.absorb(network, code, depth, &document),
                Ok(Located::NotFound) => {
                    report.not_found += 1;
                    tracing::info!(code = %code, depth, "referenced document not found");
                    record_outcome(
                        network,
                        code,
                        ReferenceStatus::NotFound,
                        Some("no document found".to_string()),
                    );
                    continue;
                }
                Err(err) => Err(ResolveError::from(err)),
            };

            match outcome {
                Ok(nodes) => {
                    report.resolved += 1;
                    report.merged_nodes += nodes;
                    tracing::info!(code = %code, depth, nodes, "resolved reference");
                }
                Err(err) => {
                    report.errors += 1;
                    tracing::warn!(code = %code, depth, error = %err, "reference resolution failed");
                    record_outcome(network, code, ReferenceStatus::Error, Some(err.to_string()));
                }
            }
        }
    }

    /// Parse, build and merge one fetched document; returns the nodes added
    fn absorb(
        &self,
        network: &mut WorldNetwork,
        code: &str,
        depth: u32,
        document: &LocatedDocument,
    ) -> Result<usize, ResolveError> {
        let record = self.parser.parse(&document.text);
        let name = record
            .header
            .title
            .clone()
            .unwrap_or_else(|| document.name.clone());
        let sub = self.builder.build(&record, code, &name)?;
        let outcome = merge_into(network, &sub, code)?;
        network.set_reference_status(code, ReferenceStatus::Resolved, None)?;

        for reference in outcome.discovered {
            network.register_reference(
                &reference.code,
                reference.title,
                depth + 1,
                reference.source_context.map(|ctx| format!("{code}: {ctx}")),
            );
        }
        Ok(outcome.remap.len())
    }
}

fn record_outcome(
    network: &mut WorldNetwork,
    code: &str,
    status: ReferenceStatus,
    message: Option<String>,
) {
    if let Err(err) = network.set_reference_status(code, status, message) {
        tracing::warn!(code = %code, error = %err, "cannot record resolution outcome");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::InMemoryLocator;
    use crate::error::LocatorError;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn network(text: &str, key: &str) -> WorldNetwork {
        let record = SopParser::new().parse(text);
        GraphBuilder::new().build(&record, key, key).unwrap()
    }

    struct FailingLocator;

    #[async_trait::async_trait]
    impl DocumentLocator for FailingLocator {
        async fn locate(&self, _code: &str) -> Result<Located, LocatorError> {
            Err(LocatorError::Backend("store offline".to_string()))
        }
    }

    #[test]
    fn invalid_config_rejected() {
        let locator = Arc::new(InMemoryLocator::new());
        let config = ResolverConfig::new().with_max_concurrent_fetches(0);
        assert!(DeepLinkResolver::new(locator, config).is_err());
    }

    #[tokio::test]
    async fn locator_failure_marks_error() {
        let resolver = DeepLinkResolver::new(Arc::new(FailingLocator), ResolverConfig::new()).unwrap();
        let mut net = network("### A\n1. See PR.OP.CL.2000.\n", "MAIN");

        let report = resolver.resolve_all(&mut net).await;

        assert_eq!(report.errors, 1);
        let reference = net.reference("PR.OP.CL.2000").unwrap();
        assert_eq!(reference.status, ReferenceStatus::Error);
        assert!(reference.message.as_deref().unwrap().contains("store offline"));
    }

    struct StalledLocator;

    #[async_trait::async_trait]
    impl DocumentLocator for StalledLocator {
        async fn locate(&self, _code: &str) -> Result<Located, LocatorError> {
            futures::future::pending::<Result<Located, LocatorError>>().await
        }
    }

    #[tokio::test]
    async fn dropped_call_is_retried_by_the_next() {
        let mut net = network("### A\n1. See PR.OP.CL.2000.\n", "MAIN");
        let stalled = DeepLinkResolver::new(Arc::new(StalledLocator), ResolverConfig::new()).unwrap();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), stalled.resolve_all(&mut net)).await;
        assert!(cancelled.is_err());
        assert_eq!(
            net.reference("PR.OP.CL.2000").unwrap().status,
            ReferenceStatus::Resolving
        );

        let locator = Arc::new(InMemoryLocator::new().with_document("PR.OP.CL.2000", "### B\n1. Done.\n"));
        let resolver = DeepLinkResolver::new(locator, ResolverConfig::new()).unwrap();
        let report = resolver.resolve_all(&mut net).await;

        assert_eq!(report.requeued, 1);
        assert_eq!(report.resolved, 1);
        assert_eq!(
            net.reference("PR.OP.CL.2000").unwrap().status,
            ReferenceStatus::Resolved
        );
    }

    #[tokio::test]
    async fn zero_depth_leaves_everything_pending() {
        let locator = Arc::new(InMemoryLocator::new().with_document("PR.OP.CL.2000", "### B\n1. Done.\n"));
        let resolver = DeepLinkResolver::new(locator, ResolverConfig::new().with_max_depth(0)).unwrap();
        let mut net = network("### A\n1. See PR.OP.CL.2000.\n", "MAIN");

        let report = resolver.resolve_all(&mut net).await;

        assert_eq!(report.attempted, 0);
        assert_eq!(report.depth_limited, 1);
        assert!(!report.is_complete());
        assert_eq!(net.pending_codes(), vec!["PR.OP.CL.2000".to_string()]);
    }
}
