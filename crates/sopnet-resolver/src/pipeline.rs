//! End-to-end processing: parse, build, resolve

use crate::error::ResolveError;
use crate::resolver::{DeepLinkResolver, ResolutionReport};
use serde::Serialize;
use sopnet_graph::{document_key_for, GraphBuilder, GraphStatistics, ObservationNetwork, WorldNetwork};
use sopnet_parser::SopParser;

/// Everything produced for one document
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutput {
    /// Resolved network
    pub network: WorldNetwork,
    /// What resolution did
    pub report: ResolutionReport,
    /// Statistics of the resolved network
    pub statistics: GraphStatistics,
    /// Entities and clinic rows of the resolved network
    pub observations: ObservationNetwork,
}

/// Runs a document through parser, builder and resolver
#[derive(Debug)]
pub struct SopProcessor {
    parser: SopParser,
    builder: GraphBuilder,
    resolver: DeepLinkResolver,
}

impl SopProcessor {
    /// Create a processor around a configured resolver
    #[must_use]
    pub fn new(resolver: DeepLinkResolver) -> Self {
        Self {
            parser: SopParser::new(),
            builder: GraphBuilder::new(),
            resolver,
        }
    }

    /// With a custom parser for the main document
    #[inline]
    #[must_use]
    pub fn with_parser(mut self, parser: SopParser) -> Self {
        self.parser = parser;
        self
    }

    /// Process one document
    ///
    /// Without a `key`, the document is keyed by the first hex characters
    /// of its content hash. The display name is the parsed title, falling
    /// back to the key.
    ///
    /// # Errors
    /// Returns [`ResolveError::Graph`] if the main network cannot be built;
    /// resolution failures are reported per reference instead.
    pub async fn process(&self, text: &str, key: Option<&str>) -> Result<ProcessOutput, ResolveError> {
        let key = key.map_or_else(|| document_key_for(text), str::to_string);
        let record = self.parser.parse(text);
        let name = record.header.title.clone().unwrap_or_else(|| key.clone());

        let mut network = self.builder.build(&record, &key, &name)?;
        let report = self.resolver.resolve_all(&mut network).await;
        let statistics = network.statistics();
        let mut observations = ObservationNetwork::new();
        observations.absorb(&network);

        tracing::info!(
            key = %key,
            nodes = statistics.node_count,
            edges = statistics.edge_count,
            resolved = report.resolved,
            "processed document"
        );

        Ok(ProcessOutput {
            network,
            report,
            statistics,
            observations,
        })
    }
}
