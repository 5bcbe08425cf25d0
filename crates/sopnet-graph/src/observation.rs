//! Observation network
//!
//! Cross-document aggregate of entities and clinic directory rows, fed by
//! any number of world networks.

use crate::network::WorldNetwork;
use serde::{Deserialize, Serialize};
use sopnet_parser::{ClinicEntry, Entity, EntityKind, EntityRegistry};
use std::collections::{BTreeMap, BTreeSet};

/// Entities and clinics observed across documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationNetwork {
    /// Entities merged by id
    pub entities: EntityRegistry,
    /// Distinct clinic rows in first-seen order
    pub clinics: Vec<ClinicEntry>,
    /// Keys of absorbed documents
    pub documents: Vec<String>,
}

/// Aggregate counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSummary {
    /// Absorbed documents
    pub documents: usize,
    /// Distinct entities
    pub entities: usize,
    /// Entities per kind
    pub entities_by_kind: BTreeMap<EntityKind, usize>,
    /// Distinct clinic rows
    pub clinics: usize,
    /// Distinct TINs with at least one provider id
    pub tins: usize,
}

impl ObservationNetwork {
    /// Empty aggregate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a network's entities and lookup tables in
    ///
    /// Absorbing the same document twice is a no-op.
    pub fn absorb(&mut self, network: &WorldNetwork) {
        let key = network.document().key.clone();
        if self.documents.contains(&key) {
            return;
        }

        self.entities.absorb(&network.entities);
        for entry in network.lookup_tables.values().flatten() {
            if !self.clinics.contains(entry) {
                self.clinics.push(entry.clone());
            }
        }

        tracing::debug!(
            document = %key,
            entities = self.entities.len(),
            clinics = self.clinics.len(),
            "absorbed observations"
        );
        self.documents.push(key);
    }

    /// Entities of one kind
    pub fn by_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.by_kind(kind)
    }

    /// Provider ids known under each TIN, from clinic rows and entity attributes
    #[must_use]
    pub fn providers_by_tin(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for clinic in &self.clinics {
            if let (Some(tin), Some(id)) = (&clinic.tin, &clinic.provider_id) {
                index.entry(tin.clone()).or_default().insert(id.clone());
            }
        }
        for entity in self.entities.by_kind(EntityKind::ProviderId) {
            if let Some(tin) = entity.attributes.get("tin") {
                index
                    .entry(tin.clone())
                    .or_default()
                    .insert(entity.value.clone());
            }
        }

        index
    }

    /// Aggregate counts
    #[must_use]
    pub fn summary(&self) -> ObservationSummary {
        let mut entities_by_kind = BTreeMap::new();
        for entity in self.entities.iter() {
            *entities_by_kind.entry(entity.kind).or_default() += 1;
        }
        ObservationSummary {
            documents: self.documents.len(),
            entities: self.entities.len(),
            entities_by_kind,
            clinics: self.clinics.len(),
            tins: self.providers_by_tin().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use pretty_assertions::assert_eq;
    use sopnet_parser::SopParser;

    const CLINICS: &str = "\
**Clinic Directory**

| Clinic | TIN | Provider ID |
|---|---|---|
| Vita Health Seattle | 123456789 | ABC123DEF |
| Vita Health Tacoma | 123456789 | XYZ987QRS |
";

    fn network(text: &str, key: &str) -> WorldNetwork {
        let record = SopParser::new().parse(text);
        GraphBuilder::new().build(&record, key, key).unwrap()
    }

    #[test]
    fn groups_provider_ids_by_tin() {
        let mut observed = ObservationNetwork::new();
        observed.absorb(&network(CLINICS, "A"));

        let index = observed.providers_by_tin();
        let ids: Vec<_> = index["123456789"].iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["ABC123DEF", "XYZ987QRS"]);
    }

    #[test]
    fn absorbing_twice_changes_nothing() {
        let mut observed = ObservationNetwork::new();
        let net = network(CLINICS, "A");
        observed.absorb(&net);
        let once = observed.clone();
        observed.absorb(&net);
        assert_eq!(observed, once);
    }

    #[test]
    fn merges_entities_across_documents() {
        let mut observed = ObservationNetwork::new();
        observed.absorb(&network(CLINICS, "A"));
        observed.absorb(&network("### X Claims\n1. Use ID ABC123DEF.\n", "B"));

        let summary = observed.summary();
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.clinics, 2);
        assert_eq!(summary.tins, 1);
        assert_eq!(summary.entities_by_kind[&EntityKind::ProviderId], 2);
        assert_eq!(observed.by_kind(EntityKind::ProviderId).count(), 2);
    }
}
