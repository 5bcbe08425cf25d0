//! Domain entity extraction
//!
//! Scans free text for provider identifiers, tax and NPI numbers, pend and
//! PCA codes, group numbers, well-known provider names and system messages.
//! Every match folds into an [`EntityRegistry`] keyed by a deterministic
//! [`EntityId`], so the same identifier mentioned twice is one entity with
//! two mention contexts.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Category of a recognized domain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Alphanumeric provider identifier (9-12 chars, mixed letters and digits)
    ProviderId,
    /// Provider display name from the known vocabulary
    ProviderName,
    /// Tax identification number
    Tin,
    /// National provider identifier (10 digits)
    Npi,
    /// Claim pend code
    PendCode,
    /// PCA code
    PcaCode,
    /// Seven-digit group number
    GroupNumber,
    /// Ultra Blue system message code and text
    UltraBlueMessage,
}

impl EntityKind {
    /// All kinds in extraction order
    pub const ALL: [Self; 8] = [
        Self::ProviderId,
        Self::ProviderName,
        Self::Tin,
        Self::Npi,
        Self::PendCode,
        Self::PcaCode,
        Self::GroupNumber,
        Self::UltraBlueMessage,
    ];

    /// Stable snake_case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderId => "provider_id",
            Self::ProviderName => "provider_name",
            Self::Tin => "tin",
            Self::Npi => "npi",
            Self::PendCode => "pend_code",
            Self::PcaCode => "pca_code",
            Self::GroupNumber => "group_number",
            Self::UltraBlueMessage => "ultra_blue_message",
        }
    }

    const fn id_prefix(self) -> &'static str {
        match self {
            Self::ProviderId => "provider",
            Self::ProviderName => "provider_name",
            Self::Tin => "tin",
            Self::Npi => "npi",
            Self::PendCode => "pend",
            Self::PcaCode => "pca",
            Self::GroupNumber => "group",
            Self::UltraBlueMessage => "ub",
        }
    }

    /// Canonical form of a raw match for this kind
    #[must_use]
    pub fn normalize(self, raw: &str) -> String {
        match self {
            Self::ProviderId | Self::PendCode | Self::PcaCode => raw
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_uppercase(),
            Self::Tin | Self::Npi | Self::GroupNumber => {
                raw.chars().filter(char::is_ascii_digit).collect()
            }
            Self::ProviderName => raw.split_whitespace().collect::<Vec<_>>().join(" "),
            Self::UltraBlueMessage => raw
                .split(['-', '–'])
                .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" - ")
                .to_uppercase(),
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic entity identifier, e.g. `provider_ABC123DEF` or `tin_752510547`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Derive the id from a kind and an already-normalized value
    #[must_use]
    pub fn new(kind: EntityKind, normalized: &str) -> Self {
        let key: String = normalized
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let key = if kind == EntityKind::ProviderName {
            key.to_ascii_lowercase()
        } else {
            key
        };
        Self(format!("{}_{key}", kind.id_prefix()))
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an entity was seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MentionContext {
    /// Category name, or `None` for document-level mentions
    pub section: Option<String>,
    /// Step number within the category
    pub step: Option<u32>,
}

impl MentionContext {
    /// Mention outside any step
    #[must_use]
    pub fn document() -> Self {
        Self::default()
    }

    /// Mention inside a numbered step of a category
    #[must_use]
    pub fn step(section: impl Into<String>, step: u32) -> Self {
        Self {
            section: Some(section.into()),
            step: Some(step),
        }
    }

    /// Mention inside a category but outside any step
    #[must_use]
    pub fn section(section: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            step: None,
        }
    }
}

/// A single raw match produced by [`extract_entities`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMention {
    /// Entity kind
    pub kind: EntityKind,
    /// Normalized value
    pub value: String,
    /// Text as it appeared
    pub raw: String,
}

impl EntityMention {
    /// Identifier this mention folds into
    #[must_use]
    pub fn id(&self) -> EntityId {
        EntityId::new(self.kind, &self.value)
    }
}

/// A deduplicated domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Deterministic identifier
    pub id: EntityId,
    /// Entity kind
    #[serde(rename = "entity_type")]
    pub kind: EntityKind,
    /// Normalized value
    pub value: String,
    /// Free-form attributes (clinic name, document role, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Every context the entity was mentioned in, first-seen first
    #[serde(default)]
    pub mentions: Vec<MentionContext>,
}

const PROVIDER_VOCABULARY: &[&str] = &[
    "Vita Health",
    "Concentra",
    "Crossover Health",
    "Crossover",
    "MedAire",
    "Omada",
    "Physera",
    "Kabafusion",
    "Progyny",
    "98POINT6",
    "VSP Retail",
    "UPMC",
    "Regenexx",
    "Care Medical",
];

static PROVIDER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9]{9,12}\b").expect("valid provider id pattern"));

static TIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:TIN|tax identification number)\b[:#\s]*(\d{3}-?\d{2}-?\d{4}|\d{2}-\d{7})\b")
        .expect("valid TIN pattern")
});

static NPI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bNPI\b[:#\s]*(\d{10})\b").expect("valid NPI pattern"));

static PEND_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bpend(?:\s+code|\s+to|ed\s+to)?\s*[:#]?\s*([A-Z]{1,2}\d{2,3})\b")
        .expect("valid pend code pattern")
});

static PCA_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bPCA(?:\s+code)?\s*[:#]?\s*([A-Z]?\d{3,4})\b").expect("valid PCA pattern")
});

static GROUP_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bgroup(?:\s+(?:number|no\.?|#))?\s*[:#]?\s*(\d{7})\b")
        .expect("valid group number pattern")
});

static ULTRA_BLUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bUltra\s*Blue\s+message\s+\**([A-Z]{2,4}\s*[-–]\s*[A-Z][A-Z ]*?)\**(?:[.,;]|\s+on\b|\s*$)")
        .expect("valid Ultra Blue pattern")
});

static PROVIDER_NAMES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    PROVIDER_VOCABULARY
        .iter()
        .map(|name| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
            (*name, Regex::new(&pattern).expect("valid provider name pattern"))
        })
        .collect()
});

/// Provider-id shape: 9-12 alphanumerics, starts with a letter, at least two
/// letters and two digits.
#[must_use]
pub fn looks_like_provider_id(token: &str) -> bool {
    let len = token.chars().count();
    if !(9..=12).contains(&len) || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let starts_alpha = token.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let letters = token.chars().filter(char::is_ascii_alphabetic).count();
    let digits = token.chars().filter(char::is_ascii_digit).count();
    starts_alpha && letters >= 2 && digits >= 2 && token == token.to_ascii_uppercase()
}

/// Extract all entity mentions from `text`.
///
/// Kinds are scanned in [`EntityKind::ALL`] order, matches within a kind in
/// text order. Repeated identical mentions are reported once.
#[must_use]
pub fn extract_entities(text: &str) -> Vec<EntityMention> {
    let mut mentions: Vec<EntityMention> = Vec::new();
    let mut push = |kind: EntityKind, raw: &str| {
        let value = kind.normalize(raw);
        if value.is_empty() {
            return;
        }
        if !mentions.iter().any(|m| m.kind == kind && m.value == value) {
            mentions.push(EntityMention {
                kind,
                value,
                raw: raw.to_string(),
            });
        }
    };

    for kind in EntityKind::ALL {
        match kind {
            EntityKind::ProviderId => {
                for m in PROVIDER_ID.find_iter(text) {
                    if looks_like_provider_id(m.as_str()) {
                        push(kind, m.as_str());
                    }
                }
            }
            EntityKind::ProviderName => {
                for (name, pattern) in PROVIDER_NAMES.iter() {
                    if pattern.is_match(text) {
                        push(kind, *name);
                    }
                }
            }
            _ => {
                let pattern = match kind {
                    EntityKind::Tin => &*TIN,
                    EntityKind::Npi => &*NPI,
                    EntityKind::PendCode => &*PEND_CODE,
                    EntityKind::PcaCode => &*PCA_CODE,
                    EntityKind::GroupNumber => &*GROUP_NUMBER,
                    _ => &*ULTRA_BLUE,
                };
                for caps in pattern.captures_iter(text) {
                    if let Some(m) = caps.get(1) {
                        push(kind, m.as_str());
                    }
                }
            }
        }
    }

    mentions
}

/// Deduplicated entity store, insertion ordered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRegistry {
    entities: IndexMap<EntityId, Entity>,
}

impl EntityRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mention, creating the entity on first sight
    pub fn observe(&mut self, mention: &EntityMention, context: &MentionContext) -> EntityId {
        let id = mention.id();
        let entity = self.entities.entry(id.clone()).or_insert_with(|| Entity {
            id: id.clone(),
            kind: mention.kind,
            value: mention.value.clone(),
            attributes: BTreeMap::new(),
            mentions: Vec::new(),
        });
        if !entity.mentions.contains(context) {
            entity.mentions.push(context.clone());
        }
        id
    }

    /// Extract and record every mention in `text`; returns ids in first-seen order
    pub fn observe_text(&mut self, text: &str, context: &MentionContext) -> Vec<EntityId> {
        extract_entities(text)
            .iter()
            .map(|mention| self.observe(mention, context))
            .collect()
    }

    /// Record only mentions whose entity is not known yet
    ///
    /// Returns the ids of the new entities.
    pub fn sweep(&mut self, text: &str, context: &MentionContext) -> Vec<EntityId> {
        let fresh: Vec<EntityMention> = extract_entities(text)
            .into_iter()
            .filter(|mention| !self.entities.contains_key(&mention.id()))
            .collect();
        fresh
            .iter()
            .map(|mention| self.observe(mention, context))
            .collect()
    }

    /// Register an entity without a mention, merging missing attributes
    pub fn register(
        &mut self,
        kind: EntityKind,
        raw: &str,
        attributes: impl IntoIterator<Item = (String, String)>,
    ) -> Option<EntityId> {
        let value = kind.normalize(raw);
        if value.is_empty() {
            return None;
        }
        let id = EntityId::new(kind, &value);
        let entity = self.entities.entry(id.clone()).or_insert_with(|| Entity {
            id: id.clone(),
            kind,
            value,
            attributes: BTreeMap::new(),
            mentions: Vec::new(),
        });
        for (key, val) in attributes {
            entity.attributes.entry(key).or_insert(val);
        }
        Some(id)
    }

    /// Merge another registry into this one
    pub fn absorb(&mut self, other: &Self) {
        for (id, incoming) in &other.entities {
            match self.entities.get_mut(id) {
                Some(existing) => {
                    for context in &incoming.mentions {
                        if !existing.mentions.contains(context) {
                            existing.mentions.push(context.clone());
                        }
                    }
                    for (key, val) in &incoming.attributes {
                        existing
                            .attributes
                            .entry(key.clone())
                            .or_insert_with(|| val.clone());
                    }
                }
                None => {
                    self.entities.insert(id.clone(), incoming.clone());
                }
            }
        }
    }

    /// Look up an entity
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable lookup
    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Check membership
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Iterate entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities of one kind
    pub fn by_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| e.kind == kind)
    }

    /// Number of entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_values(text: &str) -> Vec<(EntityKind, String)> {
        extract_entities(text)
            .into_iter()
            .map(|m| (m.kind, m.value))
            .collect()
    }

    #[test]
    fn provider_id_shape() {
        assert!(looks_like_provider_id("ABC123DEF"));
        assert!(looks_like_provider_id("B09B4VB09B4V"));
        assert!(!looks_like_provider_id("752510547"));
        assert!(!looks_like_provider_id("PROCEDURES"));
        assert!(!looks_like_provider_id("A1234567890123"));
        assert!(!looks_like_provider_id("abc123def"));
    }

    #[test]
    fn extracts_provider_id_and_name() {
        let found = kinds_and_values("Is the provider Vita Health? Assign ID ABC123DEF.");
        assert!(found.contains(&(EntityKind::ProviderId, "ABC123DEF".to_string())));
        assert!(found.contains(&(EntityKind::ProviderName, "Vita Health".to_string())));
    }

    #[test]
    fn extracts_numeric_identifiers() {
        let text = "Billing TIN: 75-2510547, NPI 1234567890, group number 1234567.";
        let found = kinds_and_values(text);
        assert!(found.contains(&(EntityKind::Tin, "752510547".to_string())));
        assert!(found.contains(&(EntityKind::Npi, "1234567890".to_string())));
        assert!(found.contains(&(EntityKind::GroupNumber, "1234567".to_string())));
    }

    #[test]
    fn extracts_codes() {
        let found = kinds_and_values("Pend code P966 and PCA 2345 apply.");
        assert!(found.contains(&(EntityKind::PendCode, "P966".to_string())));
        assert!(found.contains(&(EntityKind::PcaCode, "2345".to_string())));
    }

    #[test]
    fn extracts_ultra_blue_message() {
        let found = kinds_and_values("Check the Ultra Blue message AMZ - AMAZON CLAIM on the claim.");
        assert!(found.contains(&(
            EntityKind::UltraBlueMessage,
            "AMZ - AMAZON CLAIM".to_string()
        )));
    }

    #[test]
    fn repeated_mentions_reported_once() {
        let found = extract_entities("ABC123DEF then ABC123DEF again");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn entity_ids_are_deterministic() {
        assert_eq!(
            EntityId::new(EntityKind::ProviderId, "ABC123DEF").as_str(),
            "provider_ABC123DEF"
        );
        assert_eq!(
            EntityId::new(EntityKind::ProviderName, "Vita Health").as_str(),
            "provider_name_vita_health"
        );
        assert_eq!(EntityId::new(EntityKind::Tin, "752510547").as_str(), "tin_752510547");
    }

    #[test]
    fn registry_merges_mentions() {
        let mut registry = EntityRegistry::new();
        let first = registry.observe_text("ID ABC123DEF", &MentionContext::step("Amazon Claims", 1));
        let second = registry.observe_text("ID ABC123DEF", &MentionContext::step("Amazon Claims", 3));

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        let entity = registry.get(&first[0]).unwrap();
        assert_eq!(entity.mentions.len(), 2);
    }

    #[test]
    fn sweep_only_adds_unknown_entities() {
        let mut registry = EntityRegistry::new();
        registry.observe_text("ID ABC123DEF", &MentionContext::step("Amazon Claims", 1));

        let added = registry.sweep("ABC123DEF and XYZ987QRS", &MentionContext::document());
        assert_eq!(added, vec![EntityId::new(EntityKind::ProviderId, "XYZ987QRS")]);
        assert_eq!(registry.len(), 2);

        let known = registry
            .get(&EntityId::new(EntityKind::ProviderId, "ABC123DEF"))
            .unwrap();
        assert_eq!(known.mentions.len(), 1);
    }

    #[test]
    fn register_keeps_first_attribute_value() {
        let mut registry = EntityRegistry::new();
        let id = registry
            .register(
                EntityKind::Tin,
                "75-2510547",
                [("clinic".to_string(), "First".to_string())],
            )
            .unwrap();
        registry.register(
            EntityKind::Tin,
            "752510547",
            [("clinic".to_string(), "Second".to_string())],
        );

        assert_eq!(registry.get(&id).unwrap().attributes["clinic"], "First");
    }

    #[test]
    fn absorb_unions_registries() {
        let mut left = EntityRegistry::new();
        left.observe_text("ABC123DEF", &MentionContext::section("A"));
        let mut right = EntityRegistry::new();
        right.observe_text("ABC123DEF XYZ987QRS", &MentionContext::section("B"));

        left.absorb(&right);
        assert_eq!(left.len(), 2);
        let shared = left
            .get(&EntityId::new(EntityKind::ProviderId, "ABC123DEF"))
            .unwrap();
        assert_eq!(shared.mentions.len(), 2);
    }

    #[test]
    fn entity_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EntityKind::UltraBlueMessage).unwrap();
        assert_eq!(json, "\"ultra_blue_message\"");
    }
}
