//! Provider lookup tables
//!
//! Pipe tables listing clinics with their tax ids, provider ids and NPIs,
//! plus the "Crossover <Location>: <id>" line lists some documents use
//! instead of a table.

use crate::entity::{looks_like_provider_id, EntityKind, EntityRegistry};
use crate::markup::{plain_text, slugify};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Table name used for crossover line lists
pub const CROSSOVER_TABLE: &str = "crossover_clinics";

/// Lookup tables keyed by table name
pub type LookupTables = IndexMap<String, Vec<ClinicEntry>>;

/// One clinic row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicEntry {
    /// Clinic or provider name
    pub name: String,
    /// Tax identification number (digits only)
    pub tin: Option<String>,
    /// Alphanumeric provider id
    pub provider_id: Option<String>,
    /// National provider identifier
    pub npi: Option<String>,
    /// Location or state
    pub location: Option<String>,
}

impl ClinicEntry {
    fn has_identifier(&self) -> bool {
        self.tin.is_some() || self.provider_id.is_some() || self.npi.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    Tin,
    ProviderId,
    Npi,
    Location,
    Ignored,
}

impl Column {
    fn from_header(header: &str) -> Self {
        let header = header.to_ascii_lowercase();
        let words: Vec<&str> = header
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |keys: &[&str]| words.iter().any(|w| keys.contains(w));

        if has(&["tin", "tax", "ein"]) {
            Self::Tin
        } else if has(&["npi"]) {
            Self::Npi
        } else if has(&["id", "identifier", "ptan"]) {
            Self::ProviderId
        } else if has(&["location", "state", "city", "region"]) {
            Self::Location
        } else if has(&["name", "clinic", "provider", "facility", "vendor"]) {
            Self::Name
        } else {
            Self::Ignored
        }
    }

    fn from_value(value: &str) -> Self {
        let digits: String = value.chars().filter(char::is_ascii_digit).collect();
        let only_digits = value.chars().all(|c| c.is_ascii_digit() || c == '-');
        if only_digits && digits.len() == 9 {
            Self::Tin
        } else if only_digits && digits.len() == 10 {
            Self::Npi
        } else if looks_like_provider_id(value) {
            Self::ProviderId
        } else {
            Self::Name
        }
    }
}

static CROSSOVER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:[-–•*+]|I)?[ \t]*\**([Cc]rossover[ \t]+[A-Za-z][A-Za-z .]*?)\**[ \t]*:[ \t]*\**[ \t]*(?:NPI:?[ \t]*)?([A-Z][0-9A-Z]{8,11}|\d{10})\b",
    )
    .expect("valid crossover pattern")
});

struct PipeBlock {
    heading: Option<String>,
    rows: Vec<Vec<String>>,
}

fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

fn heading_candidate(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let is_heading = trimmed.starts_with('#')
        || (trimmed.starts_with("**") && trimmed.ends_with("**"))
        || (trimmed.starts_with("**") && trimmed.ends_with(':'))
        || trimmed.ends_with(':');
    if !is_heading {
        return None;
    }
    let name = plain_text(trimmed.trim_start_matches('#'));
    (!name.is_empty()).then_some(name)
}

fn pipe_blocks(text: &str) -> Vec<PipeBlock> {
    let mut blocks = Vec::new();
    let mut heading: Option<String> = None;
    let mut current: Option<PipeBlock> = None;

    for line in text.lines() {
        if is_table_line(line) {
            if is_separator_row(line) {
                continue;
            }
            let cells = line
                .trim()
                .trim_matches('|')
                .split('|')
                .map(plain_text)
                .collect();
            current
                .get_or_insert_with(|| PipeBlock {
                    heading: heading.clone(),
                    rows: Vec::new(),
                })
                .rows
                .push(cells);
            continue;
        }

        if let Some(block) = current.take() {
            blocks.push(block);
        }
        if let Some(candidate) = heading_candidate(line) {
            heading = Some(candidate);
        }
    }

    blocks.extend(current);
    blocks
}

fn is_revision_block(block: &PipeBlock) -> bool {
    block.rows.iter().any(|row| {
        row.first().is_some_and(|cell| {
            let mut parts = cell.split('.');
            matches!(
                (parts.next(), parts.next(), parts.next()),
                (Some(major), Some(minor), None)
                    if !major.is_empty()
                        && !minor.is_empty()
                        && major.chars().all(|c| c.is_ascii_digit())
                        && minor.chars().all(|c| c.is_ascii_digit())
            )
        })
    })
}

fn clinic_rows(rows: &[Vec<String>]) -> Vec<ClinicEntry> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let header_present = first
        .iter()
        .all(|cell| matches!(Column::from_value(cell), Column::Name));
    let (columns, body): (Option<Vec<Column>>, &[Vec<String>]) = if header_present {
        (
            Some(first.iter().map(|h| Column::from_header(h)).collect()),
            &rows[1..],
        )
    } else {
        (None, rows)
    };

    body.iter()
        .filter_map(|row| {
            let mut entry = ClinicEntry::default();
            for (idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let column = match &columns {
                    Some(columns) => columns.get(idx).copied().unwrap_or(Column::Ignored),
                    None => Column::from_value(cell),
                };
                match column {
                    Column::Name if entry.name.is_empty() => entry.name.clone_from(cell),
                    Column::Tin => entry.tin = Some(EntityKind::Tin.normalize(cell)),
                    Column::Npi => entry.npi = Some(EntityKind::Npi.normalize(cell)),
                    Column::ProviderId => {
                        entry.provider_id = Some(EntityKind::ProviderId.normalize(cell));
                    }
                    Column::Location => entry.location = Some(cell.clone()),
                    _ => {}
                }
            }
            (!entry.name.is_empty() && entry.has_identifier()).then_some(entry)
        })
        .collect()
}

fn crossover_entries(text: &str) -> Vec<ClinicEntry> {
    let mut entries: Vec<ClinicEntry> = Vec::new();

    for caps in CROSSOVER_LINE.captures_iter(text) {
        let (Some(name), Some(id)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let name = plain_text(name.as_str());
        let id = id.as_str();
        let mut entry = ClinicEntry {
            location: name.split_whitespace().nth(1).map(str::to_string),
            name,
            ..ClinicEntry::default()
        };
        if id.chars().all(|c| c.is_ascii_digit()) {
            entry.npi = Some(id.to_string());
        } else if looks_like_provider_id(id) {
            entry.provider_id = Some(id.to_string());
        } else {
            continue;
        }
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    entries
}

fn register_entry(entities: &mut EntityRegistry, table: &str, entry: &ClinicEntry) {
    let attributes = |extra: Option<(&str, &String)>| {
        let mut attrs = vec![
            ("clinic_name".to_string(), entry.name.clone()),
            ("lookup_table".to_string(), table.to_string()),
        ];
        if let Some((key, value)) = extra {
            attrs.push((key.to_string(), value.clone()));
        }
        attrs
    };

    if let Some(provider_id) = &entry.provider_id {
        entities.register(
            EntityKind::ProviderId,
            provider_id,
            attributes(entry.tin.as_ref().map(|tin| ("tin", tin))),
        );
    }
    if let Some(tin) = &entry.tin {
        entities.register(EntityKind::Tin, tin, attributes(None));
    }
    if let Some(npi) = &entry.npi {
        entities.register(EntityKind::Npi, npi, attributes(None));
    }
}

/// Extract every lookup table and register its identifiers as entities.
///
/// Tables are named by the slug of the closest preceding heading; unnamed
/// tables get `table_<n>`. Revision-history tables and tables without any
/// identifier column are skipped.
pub fn extract_lookup_tables(text: &str, entities: &mut EntityRegistry) -> LookupTables {
    let mut tables = LookupTables::new();

    for block in pipe_blocks(text) {
        if is_revision_block(&block) {
            continue;
        }
        let entries = clinic_rows(&block.rows);
        if entries.is_empty() {
            continue;
        }
        let name = block
            .heading
            .as_deref()
            .map(slugify)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| format!("table_{}", tables.len() + 1));
        tables.entry(name).or_default().extend(entries);
    }

    let crossover = crossover_entries(text);
    if !crossover.is_empty() {
        tables
            .entry(CROSSOVER_TABLE.to_string())
            .or_default()
            .extend(crossover);
    }

    for (name, entries) in &tables {
        for entry in entries {
            register_entry(entities, name, entry);
        }
    }

    tracing::debug!(tables = tables.len(), "extracted lookup tables");
    tables
}
