//! Category keys
//!
//! Keys of `claim_type_roots`. A native key is the category's own name; a key
//! absorbed from a merged sub-document is namespaced as `CODE/Category`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Separator between reference code and category name
pub const SEPARATOR: char = '/';

/// Key of a category root
///
/// # Examples
/// - `Amazon Claims` (native)
/// - `PR.OP.CL.2862/Amazon Claims` (from a merged document)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryPath {
    code: Option<String>,
    name: String,
}

fn clean_name(name: &str) -> String {
    name.trim().replace(SEPARATOR, "-")
}

impl CategoryPath {
    /// Key for a category of the document itself
    #[must_use]
    pub fn native(name: &str) -> Self {
        Self {
            code: None,
            name: clean_name(name),
        }
    }

    /// Key for a category absorbed from the document behind `code`
    #[must_use]
    pub fn namespaced(code: &str, name: &str) -> Self {
        Self {
            code: Some(code.trim().to_ascii_uppercase()),
            name: clean_name(name),
        }
    }

    /// Reference code for namespaced keys
    #[inline]
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Category name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the key belongs to the document itself
    #[inline]
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.code.is_none()
    }
}

impl Display for CategoryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}{SEPARATOR}{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for CategoryPath {
    type Err = CategoryPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CategoryPathError::Empty);
        }
        match s.split_once(SEPARATOR) {
            None => Ok(Self::native(s)),
            Some((code, name)) if !code.trim().is_empty() && !name.trim().is_empty() => {
                Ok(Self::namespaced(code, name))
            }
            Some(_) => Err(CategoryPathError::EmptySegment(s.to_string())),
        }
    }
}

impl Serialize for CategoryPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CategoryPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Errors related to category keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryPathError {
    /// Empty key
    #[error("category key is empty")]
    Empty,

    /// Code or name part missing around the separator
    #[error("category key has an empty segment: {0}")]
    EmptySegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_key_replaces_separator() {
        let path = CategoryPath::native("Medical/Dental Claims");
        assert!(path.is_native());
        assert_eq!(path.to_string(), "Medical-Dental Claims");
    }

    #[test]
    fn namespaced_key_display() {
        let path = CategoryPath::namespaced("pr.op.cl.2862", "Amazon Claims");
        assert_eq!(path.code(), Some("PR.OP.CL.2862"));
        assert_eq!(path.to_string(), "PR.OP.CL.2862/Amazon Claims");
    }

    #[test]
    fn parse_native_and_namespaced() {
        let native: CategoryPath = "Amazon Claims".parse().unwrap();
        assert_eq!(native, CategoryPath::native("Amazon Claims"));

        let namespaced: CategoryPath = "PR.OP.CL.2862/Amazon Claims".parse().unwrap();
        assert_eq!(namespaced.name(), "Amazon Claims");
        assert!(!namespaced.is_native());
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert_eq!("".parse::<CategoryPath>(), Err(CategoryPathError::Empty));
        assert!("/Amazon".parse::<CategoryPath>().is_err());
        assert!("PR.OP.CL.1/".parse::<CategoryPath>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let path = CategoryPath::namespaced("PR.OP.CL.1", "A");
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"PR.OP.CL.1/A\"");
    }
}
