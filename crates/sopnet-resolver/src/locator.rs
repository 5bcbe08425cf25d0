//! Document locators
//!
//! A locator turns a reference code into raw document text. Matching is
//! best-effort and entirely the locator's concern; "no such document" is a
//! normal answer ([`Located::NotFound`]), not an error.

use crate::error::LocatorError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A document found for a code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDocument {
    /// Display name (title or file stem)
    pub name: String,
    /// Raw text
    pub text: String,
}

/// Locator answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// Document text for the code
    Found(LocatedDocument),
    /// No document matches the code
    NotFound,
}

/// Source of raw document text by reference code
///
/// Implement this trait to fetch documents from a store, a service or disk.
#[async_trait::async_trait]
pub trait DocumentLocator: Send + Sync {
    /// Find the document behind `code`
    async fn locate(&self, code: &str) -> Result<Located, LocatorError>;
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Locator over documents held in memory, keyed case-insensitively
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocator {
    documents: HashMap<String, LocatedDocument>,
}

impl InMemoryLocator {
    /// Empty locator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document named after its code
    #[inline]
    #[must_use]
    pub fn with_document(mut self, code: &str, text: impl Into<String>) -> Self {
        self.insert(code, code, text);
        self
    }

    /// Add or replace a document
    pub fn insert(&mut self, code: &str, name: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(
            normalize(code),
            LocatedDocument {
                name: name.into(),
                text: text.into(),
            },
        );
    }

    /// Number of documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl<C: AsRef<str>, T: Into<String>> FromIterator<(C, T)> for InMemoryLocator {
    fn from_iter<I: IntoIterator<Item = (C, T)>>(iter: I) -> Self {
        let mut locator = Self::new();
        for (code, text) in iter {
            let code = code.as_ref();
            locator.insert(code, code, text);
        }
        locator
    }
}

#[async_trait::async_trait]
impl DocumentLocator for InMemoryLocator {
    async fn locate(&self, code: &str) -> Result<Located, LocatorError> {
        Ok(self
            .documents
            .get(&normalize(code))
            .cloned()
            .map_or(Located::NotFound, Located::Found))
    }
}

/// Locator scanning directories for files named after the code
///
/// A file matches when its stem, upper-cased, equals the code or the code
/// with `.` replaced by `_`, optionally followed by a separator and a title
/// (`PR.OP.CL.2862 - Returning Claims.md`). Roots are searched in order;
/// within a root the lexicographically first match wins.
#[derive(Debug, Clone)]
pub struct DirectoryLocator {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl DirectoryLocator {
    /// Extensions accepted by default
    pub const DEFAULT_EXTENSIONS: [&'static str; 3] = ["md", "markdown", "txt"];

    /// Locator over the given search roots
    #[must_use]
    pub fn new<P: Into<PathBuf>>(roots: impl IntoIterator<Item = P>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            extensions: Self::DEFAULT_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        }
    }

    /// Replace accepted extensions (without the dot, case-insensitive)
    #[inline]
    #[must_use]
    pub fn with_extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.into().to_ascii_lowercase())
            .collect();
        self
    }

    /// Search roots
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    async fn search_root(&self, root: &Path, candidates: &[String]) -> Result<Option<PathBuf>, LocatorError> {
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(root = %root.display(), "search root missing");
                return Ok(None);
            }
            Err(source) => {
                return Err(LocatorError::Io {
                    path: root.to_path_buf(),
                    source,
                });
            }
        };

        let mut matches = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| LocatorError::Io {
                path: root.to_path_buf(),
                source,
            })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            if !self.accepts_extension(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem_matches(stem, candidates) {
                matches.push(path);
            }
        }

        matches.sort();
        Ok(matches.into_iter().next())
    }
}

fn stem_matches(stem: &str, candidates: &[String]) -> bool {
    let stem = stem.trim().to_ascii_uppercase();
    candidates.iter().any(|candidate| {
        stem.strip_prefix(candidate.as_str()).is_some_and(|rest| {
            rest.is_empty() || rest.starts_with([' ', '_', '-'])
        })
    })
}

#[async_trait::async_trait]
impl DocumentLocator for DirectoryLocator {
    async fn locate(&self, code: &str) -> Result<Located, LocatorError> {
        let code = normalize(code);
        if code.is_empty() || code.contains(['/', '\\']) {
            return Err(LocatorError::InvalidCode(code));
        }
        let candidates = [code.clone(), code.replace('.', "_")];

        for root in &self.roots {
            let Some(path) = self.search_root(root, &candidates).await? else {
                continue;
            };
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| LocatorError::Io {
                    path: path.clone(),
                    source,
                })?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(code.as_str())
                .to_string();
            tracing::debug!(code = %code, path = %path.display(), "located document");
            return Ok(Located::Found(LocatedDocument { name, text }));
        }

        Ok(Located::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_matching() {
        let candidates = ["PR.OP.CL.2862".to_string(), "PR_OP_CL_2862".to_string()];
        assert!(stem_matches("PR.OP.CL.2862", &candidates));
        assert!(stem_matches("pr_op_cl_2862", &candidates));
        assert!(stem_matches("PR.OP.CL.2862 - Returning Claims", &candidates));
        assert!(!stem_matches("PR.OP.CL.28620", &candidates));
        assert!(!stem_matches("Returning PR.OP.CL.2862", &candidates));
    }

    #[tokio::test]
    async fn in_memory_lookup_ignores_case() {
        let locator = InMemoryLocator::new().with_document("PR.OP.CL.2862", "text");
        let found = locator.locate("pr.op.cl.2862").await.unwrap();
        assert!(matches!(found, Located::Found(doc) if doc.text == "text"));
        assert_eq!(locator.locate("PR.OP.CL.1").await.unwrap(), Located::NotFound);
    }

    #[tokio::test]
    async fn directory_rejects_path_like_codes() {
        let locator = DirectoryLocator::new(["."]);
        assert!(matches!(
            locator.locate("../etc/passwd").await,
            Err(LocatorError::InvalidCode(_))
        ));
    }

    #[tokio::test]
    async fn missing_root_is_not_found() {
        let locator = DirectoryLocator::new(["/definitely/not/here"]);
        assert_eq!(locator.locate("PR.OP.CL.1").await.unwrap(), Located::NotFound);
    }
}
