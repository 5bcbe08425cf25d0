//! Content hashing
//!
//! Blake3 digests for revision fingerprints and for deriving document keys
//! when the caller has none.

use std::fmt::{self, Display, Formatter};

/// Length of a derived document key in hex characters
pub const DOCUMENT_KEY_LEN: usize = 12;

/// A 32-byte content hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Blake3 digest of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// First 16 hex characters
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// First [`DOCUMENT_KEY_LEN`] hex characters
    #[inline]
    #[must_use]
    pub fn document_key(&self) -> String {
        hex::encode(&self.0[..DOCUMENT_KEY_LEN / 2])
    }
}

/// Document key derived from raw text
#[must_use]
pub fn document_key_for(text: &str) -> String {
    ContentHash::compute(text.as_bytes()).document_key()
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
