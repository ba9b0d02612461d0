//! Archive of admitted genome signatures
//!
//! The archive is the single source of truth for "already seen". It only ever
//! grows: there is no removal API. Which signature to record is decided by the
//! uniqueness test; the archive itself never validates anything.

use std::collections::BTreeSet;

use evorepro_common::{PersistedData, Result, ARCHIVE_KEY};
use serde::{Deserialize, Serialize};

/// Opaque, comparable signature of a genome
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Use an arbitrary caller-chosen signature
    pub fn new(signature: impl Into<String>) -> Self {
        Self(signature.into())
    }

    /// BLAKE3 digest of raw bytes, hex encoded
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(blake3::hash(bytes).as_bytes()))
    }

    /// BLAKE3 digest of a value's JSON encoding
    ///
    /// Only stable when the value's serialization is canonical (no hash maps).
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::of_bytes(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = self
            .0
            .char_indices()
            .nth(16)
            .map_or(self.0.len(), |(idx, _)| idx);
        f.write_str(&self.0[..end])
    }
}

/// Set of signatures admitted so far in this run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Archive {
    entries: BTreeSet<Fingerprint>,
}

impl Archive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the archive stored in `data`, or create and register an empty one
    ///
    /// A missing key is not an error: it marks a fresh run. A present but
    /// undecodable entry is reported rather than silently replaced.
    pub fn attach_or_create(data: &mut PersistedData) -> Result<Self> {
        match data.get::<Archive>(ARCHIVE_KEY)? {
            Some(archive) => Ok(archive),
            None => {
                let archive = Archive::new();
                data.insert(ARCHIVE_KEY, &archive)?;
                Ok(archive)
            }
        }
    }

    /// Write the current contents back under the archive key
    pub fn persist(&self, data: &mut PersistedData) -> Result<()> {
        data.insert(ARCHIVE_KEY, self)
    }

    /// Number of recorded signatures
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains(fingerprint)
    }

    /// Record a signature. Returns `false` if it was already present.
    pub fn record(&mut self, fingerprint: Fingerprint) -> bool {
        self.entries.insert(fingerprint)
    }

    /// True when every entry of `other` is also recorded here
    pub fn is_superset_of(&self, other: &Archive) -> bool {
        self.entries.is_superset(&other.entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fingerprint> {
        self.entries.iter()
    }
}
