//! Checkpoint storage
//!
//! A checkpoint store is a plain key-value contract: named byte blobs in,
//! named byte blobs out. Population snapshots are encoded as JSON on top of it,
//! carrying the persisted data (archive, genome id allocator) verbatim.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use evorepro_common::{CheckpointError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::genome::Genome;
use crate::population::Population;

/// Snapshot format version written into every checkpoint
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Trait for checkpoint storage backends
pub trait CheckpointStore {
    /// Store a blob, replacing any previous blob under the same key
    fn put(&mut self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Fetch a blob, `None` if nothing is stored under the key
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// All stored keys in ascending order
    fn keys(&self) -> Result<Vec<String>>;
}

/// Envelope written for each population snapshot
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "G: Serialize", deserialize = "G: DeserializeOwned"))]
pub struct Checkpoint<G> {
    pub format_version: u32,
    /// Save time (Unix milliseconds)
    pub saved_at: i64,
    pub population: Population<G>,
}

/// Encode and store a population snapshot
pub fn save_population<G, S>(store: &mut S, key: &str, population: &Population<G>) -> Result<()>
where
    G: Genome + Serialize,
    S: CheckpointStore + ?Sized,
{
    #[derive(Serialize)]
    struct Envelope<'a, G: Serialize> {
        format_version: u32,
        saved_at: i64,
        population: &'a Population<G>,
    }

    let bytes = serde_json::to_vec(&Envelope {
        format_version: CHECKPOINT_FORMAT_VERSION,
        saved_at: chrono::Utc::now().timestamp_millis(),
        population,
    })?;
    store.put(key, bytes)?;
    info!(
        key = %key,
        generation = population.generation,
        genomes = population.len(),
        "Checkpoint saved"
    );
    Ok(())
}

/// Load a population snapshot, `None` if the key is absent
pub fn load_population<G, S>(store: &S, key: &str) -> Result<Option<Population<G>>>
where
    G: Genome + DeserializeOwned,
    S: CheckpointStore + ?Sized,
{
    let Some(bytes) = store.get(key)? else {
        debug!(key = %key, "No checkpoint found");
        return Ok(None);
    };

    let checkpoint: Checkpoint<G> =
        serde_json::from_slice(&bytes).map_err(|e| CheckpointError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
    if checkpoint.format_version != CHECKPOINT_FORMAT_VERSION {
        return Err(CheckpointError::Corrupt {
            key: key.to_string(),
            reason: format!("unsupported format version {}", checkpoint.format_version),
        }
        .into());
    }

    info!(
        key = %key,
        generation = checkpoint.population.generation,
        genomes = checkpoint.population.len(),
        saved_at = checkpoint.saved_at,
        "Checkpoint loaded"
    );
    Ok(Some(checkpoint.population))
}

/// In-memory checkpoint store
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn put(&mut self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), bytes);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Directory-backed checkpoint store
///
/// Each key maps to `<root>/<key>.json`. Writes go to a temporary file first
/// and are renamed into place, so a crash never leaves a half-written blob.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(CheckpointError::InvalidKey(key.to_string()).into());
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn put(&mut self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{Archive, Fingerprint};
    use crate::genome::bitstring::BitGenome;
    use crate::population::PopulationConfig;
    use evorepro_common::{EvoreproError, GenomeId, ARCHIVE_KEY};

    fn sample_population() -> Population<BitGenome> {
        let mut pop = Population::new(PopulationConfig::new(3).unwrap());
        pop.admit(BitGenome::from_bits(GenomeId::new(4), vec![true, false]))
            .unwrap();
        pop.record_fitness(GenomeId::new(4), 1.0).unwrap();
        pop.generation = 2;

        let mut archive = Archive::new();
        archive.record(Fingerprint::new("kept"));
        archive.persist(&mut pop.persisted_data).unwrap();
        pop.logging_data.record("transient", 1.0);
        pop
    }

    #[test]
    fn test_in_memory_store_keeps_persisted_data() {
        let mut store = InMemoryCheckpointStore::new();
        save_population(&mut store, "run", &sample_population()).unwrap();

        let loaded: Population<BitGenome> = load_population(&store, "run").unwrap().unwrap();
        let archive: Archive = loaded.persisted_data.get(ARCHIVE_KEY).unwrap().unwrap();

        assert_eq!(loaded.generation, 2);
        assert_eq!(loaded.fitness.get(&GenomeId::new(4)), Some(&1.0));
        assert_eq!(archive.size(), 1);
        assert!(loaded.logging_data.is_empty());
    }

    #[test]
    fn test_missing_checkpoint_is_none() {
        let store = InMemoryCheckpointStore::new();
        let loaded: Option<Population<BitGenome>> = load_population(&store, "absent").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_checkpoint_reported() {
        let mut store = InMemoryCheckpointStore::new();
        store.put("run", b"{not json".to_vec()).unwrap();

        let err = load_population::<BitGenome, _>(&store, "run").unwrap_err();
        assert!(matches!(
            err,
            EvoreproError::Checkpoint(CheckpointError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_file_store_roundtrip_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCheckpointStore::open(dir.path().join("ckpt")).unwrap();

        save_population(&mut store, "run-a", &sample_population()).unwrap();
        save_population(&mut store, "run-b", &sample_population()).unwrap();

        assert_eq!(store.keys().unwrap(), vec!["run-a", "run-b"]);
        let loaded: Population<BitGenome> = load_population(&store, "run-a").unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCheckpointStore::open(dir.path()).unwrap();

        let err = store.put("../escape", vec![]).unwrap_err();
        assert!(matches!(
            err,
            EvoreproError::Checkpoint(CheckpointError::InvalidKey(_))
        ));
    }
}
