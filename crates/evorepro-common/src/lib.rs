//! # Evorepro Common
//!
//! Shared identifiers, persisted-data stores, and error types for the Evorepro
//! reproduction engine.
//!
//! ## Core Types
//!
//! - [`GenomeId`]: stable identity of a genome within one run
//! - [`GenomeIdAllocator`]: monotonically increasing id source, checkpointed with the run
//! - [`PersistedData`]: string-keyed JSON store that travels with population checkpoints
//! - [`LoggingData`]: per-generation scalar/vector values for external reporters
//!
//! ## Persistence Keys
//!
//! Checkpoint consumers must preserve these keys verbatim:
//!
//! - [`ARCHIVE_KEY`]: the unique reproducer's archive
//! - [`NEXT_GENOME_ID_KEY`]: the genome id allocator

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{CheckpointError, ConfigError, EvoreproError, PopulationError, Result};
pub use types::{
    genome_id::{GenomeId, GenomeIdAllocator},
    logging::{LogValue, LoggingData},
    persisted::PersistedData,
};

/// Evorepro version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Persisted-data key under which the archive of admitted signatures is stored
pub const ARCHIVE_KEY: &str = "unique-reproducer-archive";

/// Persisted-data key under which the genome id allocator is stored
pub const NEXT_GENOME_ID_KEY: &str = "unique-reproducer-next-genome-id";

/// Logging-data metric holding the archive size after each reproduction pass
pub const ARCHIVE_SIZE_METRIC: &str = "UniqueReproducer/number_of_unique_genomes";

/// Logging-data metric holding the number of children admitted in the last pass
pub const CHILDREN_ADMITTED_METRIC: &str = "UniqueReproducer/children_admitted";

/// Logging-data metric holding the number of parents dropped in the last pass
pub const PARENTS_DROPPED_METRIC: &str = "UniqueReproducer/parents_dropped";
