//! # Darwinian
//!
//! Uniqueness-constrained population initialisation and reproduction for
//! Evorepro.
//!
//! ## Reproduction Policy
//!
//! ```text
//! mutate ──reject──▶ re-mutate (≤ R) ──exhausted──▶ regenerate (≤ R) ──exhausted──▶ drop
//!    │                    │                              │
//!    └──────accept────────┴──────────────accept──────────┴──▶ admit
//! ```
//!
//! A child is admitted only when the uniqueness test accepted it. Dropped
//! parents shrink the generation; nothing is retried across generations.
//!
//! ## Initialisation Policy
//!
//! Every slot is filled: a fresh genome is regenerated up to `R` times while
//! the uniqueness test rejects it, and the last one is admitted regardless.
//!
//! ## Persistence
//!
//! The [`Archive`] of admitted signatures and the genome id allocator are
//! mirrored into the population's persisted data under
//! [`evorepro_common::ARCHIVE_KEY`] and [`evorepro_common::NEXT_GENOME_ID_KEY`],
//! so a checkpointed population resumes with neither entries lost nor ids reused.

pub mod archive;
pub mod checkpoint;
pub mod genome;
pub mod population;
pub mod reproducer;
pub mod telemetry;
pub mod uniqueness;

pub use archive::{Archive, Fingerprint};
pub use checkpoint::{
    load_population, save_population, CheckpointStore, FileCheckpointStore,
    InMemoryCheckpointStore,
};
pub use genome::{bitstring::BitGenome, bitstring::BitGenomeConfig, Genome};
pub use population::{Population, PopulationConfig};
pub use reproducer::{
    InitialisationReport, ReproductionReport, RetryPhase, RetryPolicy, UniqueReproducer,
    UniqueReproducerConfig, UniqueReproducerConfigBuilder,
};
pub use telemetry::{GenerationGauges, Metric, MetricReporter};
pub use uniqueness::{FingerprintTest, UniquenessTest, Verdict};

/// Default retry budget shared by the mutate and regenerate loops
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default seed for the reproducer's random number generator
pub const DEFAULT_SEED: u64 = 42;
