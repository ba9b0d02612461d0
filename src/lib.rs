//! # Evorepro
//!
//! Uniqueness-constrained reproduction engine for population-based
//! evolutionary optimisation.
//!
//! - [`common`]: genome ids, persisted/logging data, errors
//! - [`darwinian`]: archive, uniqueness tests, retry policy, unique reproducer,
//!   checkpoints, telemetry

pub use evorepro_common as common;
pub use evorepro_darwinian as darwinian;

pub use evorepro_common::{EvoreproError, GenomeId, Result};
pub use evorepro_darwinian::{
    Archive, Fingerprint, Genome, Population, PopulationConfig, UniqueReproducer,
    UniqueReproducerConfig, UniquenessTest, Verdict,
};
