//! Genome contract
//!
//! The reproducer never looks inside a genome. It only needs to create fresh
//! ones, derive children from parents, and read their identity.

pub mod bitstring;

use evorepro_common::GenomeId;
use rand::Rng;

/// A candidate solution with a stable identity
pub trait Genome: Clone + Send + Sync + 'static {
    /// Parameters shared by every genome of this kind
    type Config: Send + Sync;

    fn genome_id(&self) -> GenomeId;

    /// Build a fresh random genome with the given identity
    fn generate<R: Rng + ?Sized>(config: &Self::Config, genome_id: GenomeId, rng: &mut R) -> Self;

    /// Derive a perturbed child with identity `child_id`
    ///
    /// Must leave `self` untouched: the reproducer re-mutates the same parent
    /// when a child is rejected.
    fn mutate<R: Rng + ?Sized>(&self, config: &Self::Config, child_id: GenomeId, rng: &mut R) -> Self;
}
