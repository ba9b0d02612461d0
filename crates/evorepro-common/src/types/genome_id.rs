//! GenomeId - stable identity for every genome in a run
//!
//! Ids are handed out by a [`GenomeIdAllocator`] that is checkpointed together
//! with the population, so a resumed run never reuses an id.

use serde::{Deserialize, Serialize};

use crate::error::PopulationError;

/// Stable genome identity
///
/// Ordering follows the numeric value, which is also the order in which
/// parents are visited during reproduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenomeId(u64);

impl GenomeId {
    /// Wrap a raw id value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw id value
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GenomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "genome#{}", self.0)
    }
}

impl From<u64> for GenomeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Monotonic source of fresh genome ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeIdAllocator {
    next: u64,
}

impl GenomeIdAllocator {
    /// Create an allocator starting at id 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator whose first id is `next`
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Hand out the next id
    ///
    /// `u64::MAX` is never handed out; it marks the end of the id space.
    pub fn next_id(&mut self) -> Result<GenomeId, PopulationError> {
        let id = GenomeId(self.next);
        self.next = self
            .next
            .checked_add(1)
            .ok_or(PopulationError::IdSpaceExhausted)?;
        Ok(id)
    }

    /// Id that the next call to [`next_id`](Self::next_id) will return
    pub fn peek(&self) -> GenomeId {
        GenomeId(self.next)
    }

    /// Make sure ids up to and including `id` are never handed out
    ///
    /// Used when attaching to a population whose genomes were created outside
    /// this allocator.
    pub fn reserve_through(&mut self, id: GenomeId) -> Result<(), PopulationError> {
        if id.0 >= self.next {
            self.next = id
                .0
                .checked_add(1)
                .ok_or(PopulationError::IdSpaceExhausted)?;
        }
        Ok(())
    }
}
