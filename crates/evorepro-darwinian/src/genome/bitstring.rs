//! Fixed-length bit-string genome
//!
//! Reference [`Genome`] used by the runner and the test suites. Fitness is the
//! classic OneMax count of set bits.

use evorepro_common::{ConfigError, GenomeId};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Genome;
use crate::archive::Fingerprint;

/// Bit-string genome parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitGenomeConfig {
    /// Number of bits per genome
    pub length: usize,
    /// Per-bit flip probability during mutation
    pub mutation_rate: f64,
}

impl BitGenomeConfig {
    pub fn new(length: usize, mutation_rate: f64) -> Result<Self, ConfigError> {
        if length == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "length".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&mutation_rate) {
            return Err(ConfigError::InvalidSetting {
                key: "mutation_rate".to_string(),
                reason: format!("{} is not a probability", mutation_rate),
            });
        }
        Ok(Self {
            length,
            mutation_rate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitGenome {
    genome_id: GenomeId,
    bits: Vec<bool>,
}

impl BitGenome {
    pub fn from_bits(genome_id: GenomeId, bits: Vec<bool>) -> Self {
        Self { genome_id, bits }
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// OneMax fitness: number of set bits
    pub fn ones(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Identity-independent signature of the bit pattern
    pub fn fingerprint(&self) -> Fingerprint {
        let mut packed = vec![0u8; (self.bits.len() + 7) / 8];
        for (i, bit) in self.bits.iter().enumerate() {
            if *bit {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        // Length prefix keeps e.g. "0" and "00" apart
        let mut bytes = (self.bits.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(&packed);
        Fingerprint::of_bytes(&bytes)
    }
}

impl Genome for BitGenome {
    type Config = BitGenomeConfig;

    fn genome_id(&self) -> GenomeId {
        self.genome_id
    }

    fn generate<R: Rng + ?Sized>(config: &Self::Config, genome_id: GenomeId, rng: &mut R) -> Self {
        let bits = (0..config.length).map(|_| rng.gen::<bool>()).collect();
        Self { genome_id, bits }
    }

    fn mutate<R: Rng + ?Sized>(&self, config: &Self::Config, child_id: GenomeId, rng: &mut R) -> Self {
        let mut bits = self.bits.clone();
        let mut flipped = false;
        for bit in bits.iter_mut() {
            if rng.gen_bool(config.mutation_rate) {
                *bit = !*bit;
                flipped = true;
            }
        }
        // A child always differs from its parent in at least one position
        if !flipped && !bits.is_empty() {
            let idx = rng.gen_range(0..bits.len());
            bits[idx] = !bits[idx];
        }
        Self {
            genome_id: child_id,
            bits,
        }
    }
}
