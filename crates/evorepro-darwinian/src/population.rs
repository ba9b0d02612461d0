//! Population state shared between the reproducer, evaluators and reporters
//!
//! Ordered collections are used throughout so that iteration order (and with
//! it the reproducer's draws from its seeded RNG) is identical across runs and
//! across checkpoint restores.

use std::collections::{BTreeMap, BTreeSet};

use evorepro_common::{
    ConfigError, GenomeId, LoggingData, PersistedData, PopulationError, Result,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::genome::Genome;

/// Population sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Target number of concurrently-live genomes
    pub population_size: usize,
}

impl PopulationConfig {
    pub fn new(population_size: usize) -> std::result::Result<Self, ConfigError> {
        if population_size == 0 {
            return Err(ConfigError::InvalidPopulationSize);
        }
        Ok(Self { population_size })
    }
}

/// Live genomes plus the bookkeeping sets that drive one generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "G: Serialize", deserialize = "G: DeserializeOwned"))]
pub struct Population<G> {
    pub config: PopulationConfig,
    /// Index of the current generation, starting at 0
    pub generation: u64,
    pub genomes: BTreeMap<GenomeId, G>,
    /// Genomes awaiting fitness evaluation
    pub to_evaluate: BTreeSet<GenomeId>,
    /// Parents selected to produce one child each this generation
    pub to_reproduce: BTreeSet<GenomeId>,
    /// Fitness of every evaluated live genome
    pub fitness: BTreeMap<GenomeId, f64>,
    /// Component state that must survive checkpoints
    pub persisted_data: PersistedData,
    /// Values for reporters; not checkpointed
    #[serde(skip)]
    pub logging_data: LoggingData,
}

impl<G: Genome> Population<G> {
    pub fn new(config: PopulationConfig) -> Self {
        Self {
            config,
            generation: 0,
            genomes: BTreeMap::new(),
            to_evaluate: BTreeSet::new(),
            to_reproduce: BTreeSet::new(),
            fitness: BTreeMap::new(),
            persisted_data: PersistedData::new(),
            logging_data: LoggingData::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn get(&self, id: &GenomeId) -> Option<&G> {
        self.genomes.get(id)
    }

    /// Add a new genome and queue it for evaluation
    pub fn admit(&mut self, genome: G) -> std::result::Result<GenomeId, PopulationError> {
        let id = genome.genome_id();
        if self.genomes.contains_key(&id) {
            return Err(PopulationError::DuplicateGenome(id));
        }
        self.genomes.insert(id, genome);
        self.to_evaluate.insert(id);
        Ok(id)
    }

    /// Store a fitness value and remove the genome from the evaluation queue
    pub fn record_fitness(&mut self, id: GenomeId, fitness: f64) -> Result<()> {
        if !self.genomes.contains_key(&id) {
            return Err(PopulationError::UnknownGenome(id).into());
        }
        self.to_evaluate.remove(&id);
        self.fitness.insert(id, fitness);
        Ok(())
    }

    /// Mark parents for reproduction in the current generation
    pub fn schedule_reproduction<I>(&mut self, parents: I) -> Result<()>
    where
        I: IntoIterator<Item = GenomeId>,
    {
        for id in parents {
            if !self.genomes.contains_key(&id) {
                return Err(PopulationError::UnknownGenome(id).into());
            }
            self.to_reproduce.insert(id);
        }
        Ok(())
    }

    /// Remove a genome and everything recorded about it
    pub fn remove(&mut self, id: &GenomeId) -> Option<G> {
        self.to_evaluate.remove(id);
        self.to_reproduce.remove(id);
        self.fitness.remove(id);
        self.genomes.remove(id)
    }

    /// Evaluated genome ids, best first; ties broken by ascending id
    pub fn ranked(&self) -> Vec<GenomeId> {
        let mut ranked: Vec<(GenomeId, f64)> =
            self.fitness.iter().map(|(id, f)| (*id, *f)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(id, _)| id).collect()
    }

    /// Move to the next generation, clearing per-generation state
    pub fn advance_generation(&mut self) {
        self.generation += 1;
        self.to_reproduce.clear();
        self.logging_data.clear();
    }
}
