//! OneMax evolution loop over the bit-string genome
//!
//! Each generation: evaluate pending genomes, cull to the target size, select
//! the fittest as parents, reproduce, report, checkpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use evorepro_common::{GenomeId, Result};
use evorepro_darwinian::{
    load_population, save_population, BitGenome, BitGenomeConfig, CheckpointStore,
    FingerprintTest, MetricReporter, Population, PopulationConfig, UniqueReproducer,
    UniqueReproducerConfig,
};
use tracing::info;

use crate::settings::RunnerSettings;

/// Outcome of a (possibly interrupted) run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub generation: u64,
    pub best_fitness: Option<f64>,
    pub archive_size: usize,
    pub population: usize,
    pub resumed: bool,
}

pub struct Evolution<S: CheckpointStore> {
    settings: RunnerSettings,
    reproducer: UniqueReproducer<BitGenome>,
    reporter: MetricReporter,
    store: S,
    stop: Arc<AtomicBool>,
}

impl<S: CheckpointStore> Evolution<S> {
    pub fn new(settings: RunnerSettings, store: S) -> Result<Self> {
        let genome_config = BitGenomeConfig::new(settings.genome_length, settings.mutation_rate)?;
        let config = UniqueReproducerConfig::builder(genome_config)
            .uniqueness_test(FingerprintTest::new(BitGenome::fingerprint))
            .max_retries(settings.max_retries)
            .seed(settings.seed)
            .build()?;

        Ok(Self {
            reporter: MetricReporter::with_prefix(&settings.run_name)?,
            settings,
            reproducer: UniqueReproducer::new(config),
            store,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the loop after the current generation is checkpointed
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Current gauges in the Prometheus text exposition format
    pub fn metrics_text(&self) -> Result<String> {
        self.reporter.encode_text()
    }

    /// Run until the configured generation or until stopped
    pub fn run(&mut self) -> Result<RunSummary> {
        let key = self.settings.run_name.clone();
        let (mut population, resumed) = match load_population::<BitGenome, _>(&self.store, &key)? {
            Some(population) => {
                info!(
                    run = %key,
                    generation = population.generation,
                    "Resuming from checkpoint"
                );
                (population, true)
            }
            None => (
                Population::new(PopulationConfig::new(self.settings.population_size)?),
                false,
            ),
        };

        if !resumed {
            self.reproducer.initialise_population(&mut population)?;
            save_population(&mut self.store, &key, &population)?;
        }

        while population.generation < self.settings.generations {
            if self.stop.load(Ordering::SeqCst) {
                info!(generation = population.generation, "Stop requested");
                break;
            }
            self.step(&mut population)?;
            save_population(&mut self.store, &key, &population)?;
        }

        Ok(RunSummary {
            generation: population.generation,
            best_fitness: population
                .ranked()
                .first()
                .and_then(|id| population.fitness.get(id))
                .copied(),
            archive_size: self.reproducer.archive_size(),
            population: population.len(),
            resumed,
        })
    }

    /// One full generation
    fn step(&mut self, population: &mut Population<BitGenome>) -> Result<()> {
        evaluate(population)?;
        cull(population, self.settings.population_size);

        let parents: Vec<GenomeId> = population
            .ranked()
            .into_iter()
            .take(self.settings.parents_per_generation)
            .collect();
        population.schedule_reproduction(parents)?;

        self.reproducer.reproduce(population)?;
        self.reporter.report(population);
        population.advance_generation();
        Ok(())
    }
}

/// OneMax fitness for every genome awaiting evaluation
fn evaluate(population: &mut Population<BitGenome>) -> Result<()> {
    let pending: Vec<(GenomeId, f64)> = population
        .to_evaluate
        .iter()
        .filter_map(|id| population.get(id).map(|g| (*id, g.ones() as f64)))
        .collect();
    for (id, fitness) in pending {
        population.record_fitness(id, fitness)?;
    }
    Ok(())
}

/// Truncation survivor selection
fn cull(population: &mut Population<BitGenome>, size: usize) {
    for id in population.ranked().into_iter().skip(size) {
        population.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evorepro_darwinian::InMemoryCheckpointStore;

    impl<S: CheckpointStore> Evolution<S> {
        fn into_store(self) -> S {
            self.store
        }
    }

    fn settings(generations: u64) -> RunnerSettings {
        RunnerSettings {
            run_name: "test-run".to_string(),
            population_size: 8,
            parents_per_generation: 4,
            generations,
            genome_length: 32,
            mutation_rate: 0.05,
            max_retries: 5,
            seed: 11,
            ..Default::default()
        }
    }

    fn final_population(store: &InMemoryCheckpointStore) -> Population<BitGenome> {
        load_population(store, "test-run").unwrap().unwrap()
    }

    #[test]
    fn test_fresh_run_reaches_target_generation() {
        let mut evolution = Evolution::new(settings(3), InMemoryCheckpointStore::new()).unwrap();
        let summary = evolution.run().unwrap();

        assert_eq!(summary.generation, 3);
        assert!(!summary.resumed);
        assert!(summary.archive_size >= 8);
        assert!(summary.best_fitness.is_some());

        let metrics = evolution.metrics_text().unwrap();
        assert!(metrics.contains("evorepro_generation{run=\"test-run\"} 2"));
    }

    #[test]
    fn test_resumed_run_matches_uninterrupted_run() {
        let mut straight = Evolution::new(settings(4), InMemoryCheckpointStore::new()).unwrap();
        straight.run().unwrap();
        let expected = final_population(&straight.into_store());

        let mut first = Evolution::new(settings(2), InMemoryCheckpointStore::new()).unwrap();
        first.run().unwrap();
        let mut second = Evolution::new(settings(4), first.into_store()).unwrap();
        let summary = second.run().unwrap();
        let resumed = final_population(&second.into_store());

        assert!(summary.resumed);
        assert_eq!(resumed.generation, expected.generation);
        assert_eq!(resumed.genomes, expected.genomes);
        assert_eq!(resumed.persisted_data, expected.persisted_data);
    }

    #[test]
    fn test_stop_flag_halts_before_next_generation() {
        let mut evolution = Evolution::new(settings(10), InMemoryCheckpointStore::new()).unwrap();
        evolution.stop_handle().store(true, Ordering::SeqCst);

        let summary = evolution.run().unwrap();

        assert_eq!(summary.generation, 0);
        assert_eq!(summary.population, 8);
    }

    #[test]
    fn test_invalid_settings_fail_at_construction() {
        let mut bad = settings(1);
        bad.max_retries = -2;
        assert!(Evolution::new(bad, InMemoryCheckpointStore::new()).is_err());
    }
}
