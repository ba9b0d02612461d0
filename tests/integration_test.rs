//! Integration Tests for Evorepro
//!
//! This module tests the full reproduction cycle:
//! - Fresh-run initialisation and archive registration
//! - Checkpoint save/resume of the archive and genome ids
//! - Reproduction fallback chain under restrictive uniqueness tests
//! - Metric reporting after reproduction

use evorepro::common::{GenomeId, ARCHIVE_KEY, ARCHIVE_SIZE_METRIC};
use evorepro::darwinian::{
    checkpoint::{load_population, save_population},
    Archive, BitGenome, BitGenomeConfig, Fingerprint, FingerprintTest, InMemoryCheckpointStore,
    MetricReporter, Population, PopulationConfig, UniqueReproducer, UniqueReproducerConfig,
    Verdict,
};
use evorepro::Genome;

fn genome_config() -> BitGenomeConfig {
    BitGenomeConfig::new(32, 0.05).unwrap()
}

/// Accepts genomes with an even id, recording the id as signature
fn even_ids(_: &Archive, genome: &BitGenome, _: &Population<BitGenome>) -> Verdict {
    let id = genome.genome_id();
    if id.value() % 2 == 0 {
        Verdict::Admit(Fingerprint::new(id.to_string()))
    } else {
        Verdict::Reject
    }
}

fn even_id_reproducer() -> UniqueReproducer<BitGenome> {
    let config = UniqueReproducerConfig::builder(genome_config())
        .uniqueness_test(even_ids)
        .max_retries(3)
        .build()
        .unwrap();
    UniqueReproducer::new(config)
}

fn fingerprint_reproducer(seed: u64) -> UniqueReproducer<BitGenome> {
    let config = UniqueReproducerConfig::builder(genome_config())
        .uniqueness_test(FingerprintTest::new(BitGenome::fingerprint))
        .max_retries(5)
        .seed(seed)
        .build()
        .unwrap();
    UniqueReproducer::new(config)
}

#[cfg(test)]
mod initialisation_tests {
    use super::*;

    /// Test: population_size=5 with an even-id test still fills every slot
    #[test]
    fn test_even_id_scenario_fills_population() {
        let mut population = Population::new(PopulationConfig::new(5).unwrap());
        let mut reproducer = even_id_reproducer();

        let report = reproducer.initialise_population(&mut population).unwrap();

        assert_eq!(population.len(), 5);
        assert_eq!(population.to_evaluate.len(), 5);
        // Ids 0, 2 and 4 pass; 1 and 3 are admitted after exhausting retries
        assert_eq!(report.forced, 2);
        assert_eq!(reproducer.archive_size(), 3);
    }

    /// Test: resuming against the same persisted archive never resets it
    #[test]
    fn test_even_id_scenario_survives_resume() {
        let mut store = InMemoryCheckpointStore::new();
        let mut population = Population::new(PopulationConfig::new(5).unwrap());
        even_id_reproducer()
            .initialise_population(&mut population)
            .unwrap();
        save_population(&mut store, "scenario", &population).unwrap();

        for _ in 0..2 {
            let mut resumed: Population<BitGenome> =
                load_population(&store, "scenario").unwrap().unwrap();
            let mut reproducer = even_id_reproducer();

            reproducer.attach(&mut resumed).unwrap();
            assert_eq!(reproducer.archive_size(), 3);

            // Every slot is already pending evaluation, nothing new is generated
            let report = reproducer.initialise_population(&mut resumed).unwrap();
            assert_eq!(report.filled, 0);
            assert_eq!(reproducer.archive_size(), 3);
            assert_eq!(resumed.len(), 5);

            save_population(&mut store, "scenario", &resumed).unwrap();
        }
    }

    /// Test: a fresh run registers the archive under the fixed key
    #[test]
    fn test_fresh_run_registers_archive_key() {
        let mut population = Population::new(PopulationConfig::new(3).unwrap());
        let mut reproducer = fingerprint_reproducer(1);

        reproducer.attach(&mut population).unwrap();

        assert!(population.persisted_data.contains_key(ARCHIVE_KEY));
        assert_eq!(reproducer.archive_size(), 0);
    }
}

#[cfg(test)]
mod checkpoint_resume_tests {
    use super::*;

    /// Test: an archive of size k is intact immediately after attach
    #[test]
    fn test_resume_identity() {
        let mut population = Population::new(PopulationConfig::new(7).unwrap());
        let mut reproducer = fingerprint_reproducer(3);
        reproducer.initialise_population(&mut population).unwrap();
        let k = reproducer.archive_size();

        let mut store = InMemoryCheckpointStore::new();
        save_population(&mut store, "run", &population).unwrap();
        let mut resumed: Population<BitGenome> = load_population(&store, "run").unwrap().unwrap();

        let mut fresh = fingerprint_reproducer(3);
        fresh.attach(&mut resumed).unwrap();

        assert_eq!(fresh.archive_size(), k);
    }

    /// Test: genome ids keep increasing across a resume
    #[test]
    fn test_resume_does_not_reuse_ids() {
        let mut population = Population::new(PopulationConfig::new(4).unwrap());
        let mut reproducer = fingerprint_reproducer(5);
        reproducer.initialise_population(&mut population).unwrap();
        let highest_before = *population.genomes.keys().next_back().unwrap();

        let mut store = InMemoryCheckpointStore::new();
        save_population(&mut store, "run", &population).unwrap();
        let mut resumed: Population<BitGenome> = load_population(&store, "run").unwrap().unwrap();
        let parents: Vec<GenomeId> = resumed.genomes.keys().copied().collect();
        resumed.schedule_reproduction(parents).unwrap();

        let report = fingerprint_reproducer(5).reproduce(&mut resumed).unwrap();

        assert!(report.admitted.iter().all(|child| *child > highest_before));
    }

    /// Test: archive entries admitted before a checkpoint still block duplicates
    #[test]
    fn test_resumed_archive_rejects_known_genomes() {
        let mut population = Population::new(PopulationConfig::new(2).unwrap());
        let mut reproducer = fingerprint_reproducer(9);
        reproducer.initialise_population(&mut population).unwrap();
        let known = population.genomes.values().next().unwrap().clone();

        let mut store = InMemoryCheckpointStore::new();
        save_population(&mut store, "run", &population).unwrap();
        let mut resumed: Population<BitGenome> = load_population(&store, "run").unwrap().unwrap();

        let mut fresh = fingerprint_reproducer(9);
        fresh.attach(&mut resumed).unwrap();
        let twin = BitGenome::from_bits(GenomeId::new(10_000), known.bits().to_vec());

        assert!(!fresh.check(&twin, &resumed).unwrap());
    }
}

#[cfg(test)]
mod reproduction_tests {
    use super::*;

    /// Test: a saturated neighbourhood falls back to regeneration
    #[test]
    fn test_regeneration_fallback_admits_child() {
        // Reject every candidate that shares the parent's bit count
        let config = UniqueReproducerConfig::builder(BitGenomeConfig::new(16, 0.0).unwrap())
            .uniqueness_test(|_: &Archive, g: &BitGenome, _: &Population<BitGenome>| {
                Verdict::from(g.ones() != 15 && g.ones() != 16)
            })
            .max_retries(50)
            .build()
            .unwrap();
        let mut reproducer = UniqueReproducer::new(config);
        let mut population = Population::new(PopulationConfig::new(1).unwrap());
        population
            .admit(BitGenome::from_bits(GenomeId::new(0), vec![true; 16]))
            .unwrap();
        population.schedule_reproduction([GenomeId::new(0)]).unwrap();

        // Mutation of an all-ones parent at rate 0 flips exactly one bit (15 ones)
        let report = reproducer.reproduce(&mut population).unwrap();

        assert_eq!(report.admitted.len(), 1);
        let child = population.get(&report.admitted[0]).unwrap();
        assert!(child.ones() < 15);
    }

    /// Test: archive size is published for reporters after reproduction
    #[test]
    fn test_archive_size_reported() {
        let mut population = Population::new(PopulationConfig::new(4).unwrap());
        let mut reproducer = fingerprint_reproducer(2);
        reproducer.initialise_population(&mut population).unwrap();
        let parents: Vec<GenomeId> = population.genomes.keys().copied().collect();
        population.schedule_reproduction(parents).unwrap();

        reproducer.reproduce(&mut population).unwrap();
        let reporter = MetricReporter::new().unwrap();
        let metrics = reporter.report(&population);

        let reported = metrics
            .iter()
            .find(|m| m.name == ARCHIVE_SIZE_METRIC)
            .map(|m| m.value);
        assert_eq!(reported, Some(reproducer.archive_size() as f64));
        assert_eq!(
            reporter.gauges().archive_size.get(),
            reproducer.archive_size() as i64
        );
    }
}
