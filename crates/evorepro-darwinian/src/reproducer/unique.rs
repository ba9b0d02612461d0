//! UniqueReproducer - uniqueness-constrained initialisation and reproduction

use evorepro_common::{
    EvoreproError, GenomeId, GenomeIdAllocator, PopulationError, Result, ARCHIVE_KEY,
    ARCHIVE_SIZE_METRIC, CHILDREN_ADMITTED_METRIC, NEXT_GENOME_ID_KEY, PARENTS_DROPPED_METRIC,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, warn};

use super::config::UniqueReproducerConfig;
use super::retry::{RetryPhase, RetryPolicy};
use crate::archive::Archive;
use crate::genome::Genome;
use crate::population::Population;
use crate::uniqueness::Verdict;

// Keep initialisation and reproduction draws apart within one generation
const INITIALISATION_STREAM: u64 = 0x1A17;
const REPRODUCTION_STREAM: u64 = 0x5E9D;

const GENERATION_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
const ALLOCATOR_MIX: u64 = 0xBF58_476D_1CE4_E5B9;

/// Summary of one initialisation call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialisationReport {
    /// Slots filled by the generic path
    pub filled: usize,
    /// Slots whose genome was admitted after the retry budget ran out
    pub forced: usize,
    /// True when a custom initialisation routine handled the call
    pub delegated: bool,
    pub archive_size: usize,
}

/// Summary of one reproduction call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReproductionReport {
    /// Children admitted, in parent order
    pub admitted: Vec<GenomeId>,
    /// Parents whose retry budgets were exhausted
    pub dropped: Vec<GenomeId>,
    pub archive_size: usize,
}

/// Runtime state bound on first use against a population
#[derive(Debug)]
struct Attached {
    archive: Archive,
    ids: GenomeIdAllocator,
}

/// Produces archive-unique genomes for initialisation and each generation
pub struct UniqueReproducer<G: Genome> {
    config: UniqueReproducerConfig<G>,
    state: Option<Attached>,
}

impl<G: Genome> UniqueReproducer<G> {
    pub fn new(config: UniqueReproducerConfig<G>) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &UniqueReproducerConfig<G> {
        &self.config
    }

    /// Bind to the archive and id allocator stored in the population, creating
    /// and registering them on a fresh run
    ///
    /// A reproducer is bound to one population for its whole lifetime. Later
    /// calls keep the in-memory archive, and fail with
    /// [`PopulationError::ForeignPopulation`] when the population's persisted
    /// state cannot have been written by this reproducer.
    pub fn attach(&mut self, population: &mut Population<G>) -> Result<()> {
        if let Some(state) = &self.state {
            return verify_binding(state, population);
        }

        let archive = Archive::attach_or_create(&mut population.persisted_data)?;
        let mut ids = population
            .persisted_data
            .get::<GenomeIdAllocator>(NEXT_GENOME_ID_KEY)?
            .unwrap_or_default();
        reserve_live_ids(&mut ids, population)?;
        population.persisted_data.insert(NEXT_GENOME_ID_KEY, &ids)?;

        info!(
            archive_size = archive.size(),
            next_genome_id = %ids.peek(),
            generation = population.generation,
            "UniqueReproducer attached"
        );
        self.state = Some(Attached { archive, ids });
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.state.is_some()
    }

    /// Archive of admitted signatures, once attached
    pub fn archive(&self) -> Option<&Archive> {
        self.state.as_ref().map(|s| &s.archive)
    }

    /// Current archive size; zero before attaching
    pub fn archive_size(&self) -> usize {
        self.archive().map_or(0, Archive::size)
    }

    pub fn archive_mut(&mut self) -> Result<&mut Archive> {
        Ok(&mut self.attached_mut()?.archive)
    }

    /// Allocate a fresh genome id
    pub fn next_genome_id(&mut self) -> Result<GenomeId> {
        Ok(self.attached_mut()?.ids.next_id()?)
    }

    /// Random number generator for the given generation
    ///
    /// Derived from the configured seed, the generation index and the id
    /// allocator position. The allocator is checkpointed, so a run resumed
    /// from a checkpoint replays the same draws, while repeated calls within
    /// one generation draw fresh candidates.
    pub fn rng_for(&self, generation: u64) -> StdRng {
        self.seeded(generation, REPRODUCTION_STREAM)
    }

    fn seeded(&self, generation: u64, stream: u64) -> StdRng {
        let position = self.state.as_ref().map_or(0, |s| s.ids.peek().value());
        let mixed = self
            .config
            .seed()
            .wrapping_add(generation.wrapping_mul(GENERATION_MIX))
            .wrapping_add(position.wrapping_mul(ALLOCATOR_MIX))
            ^ stream;
        StdRng::seed_from_u64(mixed)
    }

    /// Run the uniqueness test on a candidate and apply its admission
    ///
    /// Returns whether the candidate was accepted. The archive only changes
    /// when the verdict is [`Verdict::Admit`].
    pub fn check(&mut self, candidate: &G, population: &Population<G>) -> Result<bool> {
        let verdict = self.judge(candidate, population)?;
        let accepted = verdict.is_accepted();
        self.apply(verdict)?;
        Ok(accepted)
    }

    /// Fill the population up to its target size
    ///
    /// Genomes already awaiting evaluation count towards the target. Every
    /// slot is filled: after `max_retries` rejected regenerations the last
    /// genome is admitted anyway.
    pub fn initialise_population(
        &mut self,
        population: &mut Population<G>,
    ) -> Result<InitialisationReport> {
        self.attach(population)?;

        if let Some(initialise) = self.config.initialisation().cloned() {
            debug!("Delegating initialisation to custom routine");
            initialise(self, population)?;
            // The routine may admit genomes under ids of its own choosing
            reserve_live_ids(&mut self.attached_mut()?.ids, population)?;
            self.sync(population)?;
            return Ok(InitialisationReport {
                delegated: true,
                archive_size: self.archive_size(),
                ..Default::default()
            });
        }

        reserve_live_ids(&mut self.attached_mut()?.ids, population)?;
        let to_generate = population
            .config
            .population_size
            .saturating_sub(population.to_evaluate.len());
        let mut rng = self.seeded(population.generation, INITIALISATION_STREAM);
        let mut report = InitialisationReport::default();

        for _ in 0..to_generate {
            let genome_id = self.next_genome_id()?;
            let mut genome = G::generate(self.config.genome_config(), genome_id, &mut rng);
            let mut policy = RetryPolicy::for_initialisation(self.config.max_retries());

            let verdict = loop {
                let verdict = self.judge(&genome, population)?;
                match policy.record(verdict.is_accepted()) {
                    RetryPhase::Regenerate => {
                        genome = G::generate(self.config.genome_config(), genome_id, &mut rng);
                    }
                    RetryPhase::Accepted => break verdict,
                    RetryPhase::Exhausted => {
                        warn!(
                            genome_id = %genome_id,
                            retries = policy.regenerate_retries(),
                            "Admitting non-unique genome to fill initial population"
                        );
                        report.forced += 1;
                        break verdict;
                    }
                    RetryPhase::Mutate => unreachable!("initialisation never mutates"),
                }
            };

            self.admit(population, genome, verdict)?;
            report.filled += 1;
        }

        self.sync(population)?;
        report.archive_size = self.archive_size();
        info!(
            filled = report.filled,
            forced = report.forced,
            archive_size = report.archive_size,
            population = population.len(),
            "Population initialised"
        );
        Ok(report)
    }

    /// Produce at most one archive-unique child per scheduled parent
    ///
    /// Parents are visited in ascending id order. A parent whose mutate and
    /// regenerate budgets are both exhausted contributes no child; this is not
    /// an error.
    pub fn reproduce(&mut self, population: &mut Population<G>) -> Result<ReproductionReport> {
        self.attach(population)?;

        // Validate every parent up front so a bad schedule leaves no partial state
        if let Some(missing) = population
            .to_reproduce
            .iter()
            .find(|id| !population.genomes.contains_key(*id))
        {
            return Err(PopulationError::UnknownParent(*missing).into());
        }
        reserve_live_ids(&mut self.attached_mut()?.ids, population)?;

        let parents: Vec<GenomeId> = population.to_reproduce.iter().copied().collect();
        let mut rng = self.rng_for(population.generation);
        let mut report = ReproductionReport::default();

        let mut outcome = Ok(());
        for parent_id in parents {
            match self.reproduce_parent(population, parent_id, &mut rng) {
                Ok(Some(child_id)) => report.admitted.push(child_id),
                Ok(None) => report.dropped.push(parent_id),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }

        // Children admitted before a failure are checkpointed with their signatures
        self.sync(population)?;
        outcome?;

        report.archive_size = self.archive_size();
        population
            .logging_data
            .record(ARCHIVE_SIZE_METRIC, report.archive_size);
        population
            .logging_data
            .record(CHILDREN_ADMITTED_METRIC, report.admitted.len());
        population
            .logging_data
            .record(PARENTS_DROPPED_METRIC, report.dropped.len());

        info!(
            generation = population.generation,
            admitted = report.admitted.len(),
            dropped = report.dropped.len(),
            archive_size = report.archive_size,
            "Reproduction complete"
        );
        Ok(report)
    }

    /// Mirror the archive and id allocator into the population's persisted data
    pub fn sync(&self, population: &mut Population<G>) -> Result<()> {
        let state = self.attached()?;
        state.archive.persist(&mut population.persisted_data)?;
        population
            .persisted_data
            .insert(NEXT_GENOME_ID_KEY, &state.ids)?;
        Ok(())
    }

    /// Run the retry policy for one parent; `None` when its budgets ran out
    fn reproduce_parent(
        &mut self,
        population: &mut Population<G>,
        parent_id: GenomeId,
        rng: &mut StdRng,
    ) -> Result<Option<GenomeId>> {
        let parent = population
            .get(&parent_id)
            .cloned()
            .ok_or(PopulationError::UnknownParent(parent_id))?;
        let child_id = self.next_genome_id()?;
        if population.genomes.contains_key(&child_id) {
            return Err(PopulationError::DuplicateGenome(child_id).into());
        }

        let mut child = parent.mutate(self.config.genome_config(), child_id, rng);
        let mut policy = RetryPolicy::for_reproduction(self.config.max_retries());

        let verdict = loop {
            let verdict = self.judge(&child, population)?;
            let genome_config = self.config.genome_config();
            match policy.record(verdict.is_accepted()) {
                RetryPhase::Mutate => child = parent.mutate(genome_config, child_id, rng),
                RetryPhase::Regenerate => child = G::generate(genome_config, child_id, rng),
                _ => break verdict,
            }
        };

        if policy.phase() != RetryPhase::Accepted {
            debug!(
                parent = %parent_id,
                max_retries = self.config.max_retries(),
                "Retry budget exhausted, parent dropped for this generation"
            );
            return Ok(None);
        }

        self.admit(population, child, verdict)?;
        debug!(
            parent = %parent_id,
            child = %child_id,
            mutate_retries = policy.mutate_retries(),
            regenerate_retries = policy.regenerate_retries(),
            "Child admitted"
        );
        Ok(Some(child_id))
    }

    fn judge(&self, candidate: &G, population: &Population<G>) -> Result<Verdict> {
        let state = self.attached()?;
        Ok(self
            .config
            .uniqueness_test()
            .test(&state.archive, candidate, population))
    }

    fn apply(&mut self, verdict: Verdict) -> Result<()> {
        if let Verdict::Admit(fingerprint) = verdict {
            self.archive_mut()?.record(fingerprint);
        }
        Ok(())
    }

    /// Admit a genome, then record the signature its verdict carries
    ///
    /// The archive never holds a signature for a genome that is not live.
    fn admit(&mut self, population: &mut Population<G>, genome: G, verdict: Verdict) -> Result<()> {
        population.admit(genome)?;
        self.apply(verdict)
    }

    fn attached(&self) -> Result<&Attached> {
        self.state
            .as_ref()
            .ok_or_else(|| EvoreproError::Internal("UniqueReproducer is not attached".into()))
    }

    fn attached_mut(&mut self) -> Result<&mut Attached> {
        self.state
            .as_mut()
            .ok_or_else(|| EvoreproError::Internal("UniqueReproducer is not attached".into()))
    }
}

/// Keep the allocator ahead of every live genome id
fn reserve_live_ids<G>(ids: &mut GenomeIdAllocator, population: &Population<G>) -> Result<()> {
    if let Some(last) = population.genomes.keys().next_back() {
        ids.reserve_through(*last)?;
    }
    Ok(())
}

// The in-memory archive and allocator only ever run ahead of what was last
// synced into the bound population.
fn verify_binding<G>(state: &Attached, population: &Population<G>) -> Result<()> {
    let archive = population.persisted_data.get::<Archive>(ARCHIVE_KEY)?;
    let ids = population
        .persisted_data
        .get::<GenomeIdAllocator>(NEXT_GENOME_ID_KEY)?;
    let bound = match (archive, ids) {
        (Some(archive), Some(ids)) => {
            state.archive.is_superset_of(&archive) && ids.peek() <= state.ids.peek()
        }
        _ => false,
    };
    if bound {
        Ok(())
    } else {
        Err(PopulationError::ForeignPopulation.into())
    }
}
