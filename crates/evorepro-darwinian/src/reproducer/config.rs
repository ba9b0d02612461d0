//! Unique reproducer configuration
//!
//! Built through [`UniqueReproducerConfigBuilder`], which validates eagerly:
//! a missing uniqueness test or a negative retry budget fails at `build()`,
//! never at first use.

use std::sync::Arc;

use evorepro_common::{ConfigError, Result};

use super::unique::UniqueReproducer;
use crate::genome::Genome;
use crate::population::Population;
use crate::uniqueness::UniquenessTest;
use crate::{DEFAULT_MAX_RETRIES, DEFAULT_SEED};

/// Caller-supplied initialisation routine replacing the generic retry loop
pub type InitialisationFn<G> =
    Arc<dyn Fn(&mut UniqueReproducer<G>, &mut Population<G>) -> Result<()> + Send + Sync>;

pub struct UniqueReproducerConfig<G: Genome> {
    genome_config: G::Config,
    uniqueness_test: Box<dyn UniquenessTest<G>>,
    max_retries: u32,
    initialisation: Option<InitialisationFn<G>>,
    seed: u64,
}

impl<G: Genome> UniqueReproducerConfig<G> {
    pub fn builder(genome_config: G::Config) -> UniqueReproducerConfigBuilder<G> {
        UniqueReproducerConfigBuilder {
            genome_config,
            uniqueness_test: None,
            max_retries: i64::from(DEFAULT_MAX_RETRIES),
            initialisation: None,
            seed: DEFAULT_SEED,
        }
    }

    pub fn genome_config(&self) -> &G::Config {
        &self.genome_config
    }

    pub fn uniqueness_test(&self) -> &dyn UniquenessTest<G> {
        self.uniqueness_test.as_ref()
    }

    /// Budget shared by the mutate and regenerate loops
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn initialisation(&self) -> Option<&InitialisationFn<G>> {
        self.initialisation.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl<G: Genome> std::fmt::Debug for UniqueReproducerConfig<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueReproducerConfig")
            .field("max_retries", &self.max_retries)
            .field("custom_initialisation", &self.initialisation.is_some())
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

pub struct UniqueReproducerConfigBuilder<G: Genome> {
    genome_config: G::Config,
    uniqueness_test: Option<Box<dyn UniquenessTest<G>>>,
    max_retries: i64,
    initialisation: Option<InitialisationFn<G>>,
    seed: u64,
}

impl<G: Genome> UniqueReproducerConfigBuilder<G> {
    pub fn uniqueness_test(mut self, test: impl UniquenessTest<G> + 'static) -> Self {
        self.uniqueness_test = Some(Box::new(test));
        self
    }

    /// Retry budget; signed so values from untyped sources can be validated
    pub fn max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn initialisation<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut UniqueReproducer<G>, &mut Population<G>) -> Result<()> + Send + Sync + 'static,
    {
        self.initialisation = Some(Arc::new(f));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> std::result::Result<UniqueReproducerConfig<G>, ConfigError> {
        if self.max_retries < 0 {
            return Err(ConfigError::InvalidMaxRetries(self.max_retries));
        }
        let max_retries = u32::try_from(self.max_retries)
            .map_err(|_| ConfigError::MaxRetriesOverflow(self.max_retries))?;
        let uniqueness_test = self
            .uniqueness_test
            .ok_or(ConfigError::MissingUniquenessTest)?;

        Ok(UniqueReproducerConfig {
            genome_config: self.genome_config,
            uniqueness_test,
            max_retries,
            initialisation: self.initialisation,
            seed: self.seed,
        })
    }
}
