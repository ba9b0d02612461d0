//! Runner configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Environment variable naming an optional settings file
pub const CONFIG_PATH_ENV: &str = "EVOREPRO_CONFIG";

/// Evolution run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Checkpoint key; reusing a name resumes that run
    pub run_name: String,
    /// Directory holding checkpoint files
    pub checkpoint_dir: String,
    /// Target number of live genomes
    pub population_size: usize,
    /// Parents selected for reproduction each generation
    pub parents_per_generation: usize,
    /// Generation index at which the run stops
    pub generations: u64,
    /// Bits per genome
    pub genome_length: usize,
    /// Per-bit flip probability
    pub mutation_rate: f64,
    /// Retry budget for the mutate and regenerate loops
    pub max_retries: i64,
    /// Reproducer RNG seed
    pub seed: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            run_name: "onemax".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            population_size: 32,
            parents_per_generation: 16,
            generations: 50,
            genome_length: 64,
            mutation_rate: 0.02,
            max_retries: evorepro_darwinian::DEFAULT_MAX_RETRIES as i64,
            seed: evorepro_darwinian::DEFAULT_SEED,
        }
    }
}

impl RunnerSettings {
    /// Load settings from defaults, an optional file, and `EVOREPRO_*` variables
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "evorepro".to_string());
        let defaults = Self::default();

        let cfg = config::Config::builder()
            .set_default("run_name", defaults.run_name)?
            .set_default("checkpoint_dir", defaults.checkpoint_dir)?
            .set_default("population_size", defaults.population_size as i64)?
            .set_default(
                "parents_per_generation",
                defaults.parents_per_generation as i64,
            )?
            .set_default("generations", defaults.generations as i64)?
            .set_default("genome_length", defaults.genome_length as i64)?
            .set_default("mutation_rate", defaults.mutation_rate)?
            .set_default("max_retries", defaults.max_retries)?
            .set_default("seed", defaults.seed as i64)?
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix("EVOREPRO").try_parsing(true))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    /// Settings as a flat JSON object, for run reports
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
