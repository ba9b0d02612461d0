//! Error types for Evorepro
//!
//! Provides a unified error type and domain-specific error variants.
//! Retry exhaustion is deliberately absent: it is a normal outcome of
//! reproduction, not a failure.

use thiserror::Error;

use crate::types::genome_id::GenomeId;

/// Result type alias using EvoreproError
pub type Result<T> = std::result::Result<T, EvoreproError>;

/// Unified error type for Evorepro operations
#[derive(Debug, Error)]
pub enum EvoreproError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Population errors
    #[error("Population error: {0}")]
    Population(#[from] PopulationError),

    // Checkpoint errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Metrics registry errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration errors, raised eagerly at construction time
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_retries must be non-negative, got {0}")]
    InvalidMaxRetries(i64),

    #[error("max_retries {0} does not fit in a retry counter")]
    MaxRetriesOverflow(i64),

    #[error("A uniqueness test is required")]
    MissingUniquenessTest,

    #[error("Population size must be positive")]
    InvalidPopulationSize,

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },
}

/// Population bookkeeping errors
#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("Parent {0} is scheduled for reproduction but is not a live genome")]
    UnknownParent(GenomeId),

    #[error("Genome {0} not found")]
    UnknownGenome(GenomeId),

    #[error("Genome {0} is already present in the population")]
    DuplicateGenome(GenomeId),

    #[error("Genome id space exhausted")]
    IdSpaceExhausted,

    #[error("Reproducer is bound to a different population")]
    ForeignPopulation,
}

/// Checkpoint store errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    #[error("Invalid checkpoint key: {0}")]
    InvalidKey(String),

    #[error("Persisted entry {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

// Implement From for common external error types
impl From<serde_json::Error> for EvoreproError {
    fn from(err: serde_json::Error) -> Self {
        EvoreproError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for EvoreproError {
    fn from(err: std::io::Error) -> Self {
        EvoreproError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for EvoreproError {
    fn from(err: anyhow::Error) -> Self {
        EvoreproError::Internal(err.to_string())
    }
}
