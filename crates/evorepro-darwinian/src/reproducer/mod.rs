//! Reproducers
//!
//! - [`UniqueReproducer`]: archive-backed uniqueness-constrained reproduction
//! - [`RetryPolicy`]: the bounded mutate/regenerate state machine it runs per slot

pub mod config;
pub mod retry;
pub mod unique;

pub use self::config::{InitialisationFn, UniqueReproducerConfig, UniqueReproducerConfigBuilder};
pub use self::retry::{RetryPhase, RetryPolicy};
pub use self::unique::{InitialisationReport, ReproductionReport, UniqueReproducer};
