//! Core types for Evorepro
pub mod genome_id;
pub mod logging;
pub mod persisted;
