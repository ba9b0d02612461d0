//! Evorepro Runner - seeded OneMax evolution with uniqueness-constrained
//! reproduction, checkpointing after every generation.
//!
//! Re-running with the same `run_name` resumes from the last checkpoint.

mod evolution;
mod settings;

use std::sync::atomic::Ordering;

use anyhow::Result;
use evorepro_darwinian::FileCheckpointStore;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::evolution::Evolution;
use crate::settings::RunnerSettings;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Evorepro Runner v{}", evorepro_common::VERSION);

    let settings = RunnerSettings::load()?;
    info!(settings = %settings.to_json(), "Loaded configuration");

    let store = FileCheckpointStore::open(&settings.checkpoint_dir)?;
    let mut evolution = Evolution::new(settings, store)?;

    // Ctrl+C stops the loop once the current generation is checkpointed
    let stop = evolution.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let (evolution, summary) = tokio::task::spawn_blocking(move || {
        let summary = evolution.run();
        (evolution, summary)
    })
    .await?;
    let summary = summary?;

    info!(
        generation = summary.generation,
        best_fitness = ?summary.best_fitness,
        archive_size = summary.archive_size,
        population = summary.population,
        resumed = summary.resumed,
        "Run finished"
    );
    debug!(exposition = %evolution.metrics_text()?, "Final metrics");
    Ok(())
}
