//! Multiverse engine binary.
//!
//! Loads configuration, seeds a timeline from an ASCII pattern, evolves it
//! with the configured oracle, forks the configured branches, and
//! optionally archives every timeline to `PostgreSQL`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `multiverse-config.yaml` (or the path given
//!    as the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the in-memory multiverse from the store settings
//! 4. Seed, evolve, and branch
//! 5. Log a summary per timeline
//! 6. Archive, if enabled

mod archive;
mod error;
mod scenario;

use std::path::PathBuf;

use multiverse_core::config::LoggingConfig;
use multiverse_core::{Multiverse, MultiverseConfig, MultiverseError};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "multiverse-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the run, or archiving fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_path, found) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("multiverse-engine starting");
    if found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Build the multiverse.
    let multiverse = Multiverse::from_config(&config.store);
    info!(
        checkpoint_interval = ?multiverse.checkpoint_interval(),
        "Multiverse initialized"
    );

    // 4. Seed, evolve, and branch.
    let report = scenario::run(&multiverse, &config.run)?;

    // 5. Log results.
    for name in report.timelines() {
        let commits = multiverse.commit_count(name)?;
        let population = multiverse.latest_board(name)?.len();
        let depth = multiverse.lineage(name)?.len();
        info!(
            timeline = name,
            commits,
            population,
            lineage_depth = depth,
            "Timeline summary"
        );
    }
    let stats = multiverse
        .store()
        .stats()
        .map_err(MultiverseError::from)?;
    info!(
        timelines = stats.timelines,
        records = stats.records,
        commits = stats.commits,
        facts = stats.facts,
        "Store statistics"
    );

    // 6. Archive.
    if config.infrastructure.archive {
        let archived =
            archive::archive_all(&multiverse, &config.infrastructure.postgres_url).await?;
        info!(timelines = archived, "Timelines archived");
    }

    info!("multiverse-engine shutdown complete");
    Ok(())
}

/// Load configuration from the path given as the first argument, or from
/// `multiverse-config.yaml` in the working directory.
///
/// Returns the config, the path consulted, and whether the file existed.
fn load_config() -> Result<(MultiverseConfig, PathBuf, bool), EngineError> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = MultiverseConfig::from_file(&path)?;
        Ok((config, path, true))
    } else {
        let config = MultiverseConfig::parse("")?;
        Ok((config, path, false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
