//! Core building blocks for Launchdeck: persisted configuration, install
//! paths, process launching and the shared error taxonomy.

pub mod config;
pub mod error;
pub mod launcher;
pub mod paths;

pub use config::{AppConfig, ConfigStore, ProgramEntry, Theme, CONFIG_FILE_NAME};
pub use error::{ConfigError, LaunchError};
pub use launcher::{launch, launch_all, LaunchOutcome, LaunchReport, BATCH_CONFIRM_THRESHOLD};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Launchdeck core initialized");
    }
    Ok(())
}
