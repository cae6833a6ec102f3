//! Error types for the core crate. Weather errors live in `launchdeck-weather`.
//!
//! Each concern gets its own enum so callers can match precisely, and every
//! enum offers `user_message()` for short inline status text in the front end.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or writing the persisted configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Install directory could not be determined: {0}")]
    InstallDir(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Read { .. } => "Configuration could not be read. Using defaults.",
            ConfigError::Parse(_) => "Configuration file is malformed. Using defaults.",
            ConfigError::Write { .. } => "Settings could not be saved.",
            ConfigError::InstallDir(_) => "Could not locate the application folder.",
        }
    }
}

/// Errors starting a registered program.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Program not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Failed to start {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => LaunchError::NotFound(path),
            std::io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied(path),
            _ => LaunchError::Spawn { path, source },
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            LaunchError::NotFound(_) => "The program no longer exists at its saved location.",
            LaunchError::PermissionDenied(_) => "You do not have permission to run this program.",
            LaunchError::Spawn { .. } => "The program could not be started.",
        }
    }
}
