//! Install-directory resolution.
//!
//! Config, bundled resources and the crash log all live next to the program
//! rather than in a per-user directory, so a copied install folder carries its
//! settings with it. The result never depends on the working directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable overriding the install directory.
pub const HOME_ENV: &str = "LAUNCHDECK_HOME";

/// Relative location of the full administrative-region dataset, as written
/// by `launchdeck generate-dataset`.
pub const DATASET_RELATIVE_PATH: &str = "resources/city_data.json";

/// Relative location of the partial dataset shipped in the repository. Used
/// only while no full dataset has been generated.
pub const SAMPLE_DATASET_RELATIVE_PATH: &str = "resources/city_data.sample.json";

/// File written by the last-resort error handler.
pub const ERROR_LOG_FILE_NAME: &str = "error_log.txt";

/// Directory holding `config.json`, `resources/` and `error_log.txt`.
///
/// # Errors
/// Returns [`ConfigError::InstallDir`] when no rule yields a directory.
pub fn install_dir() -> Result<PathBuf, ConfigError> {
    resolve_install_dir(
        std::env::var_os(HOME_ENV),
        std::env::var_os("CARGO_MANIFEST_DIR"),
        std::env::current_exe,
    )
}

/// Path of the full dataset inside the install directory.
///
/// # Errors
/// Propagates [`install_dir`] failures.
pub fn dataset_path() -> Result<PathBuf, ConfigError> {
    Ok(install_dir()?.join(DATASET_RELATIVE_PATH))
}

/// Path of the partial sample dataset inside the install directory.
///
/// # Errors
/// Propagates [`install_dir`] failures.
pub fn sample_dataset_path() -> Result<PathBuf, ConfigError> {
    Ok(install_dir()?.join(SAMPLE_DATASET_RELATIVE_PATH))
}

/// Path of the crash log inside the install directory.
///
/// # Errors
/// Propagates [`install_dir`] failures.
pub fn error_log_path() -> Result<PathBuf, ConfigError> {
    Ok(install_dir()?.join(ERROR_LOG_FILE_NAME))
}

pub(crate) fn resolve_install_dir(
    home_override: Option<OsString>,
    manifest_dir: Option<OsString>,
    current_exe: impl FnOnce() -> std::io::Result<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(home) = home_override.filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }

    // Development run through cargo: settings live at the workspace root.
    if let Some(manifest) = manifest_dir.filter(|m| !m.is_empty()) {
        let manifest = PathBuf::from(manifest);
        return Ok(workspace_root(&manifest).unwrap_or(manifest));
    }

    let exe = current_exe().map_err(|e| ConfigError::InstallDir(e.to_string()))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::InstallDir(format!("{} has no parent", exe.display())))
}

fn workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| {
            std::fs::read_to_string(dir.join("Cargo.toml"))
                .map(|manifest| manifest.lines().any(|l| l.trim() == "[workspace]"))
                .unwrap_or(false)
        })
        .map(Path::to_path_buf)
}
