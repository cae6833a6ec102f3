//! Last-resort error reporting at the process boundary.
//!
//! Unhandled errors and panics end up in `error_log.txt` in the install
//! directory so users can send it along with a bug report.

use std::path::{Path, PathBuf};

use launchdeck_core::paths;

/// Write `message` to the crash log in `dir`, replacing any previous log.
///
/// # Errors
/// Returns the I/O error if the file cannot be written.
pub fn write_error_log_in(dir: &Path, message: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(paths::ERROR_LOG_FILE_NAME);
    let contents = format!(
        "Launchdeck {} encountered an unrecoverable error:\n\n{}\n",
        env!("CARGO_PKG_VERSION"),
        message
    );
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Print `message` and record it in the install directory's crash log.
pub fn report(message: &str) {
    eprintln!("{}", "=".repeat(50));
    eprintln!("Error:");
    eprintln!("{}", message);
    eprintln!("{}", "=".repeat(50));

    let written = paths::install_dir()
        .map_err(|e| e.to_string())
        .and_then(|dir| write_error_log_in(&dir, message).map_err(|e| e.to_string()));

    match written {
        Ok(path) => eprintln!("Error log saved to {}", path.display()),
        Err(e) => eprintln!("Failed to save error log: {}", e),
    }
}

/// Route panics through [`report`] before the default hook runs.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        report(&format!("panic: {}", info));
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_log_written_and_replaced() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_error_log_in(dir.path(), "first failure").unwrap();
        assert_eq!(path, dir.path().join("error_log.txt"));

        write_error_log_in(dir.path(), "second failure").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("second failure"));
        assert!(!contents.contains("first failure"));
    }

    #[test]
    fn test_error_log_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(write_error_log_in(&missing, "boom").is_err());
    }
}
