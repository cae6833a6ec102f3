//! Starting registered programs as independent processes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::ProgramEntry;
use crate::error::LaunchError;

/// Front ends confirm with the user before launching more programs than this.
pub const BATCH_CONFIRM_THRESHOLD: usize = 10;

/// Start one program detached from this process and return its process id.
///
/// The child's stdio is closed. A background thread waits on it so an exited
/// program never lingers as a zombie in a long-running front end.
///
/// # Errors
/// Returns a [`LaunchError`] describing why the process could not start.
pub fn launch(entry: &ProgramEntry) -> Result<u32, LaunchError> {
    let path = PathBuf::from(&entry.path);
    if !path.exists() {
        return Err(LaunchError::NotFound(path));
    }

    let mut command = Command::new(&path);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = path.parent().filter(|d| d.is_dir()) {
        command.current_dir(dir);
    }

    let child = command
        .spawn()
        .map_err(|e| LaunchError::from_io(path.clone(), e))?;
    let pid = child.id();
    tracing::info!("Launched {} (pid {})", path.display(), pid);

    let reaper = std::thread::Builder::new()
        .name(format!("reap-{}", pid))
        .spawn(move || {
            let mut child = child;
            if let Err(e) = child.wait() {
                tracing::debug!("Failed to wait on pid {}: {}", pid, e);
            }
        });
    if let Err(e) = reaper {
        tracing::debug!("No reaper thread for pid {}: {}", pid, e);
    }

    Ok(pid)
}

/// Result of one attempted launch within a batch.
#[derive(Debug)]
pub struct LaunchOutcome {
    pub entry: ProgramEntry,
    /// Process id on success
    pub result: Result<u32, LaunchError>,
}

impl LaunchOutcome {
    pub fn path(&self) -> &Path {
        Path::new(&self.entry.path)
    }
}

/// Per-entry outcomes of a batch launch, in launch order.
#[derive(Debug, Default)]
pub struct LaunchReport {
    pub outcomes: Vec<LaunchOutcome>,
}

impl LaunchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &LaunchOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &LaunchOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Launch every entry in order. A failure never stops the rest of the batch.
pub fn launch_all<'a>(entries: impl IntoIterator<Item = &'a ProgramEntry>) -> LaunchReport {
    let outcomes = entries
        .into_iter()
        .map(|entry| {
            let result = launch(entry);
            if let Err(e) = &result {
                tracing::warn!("Failed to launch {}: {}", entry.name, e);
            }
            LaunchOutcome {
                entry: entry.clone(),
                result,
            }
        })
        .collect();

    LaunchReport { outcomes }
}
