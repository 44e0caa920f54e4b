//! Shared invocation helper for external command-line tools.
//!
//! Every spawned tool — the agent CLI, the capture/transcription tools,
//! the synthesizer, the concatenator — produces the same outcome shape:
//! exit status plus captured stdout and stderr. Callers decide which
//! stream carries their payload.

use std::ffi::OsStr;
use std::process::Stdio;

use crate::error::{MercuryError, Result};

/// Outcome of a completed external process.
#[derive(Debug)]
pub struct ProcessOutcome {
    /// Exit status of the process.
    pub status: std::process::ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ProcessOutcome {
    /// Whether the process exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, when the process exited normally.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Run a command to completion, capturing both output streams.
///
/// The call suspends until the process exits; there is no cancellation —
/// a started tool runs to completion.
///
/// # Errors
///
/// Returns [`MercuryError::Io`] if the process cannot be spawned. A
/// non-zero exit is *not* an error here; callers inspect the outcome.
pub async fn run<I, S>(program: &str, args: I) -> Result<ProcessOutcome>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| MercuryError::Io(format!("failed to spawn {program}: {e}")))?;

    Ok(ProcessOutcome {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
