//! External agent backend.
//!
//! The agent family does not speak HTTP: the message is handed to a
//! long-running CLI (`aiq run --config_file=… --input …`) and the answer
//! is fished out of its printed trace. The process runs to completion —
//! no cancellation — and the answer has been observed on *either* output
//! stream, so on success stdout and stderr are concatenated (stdout
//! first) before extraction.

use crate::backend::extract;
use crate::config::AgentConfig;
use crate::error::{MercuryError, Result};
use crate::process;

/// Build the agent CLI argument list for one message.
pub fn agent_args(config: &AgentConfig, message: &str) -> Vec<String> {
    vec![
        "run".to_owned(),
        format!("--config_file={}", config.config_file.display()),
        "--input".to_owned(),
        message.to_owned(),
    ]
}

/// Run the agent process with `message` and extract its final answer.
///
/// # Errors
///
/// [`MercuryError::Agent`] when the process exits non-zero (carrying its
/// stderr), [`MercuryError::UnrecognizedFormat`] when the trace holds no
/// parseable result, [`MercuryError::Io`] when the process cannot spawn.
pub async fn run(config: &AgentConfig, message: &str) -> Result<String> {
    tracing::info!(command = %config.command, "starting agent process");

    let outcome = process::run(&config.command, agent_args(config, message)).await?;

    if !outcome.success() {
        tracing::error!(code = ?outcome.code(), "agent process failed");
        return Err(MercuryError::Agent {
            detail: outcome.stderr,
        });
    }

    tracing::debug!(
        stdout_bytes = outcome.stdout.len(),
        stderr_bytes = outcome.stderr.len(),
        "agent process finished"
    );

    let combined = format!("{}{}", outcome.stdout, outcome.stderr);
    extract::extract(&combined)
}
