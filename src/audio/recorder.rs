//! Microphone capture and transcription via external tools.
//!
//! The capture process handle is process-wide singleton state by design:
//! at most one recording is active, and starting a new one preempts the
//! old (kill + restart, logged, never rejected). The handle lives in a
//! mutex-guarded single slot rather than a bare global.

use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::config::{AsrConfig, AudioConfig};
use crate::credentials::{Credentials, NVIDIA_API_KEY_VAR};
use crate::error::{MercuryError, Result};
use crate::process;

/// Decorative `##` prefixes the transcription tool prints before text.
static TRANSCRIPT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"##\s*").expect("valid transcript prefix pattern"));

/// Outcome of [`Recorder::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingStarted {
    /// Whether an active recording was killed to make room.
    pub restarted: bool,
}

/// Single-slot manager for the capture process.
///
/// `start` spawns the capture tool writing to the configured file;
/// `stop` kills it, waits for the file to flush, transcribes it, and
/// removes it.
pub struct Recorder {
    config: AudioConfig,
    slot: Mutex<Option<Child>>,
}

impl Recorder {
    /// Create a recorder for the given audio configuration.
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
        }
    }

    /// Whether a capture process currently occupies the slot.
    pub async fn is_recording(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Start capturing. An already-active recording is killed first.
    ///
    /// # Errors
    ///
    /// [`MercuryError::Recording`] when the capture tool cannot be
    /// spawned.
    pub async fn start(&self) -> Result<RecordingStarted> {
        let mut slot = self.slot.lock().await;

        let restarted = slot.is_some();
        if let Some(mut old) = slot.take() {
            tracing::warn!("recording already in progress, restarting capture");
            let _ = old.kill().await;
            let _ = old.wait().await;
        }

        let mut child = tokio::process::Command::new(&self.config.capture_command)
            .args(&self.config.capture_args)
            .arg(&self.config.capture_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MercuryError::Recording(format!(
                    "failed to start capture tool {}: {e}",
                    self.config.capture_command
                ))
            })?;

        // The capture tool chats on stderr; forward it to the log.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "mercury::capture", "{line}");
                }
            });
        }

        tracing::info!(file = %self.config.capture_file.display(), "recording started");
        *slot = Some(child);
        Ok(RecordingStarted { restarted })
    }

    /// Stop capturing and transcribe the recording.
    ///
    /// Kills the capture process, waits the settle delay for the file to
    /// flush, runs the transcription tool, and deletes the capture file.
    /// A deletion failure is logged, not returned.
    ///
    /// # Errors
    ///
    /// [`MercuryError::FileNotFound`] when the capture file is absent,
    /// [`MercuryError::MissingCredential`] without the NVIDIA key,
    /// [`MercuryError::Transcription`] when the tool exits non-zero.
    pub async fn stop(&self, credentials: &Credentials) -> Result<String> {
        {
            let mut slot = self.slot.lock().await;
            if let Some(mut child) = slot.take() {
                let _ = child.kill().await;
                let _ = child.wait().await;
                tracing::info!("recording stopped");
            } else {
                tracing::warn!("stop requested with no active recording");
            }
        }

        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        let capture_file = self.config.capture_file.clone();
        if !capture_file.exists() {
            return Err(MercuryError::FileNotFound(format!(
                "recording file not found: {}",
                capture_file.display()
            )));
        }

        let transcription =
            transcribe_file(&self.config.asr, credentials, &capture_file).await?;

        if let Err(e) = tokio::fs::remove_file(&capture_file).await {
            tracing::warn!(error = %e, "failed to delete recording file");
        }

        Ok(transcription)
    }
}

/// Build the transcription tool argument list.
pub fn transcribe_args(asr: &AsrConfig, api_key: &str, input: &Path) -> Vec<String> {
    let mut args = vec![
        asr.script.display().to_string(),
        "--server".to_owned(),
        asr.server.clone(),
    ];
    if asr.use_ssl {
        args.push("--use-ssl".to_owned());
    }
    args.extend([
        "--metadata".to_owned(),
        "function-id".to_owned(),
        asr.function_id.clone(),
        "--metadata".to_owned(),
        "authorization".to_owned(),
        format!("Bearer {api_key}"),
        "--language-code".to_owned(),
        asr.language_code.clone(),
        "--input-file".to_owned(),
        input.display().to_string(),
    ]);
    args
}

/// Run the transcription tool against `input` and clean up its output.
///
/// # Errors
///
/// [`MercuryError::MissingCredential`] without the NVIDIA key,
/// [`MercuryError::Transcription`] on non-zero tool exit.
pub async fn transcribe_file(
    asr: &AsrConfig,
    credentials: &Credentials,
    input: &Path,
) -> Result<String> {
    let api_key = credentials.nvidia().ok_or_else(|| {
        MercuryError::MissingCredential(format!(
            "transcription requires the NVIDIA credential (set {NVIDIA_API_KEY_VAR})"
        ))
    })?;

    let outcome = process::run(&asr.command, transcribe_args(asr, api_key, input)).await?;
    if !outcome.success() {
        tracing::error!(code = ?outcome.code(), "transcription tool failed");
        return Err(MercuryError::Transcription(outcome.stderr));
    }

    Ok(clean_transcript(&outcome.stdout))
}

/// Trim the raw tool output and strip decorative `##` prefixes.
fn clean_transcript(raw: &str) -> String {
    TRANSCRIPT_PREFIX.replace_all(raw.trim(), "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn transcript_prefix_is_stripped() {
        assert_eq!(clean_transcript("## hello world\n"), "hello world");
        assert_eq!(clean_transcript("##hello"), "hello");
        assert_eq!(clean_transcript("plain text"), "plain text");
    }

    #[test]
    fn transcribe_args_carry_auth_metadata() {
        let asr = AsrConfig::default();
        let args = transcribe_args(&asr, "nvapi-secret", Path::new("/tmp/rec.wav"));
        assert_eq!(args[0], "riva_python_client/scripts/asr/transcribe_file.py");
        assert!(args.contains(&"--use-ssl".to_owned()));
        assert!(args.contains(&"Bearer nvapi-secret".to_owned()));
        assert!(args.contains(&"function-id".to_owned()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/rec.wav"));
    }

    #[test]
    fn transcribe_args_without_ssl() {
        let asr = AsrConfig {
            use_ssl: false,
            ..AsrConfig::default()
        };
        let args = transcribe_args(&asr, "k", Path::new("/tmp/rec.wav"));
        assert!(!args.contains(&"--use-ssl".to_owned()));
    }

    #[tokio::test]
    async fn transcribe_without_credential_is_typed_failure() {
        let err = transcribe_file(
            &AsrConfig::default(),
            &Credentials::default(),
            Path::new("/tmp/rec.wav"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "MISSING_CREDENTIAL");
    }

    #[tokio::test]
    async fn start_spawn_failure_is_recording_error() {
        let config = AudioConfig {
            capture_command: "mercury-no-such-capture-tool".to_owned(),
            ..AudioConfig::default()
        };
        let recorder = Recorder::new(config);
        let err = recorder.start().await.unwrap_err();
        assert_eq!(err.code(), "RECORDING_FAILED");
        assert!(!recorder.is_recording().await);
    }

    #[tokio::test]
    async fn stop_without_capture_file_is_file_not_found() {
        let config = AudioConfig {
            settle_delay_ms: 0,
            capture_file: PathBuf::from("/tmp/mercury-test-no-such-recording.wav"),
            ..AudioConfig::default()
        };
        let recorder = Recorder::new(config);
        let err = recorder
            .stop(&Credentials::with_keys(Some("k".into()), None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FILE_NOT_FOUND");
    }
}
