//! Speech synthesis pipeline: chunk → per-chunk synthesis → concatenation.
//!
//! Each chunk is synthesized into its own temporary file by the external
//! TTS tool, strictly in order; the chunk files are then concatenated
//! into one combined file whose bytes are returned. Any chunk failure
//! aborts the whole request — no partial playback. Every temporary file
//! is removed on every exit path via a drop guard.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::audio::chunk::split_chunks;
use crate::config::AudioConfig;
use crate::error::{MercuryError, Result};
use crate::process;

/// Drop guard owning the request's temporary audio files.
///
/// Deletion runs unconditionally when the guard goes out of scope —
/// success, error, or early return.
struct TempFileSet {
    files: Vec<PathBuf>,
}

impl TempFileSet {
    fn new() -> Self {
        Self { files: Vec::new() }
    }

    fn add(&mut self, path: PathBuf) -> PathBuf {
        self.files.push(path.clone());
        path
    }
}

impl Drop for TempFileSet {
    fn drop(&mut self) {
        for file in &self.files {
            match std::fs::remove_file(file) {
                Ok(()) => tracing::debug!(file = %file.display(), "removed temporary audio file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "failed to remove temporary audio file");
                }
            }
        }
    }
}

/// Build the synthesis tool argument list for one chunk.
pub fn synthesis_args(
    config: &AudioConfig,
    voice: &str,
    text: &str,
    output: &Path,
) -> Vec<String> {
    let tts = &config.tts;
    vec![
        tts.script.display().to_string(),
        "--server".to_owned(),
        tts.server.clone(),
        "--language-code".to_owned(),
        tts.language_code.clone(),
        "--voice".to_owned(),
        voice.to_owned(),
        "--text".to_owned(),
        text.to_owned(),
        "-o".to_owned(),
        output.display().to_string(),
        "--encoding".to_owned(),
        tts.encoding.clone(),
        "--sample-rate-hz".to_owned(),
        tts.sample_rate_hz.to_string(),
    ]
}

/// Fail unless `path` exists and is non-empty.
async fn verify_audio_file(path: &Path, what: &str) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(MercuryError::Synthesis(format!("{what} is empty"))),
        Err(_) => Err(MercuryError::Synthesis(format!("{what} was not created"))),
    }
}

/// Synthesize `text` to a single WAV byte buffer.
///
/// # Errors
///
/// [`MercuryError::InvalidRequest`] for blank input,
/// [`MercuryError::Synthesis`] when any chunk's tool run fails or
/// produces no audio, or when concatenation fails.
pub async fn synthesize(config: &AudioConfig, text: &str, voice: Option<&str>) -> Result<Vec<u8>> {
    let chunks = split_chunks(text, config.tts.max_chunk_chars);
    if chunks.is_empty() {
        return Err(MercuryError::InvalidRequest(
            "text must not be empty".to_owned(),
        ));
    }

    let voice = voice.unwrap_or(&config.tts.default_voice);
    let request_id = Uuid::new_v4();
    let mut temp = TempFileSet::new();

    tracing::info!(chunks = chunks.len(), voice, "starting synthesis");

    let mut chunk_files = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        let chunk_file = temp.add(
            config
                .temp_dir
                .join(format!("tts_{request_id}_{index}.wav")),
        );
        tracing::debug!(
            chunk = index + 1,
            total = chunks.len(),
            chars = chunk.chars().count(),
            "synthesizing chunk"
        );

        let outcome = process::run(
            &config.tts.command,
            synthesis_args(config, voice, chunk, &chunk_file),
        )
        .await?;
        if !outcome.success() {
            return Err(MercuryError::Synthesis(format!(
                "synthesis tool failed on chunk {}: {}",
                index + 1,
                outcome.stderr
            )));
        }
        verify_audio_file(&chunk_file, &format!("chunk {} output", index + 1)).await?;
        chunk_files.push(chunk_file);
    }

    let combined = temp.add(
        config
            .temp_dir
            .join(format!("tts_combined_{request_id}.wav")),
    );
    let mut concat_args: Vec<String> = chunk_files
        .iter()
        .map(|f| f.display().to_string())
        .collect();
    concat_args.push(combined.display().to_string());

    let outcome = process::run(&config.concat_command, concat_args).await?;
    if !outcome.success() {
        return Err(MercuryError::Synthesis(format!(
            "audio concatenation failed: {}",
            outcome.stderr
        )));
    }
    verify_audio_file(&combined, "combined audio file").await?;

    let bytes = tokio::fs::read(&combined)
        .await
        .map_err(|e| MercuryError::Io(format!("cannot read combined audio: {e}")))?;

    tracing::info!(bytes = bytes.len(), "synthesis finished");
    Ok(bytes)
}
