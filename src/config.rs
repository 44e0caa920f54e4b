//! Configuration types for the Mercury gateway.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::registry::Family;
use crate::error::{MercuryError, Result};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address and port.
    pub server: ListenConfig,
    /// Chat backend routing settings.
    pub chat: ChatConfig,
    /// Audio capture/transcription/synthesis settings.
    pub audio: AudioConfig,
    /// Multipart upload settings.
    pub uploads: UploadConfig,
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`MercuryError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MercuryError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            MercuryError::Config(format!("cannot parse config {}: {e}", path.display()))
        })
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to (0 = auto-assign).
    pub port: u16,
    /// Directory holding the web client assets, served at `/`.
    pub static_dir: PathBuf,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5000,
            static_dir: PathBuf::from("public"),
        }
    }
}

/// Chat backend routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL for the NVIDIA-hosted OpenAI-compatible API.
    ///
    /// Includes the `/v1` segment; the client appends `/chat/completions`.
    pub nvidia_base_url: String,
    /// Base URL for the local NIM inference server.
    pub nim_base_url: String,
    /// Base URL for the OpenAI API.
    pub openai_base_url: String,
    /// Families that get the markdown-formatting system instruction
    /// prepended to their requests.
    pub markdown_instruction: MarkdownInstructionConfig,
    /// External agent process settings.
    pub agent: AgentConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            nvidia_base_url: "https://integrate.api.nvidia.com/v1".to_owned(),
            nim_base_url: "http://0.0.0.0:8000/v1".to_owned(),
            openai_base_url: "https://api.openai.com/v1".to_owned(),
            markdown_instruction: MarkdownInstructionConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Whether the markdown-formatting instruction is attached for `family`.
    pub fn markdown_instruction_for(&self, family: Family) -> bool {
        let md = &self.markdown_instruction;
        match family {
            Family::Llama405b => md.llama_405b,
            Family::Nemotron => md.nemotron,
            Family::NimLocal => md.nim_llm,
            Family::OpenAi => md.openai,
            Family::Fallback => md.fallback,
            // The agent prints a finished trace; unimplemented families
            // never reach request building.
            Family::Agent | Family::Claude | Family::Custom => false,
        }
    }
}

/// Per-family switches for the markdown-formatting system instruction.
///
/// All default to off: the upstream behavior defines the instruction but
/// does not attach it to any family's request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownInstructionConfig {
    /// 405B llama family.
    pub llama_405b: bool,
    /// Nemotron family.
    pub nemotron: bool,
    /// Local NIM server.
    pub nim_llm: bool,
    /// OpenAI `gpt*` family.
    pub openai: bool,
    /// Unrecognized model ids treated as literal OpenAI model names.
    pub fallback: bool,
}

/// External agent process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent CLI executable.
    pub command: String,
    /// YAML workflow config passed via `--config_file=`.
    pub config_file: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: "aiq".to_owned(),
            config_file: PathBuf::from("configs/config.yml"),
        }
    }
}

/// Audio pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture tool executable.
    pub capture_command: String,
    /// Capture tool arguments; the capture file path is appended last.
    pub capture_args: Vec<String>,
    /// Where the capture tool writes the recording.
    pub capture_file: PathBuf,
    /// Delay after killing the capture process before reading the file,
    /// giving the tool time to flush.
    pub settle_delay_ms: u64,
    /// Transcription tool settings.
    pub asr: AsrConfig,
    /// Synthesis tool settings.
    pub tts: TtsConfig,
    /// Audio concatenation tool; invoked as `<cmd> chunk1 .. chunkN out`.
    pub concat_command: String,
    /// Directory for temporary chunk and combined audio files.
    pub temp_dir: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_command: "sox".to_owned(),
            // Default input device, mono, 16 kHz, 16-bit.
            capture_args: vec![
                "-d".to_owned(),
                "-c".to_owned(),
                "1".to_owned(),
                "-r".to_owned(),
                "16000".to_owned(),
                "-b".to_owned(),
                "16".to_owned(),
            ],
            capture_file: PathBuf::from("/tmp/mercury_recording.wav"),
            settle_delay_ms: 1000,
            asr: AsrConfig::default(),
            tts: TtsConfig::default(),
            concat_command: "sox".to_owned(),
            temp_dir: PathBuf::from("/tmp"),
        }
    }
}

/// Transcription (ASR) tool configuration.
///
/// The tool is a CLI client for a gRPC-over-TLS ASR service; the bearer
/// token is supplied from the NVIDIA credential at invocation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Interpreter running the client script.
    pub command: String,
    /// Path to the ASR client script.
    pub script: PathBuf,
    /// gRPC endpoint.
    pub server: String,
    /// Whether to pass `--use-ssl`.
    pub use_ssl: bool,
    /// Hosted-function id sent as gRPC metadata.
    pub function_id: String,
    /// Language code for transcription.
    pub language_code: String,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            command: "python".to_owned(),
            script: PathBuf::from("riva_python_client/scripts/asr/transcribe_file.py"),
            server: "grpc.nvcf.nvidia.com:443".to_owned(),
            use_ssl: true,
            function_id: "e6fa172c-79bf-4b9c-bb37-14fe17b4226c".to_owned(),
            language_code: "en-US".to_owned(),
        }
    }
}

/// Synthesis (TTS) tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Interpreter running the client script.
    pub command: String,
    /// Path to the TTS client script.
    pub script: PathBuf,
    /// gRPC endpoint of the local synthesis server.
    pub server: String,
    /// Language code for synthesis.
    pub language_code: String,
    /// Voice used when the request does not name one.
    pub default_voice: String,
    /// Output encoding passed to the tool.
    pub encoding: String,
    /// Output sample rate in Hz.
    pub sample_rate_hz: u32,
    /// Maximum characters per synthesis chunk.
    ///
    /// Bounded to keep each tool invocation under the client overhead
    /// limit; input text is split at sentence boundaries.
    pub max_chunk_chars: usize,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            command: "python3".to_owned(),
            script: PathBuf::from("riva_python_client/scripts/tts/talk.py"),
            server: "0.0.0.0:50051".to_owned(),
            language_code: "en-US".to_owned(),
            default_voice: "Magpie-Multilingual.ES-US.Diego.Happy".to_owned(),
            encoding: "LINEAR_PCM".to_owned(),
            sample_rate_hz: 22_050,
            max_chunk_chars: 1500,
        }
    }
}

/// Multipart upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory where uploaded documents and images are stored.
    pub dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_constants() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(
            config.chat.nvidia_base_url,
            "https://integrate.api.nvidia.com/v1"
        );
        assert_eq!(config.audio.settle_delay_ms, 1000);
        assert_eq!(config.audio.tts.max_chunk_chars, 1500);
        assert_eq!(config.audio.tts.sample_rate_hz, 22_050);
        assert_eq!(config.audio.capture_args[0], "-d");
    }

    #[test]
    fn markdown_instruction_defaults_off() {
        let chat = ChatConfig::default();
        for family in [
            Family::Llama405b,
            Family::Nemotron,
            Family::NimLocal,
            Family::OpenAi,
            Family::Fallback,
        ] {
            assert!(!chat.markdown_instruction_for(family));
        }
    }

    #[test]
    fn toml_round_trip() {
        let config = ServerConfig::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed: ServerConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.server.host, config.server.host);
        assert_eq!(parsed.audio.asr.server, config.audio.asr.server);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: ServerConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [chat.markdown_instruction]
            nemotron = true
            "#,
        )
        .unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.server.host, "0.0.0.0");
        assert!(parsed.chat.markdown_instruction_for(Family::Nemotron));
        assert!(!parsed.chat.markdown_instruction_for(Family::OpenAi));
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = ServerConfig::load(Path::new("/nonexistent/mercury.toml")).unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
    }
}
