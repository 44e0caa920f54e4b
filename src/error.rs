//! Error types for the Mercury gateway.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via [`MercuryError::code()`].
//! Codes are part of the public API contract and will not change.
//!
//! Every external-process and network call site converts failures into one
//! of these variants; none of them is allowed to take the process down.

/// Stable error codes for programmatic error handling.
///
/// These codes never change and form part of the public API contract.
/// Use these for distinguishing errors rather than parsing Display output.
pub mod error_codes {
    /// A backend family requires a credential that is not configured.
    pub const MISSING_CREDENTIAL: &str = "MISSING_CREDENTIAL";

    /// The model id resolved to a recognized but unimplemented family.
    pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

    /// Upstream HTTP backend returned non-2xx or the transport failed.
    pub const BACKEND_FAILED: &str = "BACKEND_FAILED";

    /// The external agent process exited non-zero.
    pub const AGENT_FAILED: &str = "AGENT_FAILED";

    /// The agent trace did not contain a parseable result marker.
    pub const UNRECOGNIZED_FORMAT: &str = "UNRECOGNIZED_FORMAT";

    /// An expected file (e.g. the capture recording) is absent.
    pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";

    /// The transcription tool failed.
    pub const TRANSCRIPTION_FAILED: &str = "TRANSCRIPTION_FAILED";

    /// The synthesis or concatenation tool failed.
    pub const SYNTHESIS_FAILED: &str = "SYNTHESIS_FAILED";

    /// The capture process could not be started or stopped.
    pub const RECORDING_FAILED: &str = "RECORDING_FAILED";

    /// The client request failed validation.
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

    /// A multipart upload could not be read or persisted.
    pub const UPLOAD_FAILED: &str = "UPLOAD_FAILED";

    /// Invalid or unreadable configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Process spawn or filesystem I/O failure.
    pub const IO_FAILED: &str = "IO_FAILED";
}

/// Errors produced by the Mercury gateway.
///
/// Each variant includes a stable error code accessible via
/// [`MercuryError::code()`]. The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum MercuryError {
    /// A backend family requires a credential that is not configured.
    #[error("[{}] {}", error_codes::MISSING_CREDENTIAL, .0)]
    MissingCredential(String),

    /// The model id resolved to a recognized but unimplemented family.
    #[error("[{}] {}", error_codes::NOT_IMPLEMENTED, .0)]
    NotImplemented(String),

    /// Upstream HTTP backend returned non-2xx or the transport failed.
    ///
    /// `status` is `None` for transport-level failures where no HTTP
    /// status was received.
    #[error("[{}] {}", error_codes::BACKEND_FAILED, format_backend(.status, .detail))]
    Backend {
        /// Upstream HTTP status, when one was received.
        status: Option<u16>,
        /// Upstream error message or body text.
        detail: String,
    },

    /// The external agent process exited non-zero.
    #[error("[{}] agent process failed: {}", error_codes::AGENT_FAILED, .detail)]
    Agent {
        /// Captured stderr of the agent process.
        detail: String,
    },

    /// The agent trace did not contain a parseable result marker.
    #[error("[{}] {}", error_codes::UNRECOGNIZED_FORMAT, .0)]
    UnrecognizedFormat(String),

    /// An expected file (e.g. the capture recording) is absent.
    #[error("[{}] {}", error_codes::FILE_NOT_FOUND, .0)]
    FileNotFound(String),

    /// The transcription tool failed.
    #[error("[{}] {}", error_codes::TRANSCRIPTION_FAILED, .0)]
    Transcription(String),

    /// The synthesis or concatenation tool failed.
    #[error("[{}] {}", error_codes::SYNTHESIS_FAILED, .0)]
    Synthesis(String),

    /// The capture process could not be started or stopped.
    #[error("[{}] {}", error_codes::RECORDING_FAILED, .0)]
    Recording(String),

    /// The client request failed validation.
    #[error("[{}] {}", error_codes::INVALID_REQUEST, .0)]
    InvalidRequest(String),

    /// A multipart upload could not be read or persisted.
    #[error("[{}] {}", error_codes::UPLOAD_FAILED, .0)]
    Upload(String),

    /// Invalid or unreadable configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// Process spawn or filesystem I/O failure.
    #[error("[{}] {}", error_codes::IO_FAILED, .0)]
    Io(String),
}

fn format_backend(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("backend HTTP {code}: {detail}"),
        None => format!("backend request failed: {detail}"),
    }
}

impl MercuryError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => error_codes::MISSING_CREDENTIAL,
            Self::NotImplemented(_) => error_codes::NOT_IMPLEMENTED,
            Self::Backend { .. } => error_codes::BACKEND_FAILED,
            Self::Agent { .. } => error_codes::AGENT_FAILED,
            Self::UnrecognizedFormat(_) => error_codes::UNRECOGNIZED_FORMAT,
            Self::FileNotFound(_) => error_codes::FILE_NOT_FOUND,
            Self::Transcription(_) => error_codes::TRANSCRIPTION_FAILED,
            Self::Synthesis(_) => error_codes::SYNTHESIS_FAILED,
            Self::Recording(_) => error_codes::RECORDING_FAILED,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            Self::Upload(_) => error_codes::UPLOAD_FAILED,
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Io(_) => error_codes::IO_FAILED,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Backend { status, detail } => format_backend(status, detail),
            Self::Agent { detail } => format!("agent process failed: {detail}"),
            Self::MissingCredential(m)
            | Self::NotImplemented(m)
            | Self::UnrecognizedFormat(m)
            | Self::FileNotFound(m)
            | Self::Transcription(m)
            | Self::Synthesis(m)
            | Self::Recording(m)
            | Self::InvalidRequest(m)
            | Self::Upload(m)
            | Self::Config(m)
            | Self::Io(m) => m.clone(),
        }
    }
}

/// Convenience alias for gateway results.
pub type Result<T> = std::result::Result<T, MercuryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_code() {
        let err = MercuryError::MissingCredential("NVIDIA_API_KEY not set".into());
        assert_eq!(err.code(), "MISSING_CREDENTIAL");
    }

    #[test]
    fn not_implemented_code() {
        let err = MercuryError::NotImplemented("Claude API not yet implemented".into());
        assert_eq!(err.code(), "NOT_IMPLEMENTED");
    }

    #[test]
    fn backend_display_includes_status_and_body() {
        let err = MercuryError::Backend {
            status: Some(429),
            detail: "rate limited".into(),
        };
        let display = format!("{err}");
        assert!(display.starts_with("[BACKEND_FAILED]"));
        assert!(display.contains("429"));
        assert!(display.contains("rate limited"));
    }

    #[test]
    fn backend_transport_failure_has_no_status() {
        let err = MercuryError::Backend {
            status: None,
            detail: "connection refused".into(),
        };
        assert!(format!("{err}").contains("backend request failed"));
    }

    #[test]
    fn agent_display_carries_stderr() {
        let err = MercuryError::Agent {
            detail: "Traceback (most recent call last)".into(),
        };
        let display = format!("{err}");
        assert!(display.starts_with("[AGENT_FAILED]"));
        assert!(display.contains("Traceback"));
    }

    #[test]
    fn display_includes_code_prefix() {
        let err = MercuryError::UnrecognizedFormat("no result marker".into());
        let display = format!("{err}");
        assert!(display.starts_with("[UNRECOGNIZED_FORMAT]"));
        assert!(display.contains("no result marker"));
    }

    #[test]
    fn message_returns_inner_text() {
        let err = MercuryError::Synthesis("chunk 2 produced no audio".into());
        assert_eq!(err.message(), "chunk 2 produced no audio");
    }

    #[test]
    fn all_codes_are_screaming_snake_case() {
        let errors: Vec<MercuryError> = vec![
            MercuryError::MissingCredential("x".into()),
            MercuryError::NotImplemented("x".into()),
            MercuryError::Backend {
                status: None,
                detail: "x".into(),
            },
            MercuryError::Agent { detail: "x".into() },
            MercuryError::UnrecognizedFormat("x".into()),
            MercuryError::FileNotFound("x".into()),
            MercuryError::Transcription("x".into()),
            MercuryError::Synthesis("x".into()),
            MercuryError::Recording("x".into()),
            MercuryError::InvalidRequest("x".into()),
            MercuryError::Upload("x".into()),
            MercuryError::Config("x".into()),
            MercuryError::Io("x".into()),
        ];
        for err in &errors {
            let code = err.code();
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
                "code {code:?} is not SCREAMING_SNAKE_CASE"
            );
        }
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MercuryError>();
    }
}
