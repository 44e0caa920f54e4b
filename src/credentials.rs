//! Process-wide credential state.
//!
//! Two environment variables gate two backend families. Absence of either
//! is recorded at startup and degrades the affected families to explicit
//! [`MissingCredential`](crate::error::MercuryError::MissingCredential)
//! failures at resolve time — never a crash.

use std::fmt;

/// Environment variable holding the NVIDIA API key.
pub const NVIDIA_API_KEY_VAR: &str = "NVIDIA_API_KEY";

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Resolved credential values, loaded once per process.
///
/// The Debug impl redacts all values to prevent accidental secret leakage
/// in logs.
#[derive(Clone, Default)]
pub struct Credentials {
    nvidia_api_key: Option<String>,
    openai_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("nvidia_api_key", &redact(&self.nvidia_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .finish()
    }
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "[REDACTED]",
        None => "<unset>",
    }
}

impl Credentials {
    /// Read credentials from the environment, warning about absent ones.
    ///
    /// Empty values are treated as unset.
    pub fn from_env() -> Self {
        let creds = Self {
            nvidia_api_key: read_var(NVIDIA_API_KEY_VAR),
            openai_api_key: read_var(OPENAI_API_KEY_VAR),
        };
        if creds.nvidia_api_key.is_none() {
            tracing::warn!("{NVIDIA_API_KEY_VAR} environment variable is not set");
        }
        if creds.openai_api_key.is_none() {
            tracing::warn!("{OPENAI_API_KEY_VAR} environment variable is not set");
        }
        creds
    }

    /// Construct credentials from explicit values.
    pub fn with_keys(nvidia_api_key: Option<String>, openai_api_key: Option<String>) -> Self {
        Self {
            nvidia_api_key,
            openai_api_key,
        }
    }

    /// The NVIDIA API key, if configured.
    pub fn nvidia(&self) -> Option<&str> {
        self.nvidia_api_key.as_deref()
    }

    /// The OpenAI API key, if configured.
    pub fn openai(&self) -> Option<&str> {
        self.openai_api_key.as_deref()
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
