//! Backend registry: model id → backend configuration.
//!
//! Resolution applies an ordered list of substring/prefix predicates —
//! first match wins, the predicates are not mutually exclusive, so order
//! matters. The result is a request-local [`BackendConfig`]; nothing here
//! is stored in shared mutable state, so resolution is a pure function of
//! the model id and current credential presence.

use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::credentials::{Credentials, NVIDIA_API_KEY_VAR, OPENAI_API_KEY_VAR};
use crate::error::{MercuryError, Result};

/// Upstream model name used for the 405B llama family.
pub const LLAMA_405B_MODEL: &str = "nvdev/meta/llama-3.1-405b-instruct";

/// Upstream model name used for the nemotron family.
pub const NEMOTRON_MODEL: &str = "nvdev/nvidia/llama-3.3-nemotron-super-49b-v1";

/// Model served by the local NIM inference server.
pub const NIM_MODEL: &str = "meta/llama-3.1-8b-instruct";

/// System message prepended for the nemotron family.
pub const NEMOTRON_PRIMING: &str =
    "Give me thoughtful and rational input about the following subject:";

/// A class of LLM backend sharing credential type, base URL, and request
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    /// 405B llama served through the NVIDIA-hosted API.
    Llama405b,
    /// Nemotron served through the NVIDIA-hosted API.
    Nemotron,
    /// Local NIM inference server, no credential.
    NimLocal,
    /// OpenAI `gpt*` models.
    OpenAi,
    /// Recognized but unimplemented.
    Claude,
    /// Recognized but unimplemented.
    Custom,
    /// External agent CLI process.
    Agent,
    /// Unrecognized ids treated as literal OpenAI model names.
    Fallback,
}

/// How the chat request is shaped for the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestShape {
    /// User message alone.
    #[default]
    Simple,
    /// A fixed priming system message precedes the user message.
    SystemPrimed,
}

/// Per-family sampling constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling threshold, when the family sets one.
    pub top_p: Option<f64>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Frequency penalty, when the family sets one.
    pub frequency_penalty: Option<f64>,
    /// Presence penalty, when the family sets one.
    pub presence_penalty: Option<f64>,
}

impl SamplingParams {
    /// Parameters for the nemotron family.
    pub fn nemotron() -> Self {
        Self {
            temperature: 0.6,
            top_p: Some(0.95),
            max_tokens: 8092,
            frequency_penalty: Some(0.0),
            presence_penalty: Some(0.0),
        }
    }

    /// Parameters for the local NIM server.
    pub fn nim() -> Self {
        Self {
            temperature: 0.2,
            top_p: None,
            max_tokens: 8192,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    /// Parameters for every other HTTP family.
    pub fn standard() -> Self {
        Self {
            temperature: 0.2,
            top_p: Some(0.7),
            max_tokens: 8192,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }
}

/// Resolved backend configuration for one chat request.
///
/// Exactly one of these is active per request; it is built fresh on every
/// call and threaded through the dispatcher as a local value.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// The resolved family.
    pub family: Family,
    /// Bearer credential, when the family requires one.
    pub api_key: Option<String>,
    /// Base URL including the `/v1` segment.
    pub base_url: String,
    /// Model name sent upstream.
    pub model_name: String,
    /// Request shape for this family.
    pub request_shape: RequestShape,
    /// Sampling constants for this family.
    pub sampling: SamplingParams,
}

fn require_nvidia(creds: &Credentials) -> Result<String> {
    creds.nvidia().map(str::to_owned).ok_or_else(|| {
        MercuryError::MissingCredential(format!(
            "NVIDIA API key not configured (set {NVIDIA_API_KEY_VAR})"
        ))
    })
}

fn require_openai(creds: &Credentials) -> Result<String> {
    creds.openai().map(str::to_owned).ok_or_else(|| {
        MercuryError::MissingCredential(format!(
            "OpenAI API key not configured (set {OPENAI_API_KEY_VAR})"
        ))
    })
}

/// Resolve a model id to a backend configuration.
///
/// Predicates are tested in order; the first match wins:
///
/// 1. contains `llama-3.1-405b` or starts with `meta/` → 405B family
/// 2. contains `nemotron` → nemotron family
/// 3. equals `nim-llm` → local NIM server
/// 4. contains `gpt` → OpenAI family
/// 5. contains `claude` → recognized, unimplemented
/// 6. equals `custom` → recognized, unimplemented
/// 7. equals `mercury-agent` → external agent
/// 8. anything else → literal OpenAI model name
///
/// # Errors
///
/// [`MercuryError::MissingCredential`] when the matched family's
/// credential is absent; [`MercuryError::NotImplemented`] for families
/// 5 and 6.
pub fn resolve(model_id: &str, creds: &Credentials, chat: &ChatConfig) -> Result<BackendConfig> {
    if model_id.contains("llama-3.1-405b") || model_id.starts_with("meta/") {
        Ok(BackendConfig {
            family: Family::Llama405b,
            api_key: Some(require_nvidia(creds)?),
            base_url: chat.nvidia_base_url.clone(),
            model_name: LLAMA_405B_MODEL.to_owned(),
            request_shape: RequestShape::Simple,
            sampling: SamplingParams::standard(),
        })
    } else if model_id.contains("nemotron") {
        Ok(BackendConfig {
            family: Family::Nemotron,
            api_key: Some(require_nvidia(creds)?),
            base_url: chat.nvidia_base_url.clone(),
            model_name: NEMOTRON_MODEL.to_owned(),
            request_shape: RequestShape::SystemPrimed,
            sampling: SamplingParams::nemotron(),
        })
    } else if model_id == "nim-llm" {
        Ok(BackendConfig {
            family: Family::NimLocal,
            api_key: None,
            base_url: chat.nim_base_url.clone(),
            model_name: NIM_MODEL.to_owned(),
            request_shape: RequestShape::Simple,
            sampling: SamplingParams::nim(),
        })
    } else if model_id.contains("gpt") {
        Ok(BackendConfig {
            family: Family::OpenAi,
            api_key: Some(require_openai(creds)?),
            base_url: chat.openai_base_url.clone(),
            model_name: model_id.to_owned(),
            request_shape: RequestShape::Simple,
            sampling: SamplingParams::standard(),
        })
    } else if model_id.contains("claude") {
        Err(MercuryError::NotImplemented(
            "Claude API not yet implemented".to_owned(),
        ))
    } else if model_id == "custom" {
        Err(MercuryError::NotImplemented(
            "Custom endpoint not yet implemented".to_owned(),
        ))
    } else if model_id == "mercury-agent" {
        Ok(BackendConfig {
            family: Family::Agent,
            api_key: Some(require_nvidia(creds)?),
            base_url: String::new(),
            model_name: model_id.to_owned(),
            request_shape: RequestShape::Simple,
            sampling: SamplingParams::standard(),
        })
    } else {
        Ok(BackendConfig {
            family: Family::Fallback,
            api_key: Some(require_openai(creds)?),
            base_url: chat.openai_base_url.clone(),
            model_name: model_id.to_owned(),
            request_shape: RequestShape::Simple,
            sampling: SamplingParams::standard(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_keys() -> Credentials {
        Credentials::with_keys(Some("nvapi-test".into()), Some("sk-test".into()))
    }

    fn chat() -> ChatConfig {
        ChatConfig::default()
    }

    #[test]
    fn resolves_405b_by_substring() {
        let cfg = resolve("llama-3.1-405b-instruct", &both_keys(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::Llama405b);
        assert_eq!(cfg.model_name, LLAMA_405B_MODEL);
        assert_eq!(cfg.base_url, "https://integrate.api.nvidia.com/v1");
        assert_eq!(cfg.api_key.as_deref(), Some("nvapi-test"));
    }

    #[test]
    fn resolves_meta_prefix_to_405b() {
        let cfg = resolve("meta/llama-70b", &both_keys(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::Llama405b);
    }

    #[test]
    fn meta_substring_elsewhere_is_not_405b() {
        // Prefix predicate: "meta/" in the middle must not match family 1.
        let cfg = resolve("acme/meta/thing", &both_keys(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::Fallback);
    }

    #[test]
    fn resolves_nemotron_with_priming_shape() {
        let cfg = resolve("llama-3.3-nemotron-super-49b", &both_keys(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::Nemotron);
        assert_eq!(cfg.request_shape, RequestShape::SystemPrimed);
        assert_eq!(cfg.sampling, SamplingParams::nemotron());
        assert_eq!(cfg.sampling.max_tokens, 8092);
    }

    #[test]
    fn order_matters_405b_wins_over_nemotron() {
        // Contains both predicates; rule 1 is tested first.
        let cfg = resolve("llama-3.1-405b-nemotron", &both_keys(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::Llama405b);
    }

    #[test]
    fn resolves_nim_exactly() {
        let cfg = resolve("nim-llm", &Credentials::default(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::NimLocal);
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.model_name, NIM_MODEL);
        assert_eq!(cfg.base_url, "http://0.0.0.0:8000/v1");
    }

    #[test]
    fn nim_substring_is_not_nim() {
        // Rule 3 is an exact match; "nim-llm-v2" falls through.
        let err = resolve("nim-llm-v2", &Credentials::default(), &chat()).unwrap_err();
        assert_eq!(err.code(), "MISSING_CREDENTIAL");
    }

    #[test]
    fn resolves_gpt_with_literal_model_name() {
        let cfg = resolve("gpt-4o", &both_keys(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::OpenAi);
        assert_eq!(cfg.model_name, "gpt-4o");
        assert_eq!(cfg.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn claude_is_not_implemented() {
        let err = resolve("claude-sonnet", &both_keys(), &chat()).unwrap_err();
        assert_eq!(err.code(), "NOT_IMPLEMENTED");
    }

    #[test]
    fn custom_is_not_implemented() {
        let err = resolve("custom", &both_keys(), &chat()).unwrap_err();
        assert_eq!(err.code(), "NOT_IMPLEMENTED");
    }

    #[test]
    fn resolves_agent_family() {
        let cfg = resolve("mercury-agent", &both_keys(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::Agent);
    }

    #[test]
    fn unknown_id_falls_back_to_openai() {
        let cfg = resolve("mistral-large", &both_keys(), &chat()).unwrap();
        assert_eq!(cfg.family, Family::Fallback);
        assert_eq!(cfg.model_name, "mistral-large");
    }

    #[test]
    fn missing_nvidia_credential_fails_405b() {
        let creds = Credentials::with_keys(None, Some("sk-test".into()));
        let err = resolve("meta/llama", &creds, &chat()).unwrap_err();
        assert_eq!(err.code(), "MISSING_CREDENTIAL");
        assert!(err.message().contains("NVIDIA_API_KEY"));
    }

    #[test]
    fn missing_nvidia_credential_fails_agent() {
        let creds = Credentials::with_keys(None, None);
        let err = resolve("mercury-agent", &creds, &chat()).unwrap_err();
        assert_eq!(err.code(), "MISSING_CREDENTIAL");
    }

    #[test]
    fn missing_openai_credential_fails_gpt() {
        let creds = Credentials::with_keys(Some("nvapi".into()), None);
        let err = resolve("gpt-x", &creds, &chat()).unwrap_err();
        assert_eq!(err.code(), "MISSING_CREDENTIAL");
        assert!(err.message().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn resolution_is_deterministic() {
        // Pure function of (id, credential presence): same inputs, same route.
        let creds = both_keys();
        for id in ["gpt-4o", "nemotron-x", "nim-llm", "whatever"] {
            let a = resolve(id, &creds, &chat()).unwrap();
            let b = resolve(id, &creds, &chat()).unwrap();
            assert_eq!(a.family, b.family);
            assert_eq!(a.model_name, b.model_name);
        }
    }
}
