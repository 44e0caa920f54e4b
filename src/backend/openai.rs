//! OpenAI-compatible chat-completions client (non-streaming).
//!
//! Serves every HTTP backend family: the request body is built from the
//! resolved [`BackendConfig`] and the endpoint is `{base_url}/chat/completions`
//! with optional bearer auth. Upstream non-2xx responses and transport
//! failures both become typed [`MercuryError::Backend`] values carrying
//! the upstream status and message.

use serde::Deserialize;

use crate::backend::registry::{BackendConfig, NEMOTRON_PRIMING, RequestShape};
use crate::error::{MercuryError, Result};

/// System instruction asking the model to format its answer as markdown.
///
/// Attached per family when the corresponding
/// [`MarkdownInstructionConfig`](crate::config::MarkdownInstructionConfig)
/// flag is set.
pub const MARKDOWN_INSTRUCTION: &str = "Format your response using markdown. \
    Use ### for main headers, ** for bold text, and proper list formatting \
    with - for bullet points and 1. for numbered lists. Ensure nested lists \
    are properly indented.";

/// Build the JSON request body for a chat completion.
///
/// Message order is: markdown instruction (when enabled), priming system
/// message (for [`RequestShape::SystemPrimed`]), then the user message.
pub fn build_request_body(
    config: &BackendConfig,
    message: &str,
    markdown_instruction: bool,
) -> serde_json::Value {
    let mut messages = Vec::new();
    if markdown_instruction {
        messages.push(serde_json::json!({
            "role": "system",
            "content": MARKDOWN_INSTRUCTION,
        }));
    }
    if config.request_shape == RequestShape::SystemPrimed {
        messages.push(serde_json::json!({
            "role": "system",
            "content": NEMOTRON_PRIMING,
        }));
    }
    messages.push(serde_json::json!({
        "role": "user",
        "content": message,
    }));

    let mut body = serde_json::json!({
        "model": config.model_name,
        "messages": messages,
        "temperature": config.sampling.temperature,
        "max_tokens": config.sampling.max_tokens,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(top_p) = config.sampling.top_p {
            obj.insert("top_p".into(), serde_json::json!(top_p));
        }
        if let Some(fp) = config.sampling.frequency_penalty {
            obj.insert("frequency_penalty".into(), serde_json::json!(fp));
        }
        if let Some(pp) = config.sampling.presence_penalty {
            obj.insert("presence_penalty".into(), serde_json::json!(pp));
        }
    }

    body
}

// ── Response types ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Extract an error message from an upstream error response body.
///
/// Falls back to the raw body when it is not the usual
/// `{"error": {"message": ...}}` shape.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Issue a chat completion and return the assistant's text.
///
/// # Errors
///
/// [`MercuryError::Backend`] on transport failure, non-2xx status, or a
/// response with no assistant content.
pub async fn complete(
    client: &reqwest::Client,
    config: &BackendConfig,
    message: &str,
    markdown_instruction: bool,
) -> Result<String> {
    let url = format!("{}/chat/completions", config.base_url);
    let body = build_request_body(config, message, markdown_instruction);

    tracing::debug!(model = %config.model_name, %url, "sending chat completion");

    let mut request = client.post(&url).json(&body);
    if let Some(key) = &config.api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| MercuryError::Backend {
        status: None,
        detail: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(MercuryError::Backend {
            status: Some(status.as_u16()),
            detail: extract_error_message(&body_text),
        });
    }

    let completion: ChatCompletion =
        response.json().await.map_err(|e| MercuryError::Backend {
            status: Some(status.as_u16()),
            detail: format!("malformed completion response: {e}"),
        })?;

    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| MercuryError::Backend {
            status: Some(status.as_u16()),
            detail: "completion response contained no assistant content".to_owned(),
        })
}
