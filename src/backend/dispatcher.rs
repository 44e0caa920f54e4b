//! Chat dispatch: resolve the backend, invoke it, normalize the answer.
//!
//! The resolved [`BackendConfig`](crate::backend::registry::BackendConfig)
//! lives on this call's stack and is threaded through explicitly — no
//! process-wide configuration state, so concurrent requests with
//! different models cannot leak into each other.

use serde::{Deserialize, Serialize};

use crate::backend::registry::{self, Family};
use crate::backend::{agent, openai};
use crate::config::ChatConfig;
use crate::credentials::Credentials;
use crate::error::{MercuryError, Result};

/// A chat request from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model id selecting the backend family.
    pub model: String,
    /// The user's message.
    pub message: String,
}

/// The normalized answer returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// Plain answer text.
    pub text: String,
}

/// Dispatch one chat request to its backend.
///
/// # Errors
///
/// Propagates the full taxonomy: validation, resolution, backend,
/// agent, and extraction failures.
pub async fn dispatch(
    request: &ChatRequest,
    credentials: &Credentials,
    chat: &ChatConfig,
    client: &reqwest::Client,
) -> Result<ChatReply> {
    if request.message.trim().is_empty() {
        return Err(MercuryError::InvalidRequest(
            "message must not be empty".to_owned(),
        ));
    }

    let backend = registry::resolve(&request.model, credentials, chat)?;
    tracing::info!(model = %request.model, family = ?backend.family, "dispatching chat request");

    let text = match backend.family {
        Family::Agent => agent::run(&chat.agent, &request.message).await?,
        _ => {
            let markdown = chat.markdown_instruction_for(backend.family);
            openai::complete(client, &backend, &request.message, markdown).await?
        }
    };

    Ok(ChatReply { text })
}
