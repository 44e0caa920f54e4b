//! Mercury: browser chat gateway with multi-backend LLM routing and
//! voice I/O.
//!
//! The server receives `(model, message)` pairs from a web client,
//! resolves the model id to a backend family, issues the request, and
//! reconciles the backends' very different response shapes — clean JSON
//! chat completions on one side, an external agent process printing a
//! human-readable trace on the other — into one uniform `{ text }`
//! contract.
//!
//! # Architecture
//!
//! - **Backend registry** ([`backend::registry`]): ordered model-id
//!   predicates producing a request-local backend configuration.
//! - **Chat dispatcher** ([`backend::dispatcher`]): orchestrates resolve
//!   → invoke → normalize, mapping every failure to a typed error.
//! - **Response extractor** ([`backend::extract`]): best-effort text
//!   parser over the agent's printed trace.
//! - **Audio pipeline** ([`audio`]): capture/transcription via external
//!   tools behind a single-slot recorder, and chunked speech synthesis
//!   with guaranteed temp-file cleanup.
//! - **HTTP surface** ([`server`]): axum routes tying it together.

pub mod audio;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod process;
pub mod server;

pub use config::ServerConfig;
pub use credentials::Credentials;
pub use error::{MercuryError, Result};
pub use server::{AppState, router};
