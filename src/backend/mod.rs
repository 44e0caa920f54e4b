//! Backend routing and response normalization.
//!
//! This is the core of the gateway: a model id and a message come in, a
//! single plain-text answer comes out, regardless of whether the backend
//! is a clean JSON chat-completions API or an external agent process that
//! prints a human-readable trace.

pub mod agent;
pub mod dispatcher;
pub mod extract;
pub mod openai;
pub mod registry;

pub use dispatcher::{ChatReply, ChatRequest, dispatch};
pub use registry::{BackendConfig, Family, RequestShape, resolve};
