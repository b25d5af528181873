//! `ekko-inference` is an async client for the locally hosted Ollama backend
//! behind the EKKO agriculture assistant.
//!
//! The crate exposes two calls on [`InferenceClient`]:
//! - [`InferenceClient::probe_backend`]
//! - [`InferenceClient::chat`]
//!
//! Chat calls fail fast when the backend is down, retry timeouts with a
//! growing per-attempt timeout, and retry overload statuses at the transport
//! layer beneath each attempt.

mod client;
mod config;
pub mod diagnostics;
mod error;
mod response;
mod retry;
mod session;
pub mod wire;

pub use client::InferenceClient;
pub use config::{
    BackendEndpoint, ClientConfig, SamplingOptions, Timeouts, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
};
pub use error::InferenceError;
pub use response::{ChatResponse, ChatStream};
pub use retry::{AttemptRetryPolicy, RetryStep, TransportRetryPolicy};
pub use session::Session;

pub type Result<T> = std::result::Result<T, InferenceError>;
