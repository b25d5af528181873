use std::time::Duration;

use serde::Serialize;

use crate::{AttemptRetryPolicy, InferenceError, Result, TransportRetryPolicy};

/// Default persona sent as the system message of every chat call.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Ekko, an agriculture assistant.";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Location of the inference backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackendEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for BackendEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 11434,
        }
    }
}

impl BackendEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Example: `localhost:11434` → `"http://localhost:11434"`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host.trim(), self.port)
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url())
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url())
    }

    /// Model-listing path, also used as the liveness probe.
    pub fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url())
    }
}

/// Sampling options sent as the `options` object of a chat request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SamplingOptions {
    /// Maximum number of tokens to generate.
    pub num_predict: u32,
    pub temperature: f32,
    /// Nucleus-sampling threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            num_predict: 500,
            temperature: 0.7,
            top_p: Some(0.9),
        }
    }
}

/// Request timeouts in milliseconds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Timeouts {
    /// Probe and model-listing requests.
    pub connection_ms: u64,
    /// Initial per-attempt timeout of a streaming chat call.
    pub stream_ms: u64,
    /// Initial per-attempt timeout of a non-streaming chat call.
    pub non_stream_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connection_ms: 10_000,
            stream_ms: 120_000,
            non_stream_ms: 60_000,
        }
    }
}

impl Timeouts {
    pub fn connection(&self) -> Duration {
        Duration::from_millis(self.connection_ms)
    }

    /// Starting ceiling for a chat call; streaming gets the larger one.
    pub fn initial_chat(&self, stream: bool) -> Duration {
        Duration::from_millis(if stream {
            self.stream_ms
        } else {
            self.non_stream_ms
        })
    }
}

/// Everything an [`InferenceClient`](crate::InferenceClient) needs.
///
/// Built once and never mutated by the client.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub endpoint: BackendEndpoint,
    pub model: String,
    pub system_prompt: String,
    pub sampling: SamplingOptions,
    pub timeouts: Timeouts,
    pub transport: TransportRetryPolicy,
    pub attempts: AttemptRetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: BackendEndpoint::default(),
            model: DEFAULT_MODEL.to_owned(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            sampling: SamplingOptions::default(),
            timeouts: Timeouts::default(),
            transport: TransportRetryPolicy::default(),
            attempts: AttemptRetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Builds a configuration from environment variables.
    ///
    /// Reads, all optional:
    /// - `EKKO_OLLAMA_HOST` — backend host (default `localhost`)
    /// - `EKKO_OLLAMA_PORT` — backend port (default `11434`)
    /// - `EKKO_OLLAMA_MODEL` — model identifier (default `llama3.2:latest`)
    /// - `EKKO_MAX_RETRIES` — attempts per chat call (default `3`)
    ///
    /// A variable that is set but empty or unparsable is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = non_empty(&lookup, "EKKO_OLLAMA_HOST")? {
            config.endpoint.host = host;
        }
        if let Some(port) = non_empty(&lookup, "EKKO_OLLAMA_PORT")? {
            config.endpoint.port = parse(&port, "EKKO_OLLAMA_PORT")?;
        }
        if let Some(model) = non_empty(&lookup, "EKKO_OLLAMA_MODEL")? {
            config.model = model;
        }
        if let Some(retries) = non_empty(&lookup, "EKKO_MAX_RETRIES")? {
            let max_attempts: u32 = parse(&retries, "EKKO_MAX_RETRIES")?;
            if max_attempts == 0 {
                return Err(InferenceError::Config(
                    "EKKO_MAX_RETRIES must be at least 1".to_owned(),
                ));
            }
            config.attempts.max_attempts = max_attempts;
        }

        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: BackendEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingOptions) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_transport_retry(mut self, policy: TransportRetryPolicy) -> Self {
        self.transport = policy;
        self
    }

    pub fn with_attempt_retry(mut self, policy: AttemptRetryPolicy) -> Self {
        self.attempts = policy;
        self
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<String>> {
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(InferenceError::Config(format!(
            "{key} is set but empty"
        ))),
        Some(value) => Ok(Some(value.trim().to_owned())),
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| InferenceError::Config(format!("{key} has invalid value '{value}'")))
}
