/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The pre-flight probe against the model-listing endpoint failed.
    #[error("inference backend is not running at {url} (start it with `ollama serve`)")]
    Unavailable { url: String },
    /// Every attempt of a chat call ended in a read timeout.
    #[error("inference backend timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// A retryable status (429/5xx) persisted through every transport retry.
    #[error("transport retries exhausted after {retries} retries: last status {status}")]
    RetriesExhausted { status: u16, retries: u32 },
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl InferenceError {
    /// Returns true for read timeouts reported by the transport.
    ///
    /// A connect timeout is a connection failure, not a slow backend.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout() && !err.is_connect())
    }
}
