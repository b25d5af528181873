use std::fmt;
use std::time::Duration;

use tokio::time::sleep;

use crate::{
    wire::{ChatMessage, ChatReply, ChatRequest, ModelInfo, TagsResponse},
    ChatResponse, ChatStream, ClientConfig, InferenceError, Result, Session,
};

#[derive(Clone)]
/// Client for a locally hosted Ollama chat backend.
///
/// Every chat call is gated by a liveness probe and then runs an attempt
/// loop on top of the transport-level status retry of its [`Session`].
pub struct InferenceClient {
    config: ClientConfig,
}

impl fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceClient")
            .field("base_url", &self.config.endpoint.base_url())
            .field("model", &self.config.model)
            .finish()
    }
}

impl Default for InferenceClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl InferenceClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Creates a client from `EKKO_*` environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        ClientConfig::from_env().map(Self::new)
    }

    /// Replaces the client configuration.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds a fresh session carrying the transport retry policy.
    ///
    /// Connecting is bounded by the connection timeout, every read after
    /// that by `read_timeout`.
    pub fn build_session(&self, read_timeout: Duration) -> Result<Session> {
        Session::new(
            &self.config.transport,
            self.config.timeouts.connection(),
            read_timeout,
        )
    }

    /// Returns true only if the model-listing endpoint answers 200.
    ///
    /// Never fails: any error is reported as `false`.
    pub async fn probe_backend(&self) -> bool {
        let url = self.config.endpoint.tags_url();
        let probe = match self.build_session(self.config.timeouts.connection()) {
            Ok(session) => session.get(&url).await,
            Err(err) => Err(err),
        };
        match probe {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(err) => {
                tracing::debug!("backend probe failed: {err}");
                false
            }
        }
    }

    /// Lists the models installed on the backend.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .build_session(self.config.timeouts.connection())?
            .get(&self.config.endpoint.tags_url())
            .await?;
        let body = response.text().await.map_err(InferenceError::Transport)?;
        let tags: TagsResponse = serde_json::from_str(&body).map_err(|err| {
            InferenceError::Decode(format!("invalid model list JSON: {err}; body: {body}"))
        })?;
        Ok(tags.models)
    }

    /// Returns true if `name` is among the installed models.
    pub async fn has_model(&self, name: &str) -> Result<bool> {
        Ok(self
            .list_models()
            .await?
            .iter()
            .any(|model| model.name == name))
    }

    /// Sends `prompt` to the chat endpoint.
    ///
    /// Fails with [`InferenceError::Unavailable`] without sending anything
    /// when the probe fails. Timed-out attempts are retried with an
    /// exponential wait and a growing timeout, ending in
    /// [`InferenceError::Timeout`]. Any other failure is retried after a
    /// flat wait and returned unchanged once attempts run out.
    pub async fn chat(&self, prompt: &str, stream: bool) -> Result<ChatResponse> {
        if !self.probe_backend().await {
            tracing::error!(
                url = %self.config.endpoint.base_url(),
                "inference backend is not running"
            );
            return Err(InferenceError::Unavailable {
                url: self.config.endpoint.base_url(),
            });
        }

        let payload = self.chat_request(prompt, stream);
        let attempts = &self.config.attempts;
        let mut timeout = self.config.timeouts.initial_chat(stream);
        let mut attempt = 0u32;

        loop {
            tracing::info!(
                attempt = attempt + 1,
                max_attempts = attempts.max_attempts,
                timeout_ms = timeout.as_millis() as u64,
                stream,
                model = %self.config.model,
                "sending chat request"
            );

            let err = match self.send_chat(&payload, timeout).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            let timed_out = err.is_timeout();
            if timed_out {
                tracing::warn!(attempt = attempt + 1, "chat attempt timed out: {err}");
            } else {
                tracing::warn!(attempt = attempt + 1, "chat attempt failed: {err}");
            }

            match attempts.next_step(attempt, timeout, &err) {
                Some(step) => {
                    tracing::debug!(
                        delay_ms = step.delay.as_millis() as u64,
                        next_timeout_ms = step.timeout.as_millis() as u64,
                        "waiting before next chat attempt"
                    );
                    sleep(step.delay).await;
                    timeout = step.timeout;
                    attempt += 1;
                }
                None if timed_out => {
                    tracing::error!("every chat attempt timed out");
                    return Err(InferenceError::Timeout {
                        attempts: attempts.max_attempts,
                    });
                }
                None => return Err(err),
            }
        }
    }

    fn chat_request(&self, prompt: &str, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(self.config.system_prompt.as_str()),
                ChatMessage::user(prompt),
            ],
            stream,
            options: self.config.sampling.clone(),
        }
    }

    /// One attempt: a fresh session, one POST, and for non-streaming calls
    /// the full body read and decoded.
    pub(crate) async fn send_chat(
        &self,
        payload: &ChatRequest,
        timeout: Duration,
    ) -> Result<ChatResponse> {
        let response = self
            .build_session(timeout)?
            .post_json(&self.config.endpoint.chat_url(), payload)
            .await?;

        if payload.stream {
            return Ok(ChatResponse::Streaming(ChatStream::new(response)));
        }

        let body = response.text().await.map_err(InferenceError::Transport)?;
        serde_json::from_str::<ChatReply>(&body)
            .map(ChatResponse::Complete)
            .map_err(|err| {
                InferenceError::Decode(format!("invalid chat response JSON: {err}; body: {body}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::InferenceClient;
    use crate::{wire::Role, BackendEndpoint, ClientConfig};

    #[test]
    fn chat_request_puts_persona_before_prompt() {
        let client = InferenceClient::new(ClientConfig::default().with_system_prompt("persona"));
        let request = client.chat_request("how is my soil?", true);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "persona");
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, "how is my soil?");
        assert!(request.stream);
        assert_eq!(request.model, "llama3.2:latest");
    }

    #[test]
    fn debug_shows_endpoint_and_model() {
        let client = InferenceClient::new(
            ClientConfig::default().with_endpoint(BackendEndpoint::new("gpu-box", 9000)),
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("http://gpu-box:9000"));
        assert!(debug.contains("llama3.2:latest"));
    }
}
