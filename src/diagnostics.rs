//! Step-by-step health check of the inference backend.
//!
//! Runs the service probe, model lookup, a short non-streaming request and a
//! short streaming request, stopping at the first failing check.

use std::fmt;
use std::time::{Duration, Instant};

use crate::{
    wire::{ChatMessage, ChatRequest},
    ChatResponse, InferenceClient, SamplingOptions,
};

const SIMPLE_TIMEOUT: Duration = Duration::from_secs(30);
const STREAMING_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of one diagnostic check.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
    pub elapsed: Duration,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiagnosticReport {
    /// Checks in the order they ran; stops after the first failure.
    pub checks: Vec<CheckOutcome>,
}

impl DiagnosticReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    pub fn first_failure(&self) -> Option<&CheckOutcome> {
        self.checks.iter().find(|check| !check.passed)
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "diagnostic summary:")?;
        for check in &self.checks {
            let status = if check.passed { "PASSED" } else { "FAILED" };
            writeln!(f, "  {}: {status} ({})", check.name, check.detail)?;
        }
        if self.all_passed() {
            write!(f, "all checks passed, the inference backend is working")
        } else {
            write!(f, "some checks failed, see the details above")
        }
    }
}

/// Runs diagnostic checks through an [`InferenceClient`].
#[derive(Debug)]
pub struct Diagnostics<'a> {
    client: &'a InferenceClient,
}

impl<'a> Diagnostics<'a> {
    pub fn new(client: &'a InferenceClient) -> Self {
        Self { client }
    }

    pub async fn run(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport::default();

        let steps: [(&'static str, Step); 4] = [
            ("backend service", Step::Service),
            ("model available", Step::Model),
            ("simple request", Step::Simple),
            ("streaming request", Step::Streaming),
        ];

        for (name, step) in steps {
            let started = Instant::now();
            let result = match step {
                Step::Service => self.check_service().await,
                Step::Model => self.check_model().await,
                Step::Simple => self.check_simple_request().await,
                Step::Streaming => self.check_streaming_request().await,
            };
            let elapsed = started.elapsed();

            let (passed, detail) = match result {
                Ok(detail) => (true, detail),
                Err(detail) => (false, detail),
            };
            if passed {
                tracing::info!(check = name, elapsed_ms = elapsed.as_millis() as u64, "{detail}");
            } else {
                tracing::warn!(check = name, "{detail}");
            }
            report.checks.push(CheckOutcome {
                name,
                passed,
                detail,
                elapsed,
            });
            if !passed {
                break;
            }
        }

        report
    }

    async fn check_service(&self) -> Result<String, String> {
        if self.client.probe_backend().await {
            Ok("backend is running".to_owned())
        } else {
            Err(format!(
                "could not reach {} (is `ollama serve` running?)",
                self.client.config().endpoint.base_url()
            ))
        }
    }

    async fn check_model(&self) -> Result<String, String> {
        let model = &self.client.config().model;
        let models = self
            .client
            .list_models()
            .await
            .map_err(|err| format!("could not list models: {err}"))?;

        if models.iter().any(|info| &info.name == model) {
            Ok(format!("model {model} is available"))
        } else {
            let names: Vec<&str> = models.iter().map(|info| info.name.as_str()).collect();
            Err(format!(
                "model {model} not found (installed: [{}]); run `ollama pull {model}`",
                names.join(", ")
            ))
        }
    }

    async fn check_simple_request(&self) -> Result<String, String> {
        let payload = self.request("Reply only 'OK'", false, 10);
        let response = self
            .client
            .send_chat(&payload, SIMPLE_TIMEOUT)
            .await
            .map_err(|err| describe_failure(err, SIMPLE_TIMEOUT))?;
        let text = response
            .into_text()
            .await
            .map_err(|err| describe_failure(err, SIMPLE_TIMEOUT))?;
        Ok(format!("reply: {}", text.trim()))
    }

    async fn check_streaming_request(&self) -> Result<String, String> {
        let payload = self.request("Count to 3", true, 20);
        let response = self
            .client
            .send_chat(&payload, STREAMING_TIMEOUT)
            .await
            .map_err(|err| describe_failure(err, STREAMING_TIMEOUT))?;

        let mut stream = match response {
            ChatResponse::Streaming(stream) => stream,
            ChatResponse::Complete(_) => return Err("backend did not stream".to_owned()),
        };

        let mut chunks = 0usize;
        let mut text = String::new();
        while let Some(chunk) = stream
            .next_chunk()
            .await
            .map_err(|err| describe_failure(err, STREAMING_TIMEOUT))?
        {
            if !chunk.message.content.is_empty() {
                chunks += 1;
                text.push_str(&chunk.message.content);
            }
        }
        Ok(format!("{chunks} chunks received, reply: {}", text.trim()))
    }

    fn request(&self, prompt: &str, stream: bool, num_predict: u32) -> ChatRequest {
        ChatRequest {
            model: self.client.config().model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            stream,
            options: SamplingOptions {
                num_predict,
                temperature: 0.1,
                top_p: None,
            },
        }
    }
}

#[derive(Clone, Copy)]
enum Step {
    Service,
    Model,
    Simple,
    Streaming,
}

fn describe_failure(err: crate::InferenceError, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("request timed out ({}s)", timeout.as_secs())
    } else {
        format!("request failed: {err}")
    }
}
