use std::time::Duration;

use reqwest::{header, Response};
use serde::Serialize;
use tokio::time::sleep;

use crate::{InferenceError, Result, TransportRetryPolicy};

/// An HTTP client with status-code retry mounted beneath every request.
///
/// The retry layer only reacts to statuses in the policy's forcelist.
/// Connection errors and timeouts pass straight through to the caller.
///
/// `read_timeout` bounds each read from the socket, including the wait for
/// response headers, and resets after every successful read. A streamed body
/// that keeps producing lines never expires, however long it runs in total.
#[derive(Clone, Debug)]
pub struct Session {
    http: reqwest::Client,
    retry: TransportRetryPolicy,
}

impl Session {
    pub fn new(
        retry: &TransportRetryPolicy,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(InferenceError::Transport)?;
        Ok(Self {
            http,
            retry: retry.clone(),
        })
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send_with_retry(|| self.http.get(url)).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response> {
        self.send_with_retry(|| {
            self.http
                .post(url)
                .header(header::CONTENT_TYPE, "application/json")
                .json(body)
        })
        .await
    }

    /// Sends the request built by `build`, resending on retryable statuses.
    ///
    /// Returns the response only when its status is a success.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retry = 0u32;
        loop {
            let response = build().send().await.map_err(InferenceError::Transport)?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if self.retry.should_retry(status) {
                if retry < self.retry.total {
                    let delay = self.retry.delay(retry);
                    tracing::debug!(
                        status = status.as_u16(),
                        retry = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying request on server status"
                    );
                    sleep(delay).await;
                    retry += 1;
                    continue;
                }

                return Err(InferenceError::RetriesExhausted {
                    status: status.as_u16(),
                    retries: self.retry.total,
                });
            }

            let body = response.text().await.map_err(InferenceError::Transport)?;
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body,
            });
        }
    }
}
