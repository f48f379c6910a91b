//! Authenticated GET/POST with bounded retry.
//!
//! Each attempt first asks the session for a (possibly refreshed) token. Auth
//! and transport failures are retried with linear backoff; a 200 response with
//! the wrong content type is returned at once as an upstream contract
//! violation.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, WebdropsError};
use crate::session::Session;
use crate::transport::{HttpRequest, RequestBody};

/// Retry budget and backoff for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, at least 1
    pub max_attempts: u32,
    /// Sleep after failed attempt `i` is `i * backoff_step`
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step,
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Retrying webdrops client over an exclusively owned [`Session`].
pub struct WebdropsClient {
    session: Session,
    policy: RetryPolicy,
}

impl WebdropsClient {
    pub fn new(session: Session, policy: RetryPolicy) -> Self {
        Self { session, policy }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Build an endpoint URL relative to the configured base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.session.config().base_url, path)
    }

    /// GET `url`, optionally requiring a response content type.
    pub async fn get(&mut self, url: &str, expected_content_type: Option<&str>) -> Result<Bytes> {
        self.send(Method::GET, url, RequestBody::Empty, expected_content_type)
            .await
    }

    /// POST a JSON body to `url`.
    pub async fn post<B: Serialize + ?Sized>(&mut self, url: &str, body: &B) -> Result<Bytes> {
        let body = serde_json::to_value(body)
            .map_err(|e| WebdropsError::decode("request body", e))?;
        self.send(Method::POST, url, RequestBody::Json(body), None)
            .await
    }

    async fn send(
        &mut self,
        method: Method,
        url: &str,
        body: RequestBody,
        expected_content_type: Option<&str>,
    ) -> Result<Bytes> {
        info!(method = %method, url = %url, "Dispatching request");

        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self
                .attempt(&method, url, &body, expected_content_type)
                .await
            {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() => {
                    warn!(
                        method = %method,
                        url = %url,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "Request failed, retrying"
                    );
                    last_error = Some(e);

                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(WebdropsError::RetriesExhausted {
            method: method.to_string(),
            url: url.to_string(),
            attempts,
            source: Box::new(last_error.unwrap_or_else(|| WebdropsError::Transport {
                url: url.to_string(),
                status: None,
                message: "no attempt was made".to_string(),
            })),
        })
    }

    async fn attempt(
        &mut self,
        method: &Method,
        url: &str,
        body: &RequestBody,
        expected_content_type: Option<&str>,
    ) -> Result<Bytes> {
        let token = self.session.refresh_if_needed().await?.to_string();

        let request = HttpRequest {
            method: method.clone(),
            url: url.to_string(),
            bearer: Some(token),
            body: body.clone(),
        };
        let response = self.session.transport().execute(request).await?;

        if response.status != StatusCode::OK {
            return Err(WebdropsError::Transport {
                url: url.to_string(),
                status: Some(response.status.as_u16()),
                message: response.body_snippet(),
            });
        }

        if let Some(expected) = expected_content_type {
            if !response.has_content_type(expected) {
                return Err(WebdropsError::ContentType {
                    url: url.to_string(),
                    expected: expected.to_string(),
                    actual: response
                        .content_type
                        .clone()
                        .unwrap_or_else(|| "<none>".to_string()),
                });
            }
        }

        Ok(response.body)
    }
}
