//! OAuth2 session with lazy token refresh.
//!
//! A session is owned by exactly one worker. The bearer token is only handed
//! out by [`Session::refresh_if_needed`], so every use is preceded by a
//! refresh check.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::config::WebdropsConfig;
use crate::error::{Result, WebdropsError};
use crate::transport::{HttpRequest, RequestBody, Transport};

/// Lifetime assumed when neither the server nor the configuration provides one.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct TokenPair {
    access_token: String,
    refresh_token: String,
    lifetime: Duration,
    last_refreshed: DateTime<Utc>,
}

/// One access/refresh token pair and its expiry clock.
pub struct Session {
    config: Arc<WebdropsConfig>,
    transport: Arc<dyn Transport>,
    tokens: Option<TokenPair>,
}

impl Session {
    pub fn new(config: Arc<WebdropsConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            tokens: None,
        }
    }

    pub fn config(&self) -> &WebdropsConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.tokens.is_some()
    }

    /// Instant of the last successful login or refresh.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.tokens.as_ref().map(|t| t.last_refreshed)
    }

    /// Effective token lifetime.
    pub fn token_lifetime(&self) -> Option<Duration> {
        self.tokens.as_ref().map(|t| t.lifetime)
    }

    /// Password grant. Must succeed before any authenticated call.
    #[instrument(skip(self), fields(user = %self.config.username))]
    pub async fn login(&mut self) -> Result<()> {
        let form = vec![
            ("client_id".to_string(), self.config.client_id.clone()),
            ("grant_type".to_string(), "password".to_string()),
            ("username".to_string(), self.config.username.clone()),
            ("password".to_string(), self.config.password.clone()),
        ];

        let tokens = self.request_tokens(form, Utc::now()).await?;
        info!(lifetime_secs = tokens.lifetime.as_secs(), "Logged in to webdrops");
        self.tokens = Some(tokens);
        Ok(())
    }

    /// Refresh the token pair if half its lifetime has elapsed and return the
    /// bearer token.
    pub async fn refresh_if_needed(&mut self) -> Result<&str> {
        self.refresh_if_needed_at(Utc::now()).await
    }

    /// [`refresh_if_needed`](Self::refresh_if_needed) against an explicit clock.
    pub async fn refresh_if_needed_at(&mut self, now: DateTime<Utc>) -> Result<&str> {
        let current = self
            .tokens
            .as_ref()
            .ok_or_else(|| WebdropsError::Auth("session is not logged in".to_string()))?;

        if needs_refresh(current.last_refreshed, current.lifetime, now) {
            debug!(last_refreshed = %current.last_refreshed, "Refreshing access token");
            let form = vec![
                ("client_id".to_string(), self.config.client_id.clone()),
                ("grant_type".to_string(), "refresh_token".to_string()),
                ("refresh_token".to_string(), current.refresh_token.clone()),
            ];
            let refreshed = self.request_tokens(form, now).await?;
            self.tokens = Some(refreshed);
        }

        // set above or by login
        match &self.tokens {
            Some(tokens) => Ok(tokens.access_token.as_str()),
            None => Err(WebdropsError::Auth("session is not logged in".to_string())),
        }
    }

    async fn request_tokens(
        &self,
        form: Vec<(String, String)>,
        now: DateTime<Utc>,
    ) -> Result<TokenPair> {
        let request = HttpRequest::post(self.config.auth_url.clone(), RequestBody::Form(form));

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| WebdropsError::Auth(e.to_string()))?;

        if response.status != StatusCode::OK {
            return Err(WebdropsError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                response.status,
                response.body_snippet()
            )));
        }

        let parsed: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| WebdropsError::Auth(format!("malformed token response: {}", e)))?;

        let lifetime = self
            .config
            .token_lifetime
            .or_else(|| parsed.expires_in.map(Duration::from_secs))
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        Ok(TokenPair {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            lifetime,
            last_refreshed: now,
        })
    }
}

/// Tokens are refreshed once half their lifetime has elapsed.
pub fn needs_refresh(last_refreshed: DateTime<Utc>, lifetime: Duration, now: DateTime<Utc>) -> bool {
    let elapsed = (now - last_refreshed).to_std().unwrap_or(Duration::ZERO);
    elapsed >= lifetime / 2
}
