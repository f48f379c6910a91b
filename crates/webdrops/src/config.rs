//! Process-wide webdrops configuration.
//!
//! Built once at startup and shared read-only (`Arc<WebdropsConfig>`) by
//! every session; nothing in the crate reads the environment on its own.

use std::fmt;
use std::time::Duration;

use crate::error::{Result, WebdropsError};

/// Environment variable names.
pub mod env_vars {
    pub const USER: &str = "WEBDROPS_USER";
    pub const PASSWORD: &str = "WEBDROPS_PWD";
    pub const CLIENT_ID: &str = "WEBDROPS_CLIENT_ID";
    pub const AUTH_URL: &str = "WEBDROPS_AUTH_URL";
    pub const URL: &str = "WEBDROPS_URL";
    pub const TOKEN_LIFETIME_SECS: &str = "WEBDROPS_TOKEN_LIFETIME_SECS";
    pub const REQUEST_TIMEOUT_SECS: &str = "WEBDROPS_REQUEST_TIMEOUT_SECS";
}

/// Credentials and endpoints for the webdrops API.
#[derive(Clone)]
pub struct WebdropsConfig {
    pub username: String,
    pub password: String,
    pub client_id: String,
    /// OAuth2 token endpoint
    pub auth_url: String,
    /// Base URL for all API endpoints, always ending with `/`
    pub base_url: String,
    /// Overrides the server-advertised token lifetime when set
    pub token_lifetime: Option<Duration>,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl WebdropsConfig {
    /// Default per-request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
        auth_url: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            client_id: client_id.into(),
            auth_url: auth_url.into(),
            base_url: normalize_base_url(base_url.into()),
            token_lifetime: None,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = Some(lifetime);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Every missing required variable is reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let required = [
            env_vars::USER,
            env_vars::PASSWORD,
            env_vars::CLIENT_ID,
            env_vars::AUTH_URL,
            env_vars::URL,
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| get(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(WebdropsError::Config(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }

        let secs = |name: &str| -> Result<Option<Duration>> {
            get(name)
                .map(|v| {
                    v.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                        WebdropsError::Config(format!("{} must be a number of seconds, got '{}'", name, v))
                    })
                })
                .transpose()
        };

        let mut config = Self::new(
            get(env_vars::USER).unwrap_or_default(),
            get(env_vars::PASSWORD).unwrap_or_default(),
            get(env_vars::CLIENT_ID).unwrap_or_default(),
            get(env_vars::AUTH_URL).unwrap_or_default(),
            get(env_vars::URL).unwrap_or_default(),
        );
        config.token_lifetime = secs(env_vars::TOKEN_LIFETIME_SECS)?;
        if let Some(timeout) = secs(env_vars::REQUEST_TIMEOUT_SECS)? {
            config.request_timeout = timeout;
        }

        Ok(config)
    }
}

impl fmt::Debug for WebdropsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebdropsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("auth_url", &self.auth_url)
            .field("base_url", &self.base_url)
            .field("token_lifetime", &self.token_lifetime)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn normalize_base_url(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        let mut env = HashMap::new();
        env.insert(env_vars::USER, "user".to_string());
        env.insert(env_vars::PASSWORD, "secret".to_string());
        env.insert(env_vars::CLIENT_ID, "webdrops".to_string());
        env.insert(env_vars::AUTH_URL, "https://auth.example/token".to_string());
        env.insert(env_vars::URL, "https://webdrops.example/api".to_string());
        env
    }

    #[test]
    fn test_from_lookup() {
        let env = full_env();
        let config = WebdropsConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.username, "user");
        assert_eq!(config.base_url, "https://webdrops.example/api/");
        assert_eq!(config.token_lifetime, None);
        assert_eq!(config.request_timeout, WebdropsConfig::DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_missing_vars_reported_together() {
        let mut env = full_env();
        env.remove(env_vars::PASSWORD);
        env.insert(env_vars::URL, String::new());

        let err = WebdropsConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(env_vars::PASSWORD));
        assert!(msg.contains(env_vars::URL));
        assert!(!msg.contains(env_vars::USER));
    }

    #[test]
    fn test_optional_durations() {
        let mut env = full_env();
        env.insert(env_vars::TOKEN_LIFETIME_SECS, "120".to_string());
        env.insert(env_vars::REQUEST_TIMEOUT_SECS, "30".to_string());
        let config = WebdropsConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.token_lifetime, Some(Duration::from_secs(120)));
        assert_eq!(config.request_timeout, Duration::from_secs(30));

        env.insert(env_vars::TOKEN_LIFETIME_SECS, "soon".to_string());
        assert!(matches!(
            WebdropsConfig::from_lookup(|k| env.get(k).cloned()),
            Err(WebdropsError::Config(_))
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = WebdropsConfig::new("u", "hunter2", "c", "https://a", "https://b/");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
