//! Common test fixtures for webdrops tests.
//!
//! This module provides pre-defined upstream payloads and a configuration
//! that points at the [`FakeTransport`](crate::FakeTransport) endpoints.

use std::sync::Arc;
use std::time::Duration;

use webdrops::{RetryPolicy, WebdropsConfig};

/// Token endpoint used by the test configuration.
pub const AUTH_URL: &str = "https://auth.webdrops.test/token";

/// Base URL used by the test configuration.
pub const BASE_URL: &str = "https://webdrops.test/api/";

/// Configuration pointing at the fake endpoints.
pub fn test_config() -> WebdropsConfig {
    WebdropsConfig::new("tester", "secret", "webdrops-test", AUTH_URL, BASE_URL)
}

pub fn shared_config() -> Arc<WebdropsConfig> {
    Arc::new(test_config())
}

/// Default attempt budget without sleeping between attempts.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::ZERO)
}

/// OAuth2 token response body.
pub fn token_response(access: &str, refresh: &str, expires_in: u64) -> String {
    serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": expires_in,
        "token_type": "Bearer"
    })
    .to_string()
}

/// Sensor registry body from `(id, lat, lon)` triples.
pub fn registry(sensors: &[(&str, f64, f64)]) -> String {
    let entries: Vec<serde_json::Value> = sensors
        .iter()
        .map(|(id, lat, lon)| {
            serde_json::json!({
                "ID": id,
                "Lat": lat,
                "Lng": lon,
                "Name": format!("station {}", id)
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

/// Radar timeline body.
pub fn timeline(instants: &[&str]) -> String {
    serde_json::json!(instants).to_string()
}

/// Common registries for testing.
pub mod registries {
    /// Three stations inside the Italy domain and one north of it.
    pub const MIXED: &[(&str, f64, f64)] = &[
        ("rome", 41.9, 12.5),
        ("tunis", 36.8, 10.2),
        ("milan", 45.46, 9.19),
        ("tromso", 69.6, 18.9),
    ];

    pub const EMPTY: &[(&str, f64, f64)] = &[];
}
