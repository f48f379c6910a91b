//! Access layer for the webdrops telemetry API.
//!
//! Provides an OAuth2 session with lazy token refresh, a retrying client for
//! the sensor and radar endpoints, reconciliation of radar timelines across
//! layers, and a batch orchestrator that fetches several instants
//! concurrently.
//!
//! # Architecture
//!
//! - [`Session`] owns one token pair; one per concurrent worker, never shared
//! - [`WebdropsClient`] wraps a session with bounded retry and linear backoff
//! - [`TimelineResolver`] finds the instant shared by all radar layers
//! - [`BatchFetcher`] fans out one worker per instant and keeps every failure
//! - [`filter_by_domain`] narrows a sensor registry to a bounding box

pub mod batch;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod radar;
pub mod sensors;
pub mod session;
pub mod time;
pub mod timeline;
pub mod transport;

pub use batch::{BatchFetcher, BatchOutcome, InstantFailure};
pub use client::{RetryPolicy, WebdropsClient};
pub use config::WebdropsConfig;
pub use domain::{filter_by_domain, Domain, SensorRecord};
pub use error::{Result, WebdropsError};
pub use radar::RadarVariable;
pub use sensors::{MapArea, SensorClass, SensorGroup};
pub use session::Session;
pub use timeline::{intersect, intersect_all, select_best_instant, TimelineResolver};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, RequestBody, Transport};
