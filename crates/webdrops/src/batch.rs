//! Concurrent fan-out of per-instant fetch jobs.
//!
//! Every instant gets its own task and its own logged-in session. A failing
//! worker never cancels its siblings; all failures are kept, and the first one
//! enqueued is what [`BatchOutcome::into_result`] surfaces.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::client::{RetryPolicy, WebdropsClient};
use crate::config::WebdropsConfig;
use crate::error::{Result, WebdropsError};
use crate::session::Session;
use crate::time::format_hour;
use crate::transport::Transport;

/// A failed fetch for one instant.
#[derive(Debug)]
pub struct InstantFailure<E> {
    pub instant: DateTime<Utc>,
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for InstantFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch for {} failed: {}", format_hour(&self.instant), self.error)
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for InstantFailure<E> {}

/// Result of a batch: how many instants ran and every failure, in the order
/// the workers reported them.
#[derive(Debug)]
pub struct BatchOutcome<E> {
    pub attempted: usize,
    pub failures: Vec<InstantFailure<E>>,
}

impl<E> BatchOutcome<E> {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.attempted.saturating_sub(self.failures.len())
    }

    /// The first failure enqueued.
    pub fn first_error(&self) -> Option<&InstantFailure<E>> {
        self.failures.first()
    }

    /// `Ok` if every worker succeeded, otherwise the first failure enqueued.
    pub fn into_result(self) -> std::result::Result<(), InstantFailure<E>> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Spawns one independent worker per instant.
#[derive(Clone)]
pub struct BatchFetcher {
    config: Arc<WebdropsConfig>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl BatchFetcher {
    pub fn new(
        config: Arc<WebdropsConfig>,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            config,
            transport,
            policy,
        }
    }

    /// A fresh, logged-in client for a single actor.
    pub async fn connect(&self) -> Result<WebdropsClient> {
        connect(self.config.clone(), self.transport.clone(), self.policy).await
    }

    /// Run `fetch_one` for every instant in parallel and wait for all of them.
    pub async fn fetch_all<F, Fut, E>(
        &self,
        instants: &[DateTime<Utc>],
        fetch_one: F,
    ) -> BatchOutcome<E>
    where
        F: Fn(WebdropsClient, DateTime<Utc>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: From<WebdropsError> + fmt::Display + Send + 'static,
    {
        let fetch_one = Arc::new(fetch_one);
        // one slot per worker, so try_send never finds the channel full
        let (tx, mut rx) = mpsc::channel::<InstantFailure<E>>(instants.len().max(1));

        let mut workers = Vec::with_capacity(instants.len());
        for &instant in instants {
            let tx = tx.clone();
            let fetch_one = fetch_one.clone();
            let config = self.config.clone();
            let transport = self.transport.clone();
            let policy = self.policy;

            let handle = tokio::spawn(async move {
                let result = match connect(config, transport, policy).await {
                    Ok(client) => (*fetch_one)(client, instant).await,
                    Err(e) => Err(E::from(e.context(format!(
                        "logging in for {}",
                        format_hour(&instant)
                    )))),
                };

                if let Err(error) = result {
                    warn!(instant = %format_hour(&instant), error = %error, "Worker failed");
                    if tx.try_send(InstantFailure { instant, error }).is_err() {
                        error!(instant = %format_hour(&instant), "Error channel full, failure dropped");
                    }
                }
            });
            workers.push((instant, handle));
        }
        drop(tx);

        let (instants_spawned, handles): (Vec<_>, Vec<_>) = workers.into_iter().unzip();
        let joined = join_all(handles).await;

        let mut failures = Vec::new();
        while let Ok(failure) = rx.try_recv() {
            failures.push(failure);
        }
        for (instant, joined) in instants_spawned.into_iter().zip(joined) {
            if let Err(join_error) = joined {
                failures.push(InstantFailure {
                    instant,
                    error: E::from(WebdropsError::Worker(join_error.to_string())),
                });
            }
        }

        info!(
            attempted = instants.len(),
            failed = failures.len(),
            "Batch fetch complete"
        );

        BatchOutcome {
            attempted: instants.len(),
            failures,
        }
    }
}

async fn connect(
    config: Arc<WebdropsConfig>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
) -> Result<WebdropsClient> {
    let mut session = Session::new(config, transport);
    session.login().await?;
    Ok(WebdropsClient::new(session, policy))
}
