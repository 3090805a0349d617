//! Connect-phase retry
//!
//! Only opening a provider connection is retried, and only for transport
//! failures (`VideoError::is_retryable`). Once a response is open nothing is
//! replayed, so a stream never yields the same chunk twice.
//!
//! Delays come from the `backoff` crate, the same schedule type the metadata
//! fetcher uses; the attempt budget is counted here.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;

use crate::error::{Result, VideoError};

/// How connection attempts are repeated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectRetry {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for ConnectRetry {
    /// One retry after roughly half a second.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl ConnectRetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, never retried.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(if self.jitter { 0.1 } else { 0.0 })
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `connect` until it succeeds, fails permanently or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut connect: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        backoff::future::retry_notify(
            self.schedule(),
            || {
                attempt += 1;
                let current = attempt;
                let pending = connect();
                async move {
                    pending.await.map_err(|error| {
                        if error.is_retryable() && current < max_attempts {
                            backoff::Error::transient(error)
                        } else {
                            backoff::Error::permanent(error)
                        }
                    })
                }
            },
            |error: VideoError, delay: Duration| {
                tracing::warn!(
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "transient failure, retrying"
                );
            },
        )
        .await
    }
}
