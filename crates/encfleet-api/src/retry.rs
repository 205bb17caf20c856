// Explicit retry policy
//
// Passed into each network call site that may retry (login, push) rather
// than being attached implicitly to the call itself. Only errors the
// policy's predicate accepts are retried; everything else returns on the
// first failure.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Error;

/// How many times to attempt a call, how long to wait between attempts,
/// and which errors qualify for another attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub delay: Duration,
    /// Decides whether an error is worth another attempt.
    pub is_retryable: fn(&Error) -> bool,
}

impl Default for RetryPolicy {
    /// Three attempts, two seconds apart, connection-level errors only.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            is_retryable: Error::is_transient,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && (self.is_retryable)(&err) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %err,
                        "transient failure, retrying in {:?}",
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
