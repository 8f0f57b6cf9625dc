/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Retry/backoff controller for connection attempts.
//!
//! [`run_with_retry`] wraps one connect sequence. Retryable failures
//! ([`SessionError::is_retryable`]) are retried after an exponential, capped
//! backoff until the attempt budget is spent; everything else is returned
//! immediately. The abort token is checked before each attempt, before a
//! backoff is scheduled and before an attempt's result is applied, and every
//! await races against it, so a disconnect during a backoff window never
//! produces a late reconnect.

use log::{debug, warn};
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;

use crate::abort::AbortToken;
use crate::error::SessionError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows failure number `attempt` (1-based):
    /// `min(base * 2^(attempt - 1), max_delay)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Failure count for the current connection. Survives across attempts and
/// resets only on a successful peer connection or an explicit new `connect()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
}

impl RetryState {
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record one failed attempt and return the new failure count.
    pub fn record_failure(&mut self) -> u32 {
        self.attempt = self.attempt.saturating_add(1);
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn is_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempt >= policy.max_attempts
    }
}

/// Passed to the retry callback while a backoff is pending ("still trying").
#[derive(Debug, Clone)]
pub struct RetryNotice {
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub error: SessionError,
}

/// Run `op` until it succeeds, fails terminally, exhausts the budget or is aborted.
///
/// `op` receives the 1-based number of the attempt it is performing.
pub async fn run_with_retry<T, F, Fut, N>(
    policy: &RetryPolicy,
    state: &Mutex<RetryState>,
    token: &AbortToken,
    mut on_retry: N,
    mut op: F,
) -> Result<T, SessionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
    N: FnMut(&RetryNotice),
{
    loop {
        token.check()?;
        let attempt_no = state.lock().attempt() + 1;

        let result = tokio::select! {
            biased;
            _ = token.aborted() => return Err(SessionError::Aborted),
            result = op(attempt_no) => result,
        };

        if !token.is_current() {
            debug!("Discarding result of superseded attempt {attempt_no}");
            return Err(SessionError::Aborted);
        }

        let error = match result {
            Ok(value) => return Ok(value),
            Err(SessionError::Aborted) => return Err(SessionError::Aborted),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => e,
        };

        let failures = state.lock().record_failure();
        if failures >= policy.max_attempts {
            return Err(SessionError::RetryExhausted {
                attempts: failures,
                last: Box::new(error),
            });
        }

        token.check()?;
        let delay = policy.backoff(failures);
        warn!(
            "Attempt {failures}/{} failed: {error}; retrying in {delay:?}",
            policy.max_attempts
        );
        on_retry(&RetryNotice {
            attempt: failures,
            max_attempts: policy.max_attempts,
            delay,
            error,
        });

        backoff_sleep(delay, token).await?;
    }
}

/// Sleep for `delay`, returning `Err(Aborted)` as soon as `token` is aborted.
pub async fn backoff_sleep(delay: Duration, token: &AbortToken) -> Result<(), SessionError> {
    tokio::select! {
        biased;
        _ = token.aborted() => Err(SessionError::Aborted),
        _ = tokio::time::sleep(delay) => token.check(),
    }
}
