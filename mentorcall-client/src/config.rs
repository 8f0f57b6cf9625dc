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

//! Client configuration.
//!
//! Every timing threshold used by the lifecycle manager is a policy
//! parameter with a default, overridable from the environment.

use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Timing of the waiting room → active call handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffTiming {
    /// How long this participant must have been connected before the status
    /// poll starts (default: 5s).
    pub min_dwell: Duration,
    /// Interval between status polls (default: 1s).
    pub poll_interval: Duration,
    /// How long the privileged participant waits after broadcasting
    /// `session_started` before advancing its own view (default: 2s).
    pub start_delay: Duration,
}

impl Default for HandoffTiming {
    fn default() -> Self {
        Self {
            min_dwell: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            start_delay: Duration::from_secs(2),
        }
    }
}

/// Configuration for the session client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub retry: RetryPolicy,
    pub handoff: HandoffTiming,
    /// Interval of the remote participant snapshot refresh (default: 2s).
    pub participant_refresh_interval: Duration,
    /// Upper bound on one transport handshake (default: 15s).
    pub connect_timeout: Duration,
    /// Participants required for readiness (default: 2).
    pub expected_participants: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            handoff: HandoffTiming::default(),
            participant_refresh_interval: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(15),
            expected_participants: 2,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// # Optional
    /// - `MENTORCALL_MAX_ATTEMPTS` (default: `3`)
    /// - `MENTORCALL_RETRY_BASE_MS` (default: `1000`)
    /// - `MENTORCALL_RETRY_MAX_MS` (default: `8000`)
    /// - `MENTORCALL_MIN_DWELL_MS` (default: `5000`)
    /// - `MENTORCALL_POLL_INTERVAL_MS` (default: `1000`)
    /// - `MENTORCALL_START_DELAY_MS` (default: `2000`)
    /// - `MENTORCALL_PARTICIPANT_REFRESH_MS` (default: `2000`)
    /// - `MENTORCALL_CONNECT_TIMEOUT_MS` (default: `15000`)
    /// - `MENTORCALL_EXPECTED_PARTICIPANTS` (default: `2`)
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| -> Result<Duration, String> {
            match lookup(key).filter(|s| !s.is_empty()) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| format!("{key} must be a whole number of milliseconds")),
                None => Ok(default),
            }
        };

        let max_attempts = match lookup("MENTORCALL_MAX_ATTEMPTS").filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| "MENTORCALL_MAX_ATTEMPTS must be a valid integer".to_string())?,
            None => defaults.retry.max_attempts,
        };
        let expected_participants =
            match lookup("MENTORCALL_EXPECTED_PARTICIPANTS").filter(|s| !s.is_empty()) {
                Some(raw) => raw.parse::<usize>().map_err(|_| {
                    "MENTORCALL_EXPECTED_PARTICIPANTS must be a valid integer".to_string()
                })?,
                None => defaults.expected_participants,
            };

        let config = Self {
            retry: RetryPolicy {
                max_attempts,
                base_delay: millis("MENTORCALL_RETRY_BASE_MS", defaults.retry.base_delay)?,
                max_delay: millis("MENTORCALL_RETRY_MAX_MS", defaults.retry.max_delay)?,
            },
            handoff: HandoffTiming {
                min_dwell: millis("MENTORCALL_MIN_DWELL_MS", defaults.handoff.min_dwell)?,
                poll_interval: millis(
                    "MENTORCALL_POLL_INTERVAL_MS",
                    defaults.handoff.poll_interval,
                )?,
                start_delay: millis("MENTORCALL_START_DELAY_MS", defaults.handoff.start_delay)?,
            },
            participant_refresh_interval: millis(
                "MENTORCALL_PARTICIPANT_REFRESH_MS",
                defaults.participant_refresh_interval,
            )?,
            connect_timeout: millis("MENTORCALL_CONNECT_TIMEOUT_MS", defaults.connect_timeout)?,
            expected_participants,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.retry.max_attempts == 0 {
            return Err("MENTORCALL_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err("MENTORCALL_RETRY_MAX_MS must not be below MENTORCALL_RETRY_BASE_MS".into());
        }
        if self.handoff.poll_interval.is_zero() || self.participant_refresh_interval.is_zero() {
            return Err("poll and refresh intervals must be non-zero".to_string());
        }
        if self.expected_participants < 2 {
            return Err("MENTORCALL_EXPECTED_PARTICIPANTS must be at least 2".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.handoff.min_dwell, Duration::from_secs(5));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("MENTORCALL_MAX_ATTEMPTS", "5"),
            ("MENTORCALL_MIN_DWELL_MS", "2500"),
            ("MENTORCALL_POLL_INTERVAL_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.handoff.min_dwell, Duration::from_millis(2500));
        assert_eq!(config.handoff.poll_interval, Duration::from_millis(250));
        assert_eq!(config.handoff.start_delay, Duration::from_secs(2));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("MENTORCALL_RETRY_BASE_MS", "soon")]))
            .unwrap_err();
        assert!(err.contains("MENTORCALL_RETRY_BASE_MS"));

        assert!(ClientConfig::from_lookup(lookup(&[("MENTORCALL_MAX_ATTEMPTS", "0")])).is_err());
        assert!(
            ClientConfig::from_lookup(lookup(&[("MENTORCALL_POLL_INTERVAL_MS", "0")])).is_err()
        );
    }
}
