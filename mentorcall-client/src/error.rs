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

//! Error taxonomy surfaced by the connection lifecycle manager.

use mentorcall_session_client::ApiError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The user refused camera/microphone access. Callers continue without media.
    #[error("Device access denied: {0}")]
    PermissionDenied(String),

    /// No camera or microphone could be enumerated. Callers continue without media.
    #[error("No media devices found")]
    NoDevicesFound,

    /// The caller must re-authenticate.
    #[error("Not authenticated. Please log in.")]
    Unauthorized,

    /// The caller is not a party to this session.
    #[error("Not authorized for this session: {0}")]
    SessionNotAuthorized(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timed out after {after:?} while {stage}")]
    Timeout {
        after: Duration,
        stage: &'static str,
    },

    /// Transient transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer transport cannot traverse the local network (NAT/firewall).
    #[error("Network configuration failure: {0}")]
    NetworkConfigurationFailure(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<SessionError>,
    },

    /// Superseded by a newer attempt or by a disconnect.
    #[error("Connection attempt aborted")]
    Aborted,

    #[error("Not connected")]
    NotConnected,

    /// A control message could not be encoded or decoded.
    #[error("Control message error: {0}")]
    Control(String),

    /// A session API call failed for a reason outside the connection taxonomy.
    #[error("Session API error: {0}")]
    SessionApi(String),
}

impl SessionError {
    /// Whether the retry controller may schedule another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::ServiceUnavailable(_)
                | SessionError::Timeout { .. }
                | SessionError::Transport(_)
        )
    }

    /// `Aborted` is internal and is never shown to the user.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, SessionError::Aborted)
    }

    /// Media-less degradation rather than a failed call.
    pub fn is_non_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::PermissionDenied(_) | SessionError::NoDevicesFound
        )
    }

    /// Attempts consumed before this error was surfaced, when known.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            SessionError::RetryExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Actionable text for the caller to show next to the error.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            SessionError::NetworkConfigurationFailure(_) => Some(
                "Your network is blocking the media connection. Try a different network, \
                 disable the VPN, or ask your administrator to allow UDP traffic.",
            ),
            SessionError::PermissionDenied(_) => {
                Some("Allow camera and microphone access in your browser settings to be seen and heard.")
            }
            SessionError::NoDevicesFound => {
                Some("No camera or microphone was found. You can still join without media.")
            }
            SessionError::Unauthorized => Some("Your login has expired. Please sign in again."),
            SessionError::RetryExhausted { last, .. } => last.guidance(),
            _ => None,
        }
    }
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotAuthenticated => SessionError::Unauthorized,
            ApiError::Forbidden(msg) | ApiError::NotFound(msg) => {
                SessionError::SessionNotAuthorized(msg)
            }
            ApiError::TransportUnavailable(msg) => SessionError::ServiceUnavailable(msg),
            ApiError::Network(e) => SessionError::ServiceUnavailable(e.to_string()),
            ApiError::ServerError { status, body } if status >= 500 => {
                SessionError::ServiceUnavailable(format!("HTTP {status}: {body}"))
            }
            other => SessionError::SessionApi(other.to_string()),
        }
    }
}
