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

//! Persisted session lifecycle, consumed as an external state machine.

use async_trait::async_trait;
use mentorcall_session_client::SessionApiClient;
use mentorcall_session_types::requests::LeaveEventRequest;
use mentorcall_session_types::responses::SessionStatusResponse;
use mentorcall_session_types::SessionStatus;

use crate::error::SessionError;
use crate::platform::now_ms;

/// The session API operations the lifecycle manager drives or observes.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn session_status(&self, session_key: &str)
        -> Result<SessionStatusResponse, SessionError>;

    async fn accept(&self, session_key: &str) -> Result<SessionStatus, SessionError>;

    async fn reject(
        &self,
        session_key: &str,
        reason: Option<&str>,
    ) -> Result<SessionStatus, SessionError>;

    /// Persist the start. This is what the push path announces.
    async fn start_session(&self, session_key: &str) -> Result<SessionStatus, SessionError>;

    async fn end(&self, session_key: &str) -> Result<SessionStatus, SessionError>;

    /// Best-effort presence log. Callers never await this on a teardown path.
    async fn record_leave(&self, session_key: &str, reason: &str) -> Result<(), SessionError>;
}

#[async_trait]
impl SessionBackend for SessionApiClient {
    async fn session_status(
        &self,
        session_key: &str,
    ) -> Result<SessionStatusResponse, SessionError> {
        Ok(self.get_session_status(session_key).await?)
    }

    async fn accept(&self, session_key: &str) -> Result<SessionStatus, SessionError> {
        Ok(self.accept_session(session_key).await?.status)
    }

    async fn reject(
        &self,
        session_key: &str,
        reason: Option<&str>,
    ) -> Result<SessionStatus, SessionError> {
        Ok(self.reject_session(session_key, reason).await?.status)
    }

    async fn start_session(&self, session_key: &str) -> Result<SessionStatus, SessionError> {
        Ok(SessionApiClient::start_session(self, session_key)
            .await?
            .status)
    }

    async fn end(&self, session_key: &str) -> Result<SessionStatus, SessionError> {
        Ok(self.end_session(session_key).await?.status)
    }

    async fn record_leave(&self, session_key: &str, reason: &str) -> Result<(), SessionError> {
        let event = LeaveEventRequest {
            left_at_ms: now_ms(),
            reason: reason.to_string(),
        };
        Ok(self.post_leave_event(session_key, &event).await?)
    }
}
