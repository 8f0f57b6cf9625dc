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
 */

//! Session status and lifecycle endpoints: status, accept, reject, start, end, cancel.

use mentorcall_session_types::{
    requests::RejectSessionRequest,
    responses::{SessionActionResponse, SessionStatusResponse},
};

use crate::error::ApiError;
use crate::{parse_api_response, SessionApiClient};

impl SessionApiClient {
    /// Read the persisted status and parties of a session.
    ///
    /// Calls `GET /api/v1/sessions/{session_key}/status`.
    ///
    /// This is the polling endpoint used by the waiting room as the fallback
    /// path for learning that the session was started.
    pub async fn get_session_status(
        &self,
        session_key: &str,
    ) -> Result<SessionStatusResponse, ApiError> {
        let path = format!("/api/v1/sessions/{session_key}/status");
        let response = self.get(&path).send().await?;
        parse_api_response(response).await
    }

    /// Accept a pending session request. `PENDING -> ACCEPTED`.
    ///
    /// Calls `POST /api/v1/sessions/{session_key}/accept`.
    pub async fn accept_session(
        &self,
        session_key: &str,
    ) -> Result<SessionActionResponse, ApiError> {
        self.lifecycle_action(session_key, "accept").await
    }

    /// Decline a pending session request. `PENDING -> DECLINED`.
    ///
    /// Calls `POST /api/v1/sessions/{session_key}/reject`.
    pub async fn reject_session(
        &self,
        session_key: &str,
        reason: Option<&str>,
    ) -> Result<SessionActionResponse, ApiError> {
        let path = format!("/api/v1/sessions/{session_key}/reject");
        let body = RejectSessionRequest {
            reason: reason.map(|s| s.to_string()),
        };
        let response = self.post(&path).json(&body).send().await?;
        parse_api_response(response).await
    }

    /// Start an accepted session. `ACCEPTED -> ACTIVE`.
    ///
    /// Calls `POST /api/v1/sessions/{session_key}/start`.
    ///
    /// Only the privileged party may start a session. A successful start is
    /// what the waiting room's status poll eventually observes.
    pub async fn start_session(
        &self,
        session_key: &str,
    ) -> Result<SessionActionResponse, ApiError> {
        self.lifecycle_action(session_key, "start").await
    }

    /// End an active session. `ACTIVE -> ENDED`.
    ///
    /// Calls `POST /api/v1/sessions/{session_key}/end`.
    pub async fn end_session(&self, session_key: &str) -> Result<SessionActionResponse, ApiError> {
        self.lifecycle_action(session_key, "end").await
    }

    /// Cancel a session that has not ended yet.
    ///
    /// Calls `POST /api/v1/sessions/{session_key}/cancel`.
    pub async fn cancel_session(
        &self,
        session_key: &str,
    ) -> Result<SessionActionResponse, ApiError> {
        self.lifecycle_action(session_key, "cancel").await
    }

    async fn lifecycle_action(
        &self,
        session_key: &str,
        action: &str,
    ) -> Result<SessionActionResponse, ApiError> {
        let path = format!("/api/v1/sessions/{session_key}/{action}");
        let response = self.post(&path).send().await?;
        parse_api_response(response).await
    }
}
