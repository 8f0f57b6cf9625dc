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

//! Join credential exchange.

use mentorcall_session_types::responses::JoinCredentialResponse;

use crate::error::ApiError;
use crate::{parse_api_response, SessionApiClient};

impl SessionApiClient {
    /// Exchange a session key for a short-lived room-join credential.
    ///
    /// Calls `GET /api/v1/sessions/{session_key}/join-credential`.
    ///
    /// No retry happens here; the connection state machine retries the whole
    /// attempt, of which this call is the first step.
    pub async fn get_join_credential(
        &self,
        session_key: &str,
    ) -> Result<JoinCredentialResponse, ApiError> {
        let path = format!("/api/v1/sessions/{session_key}/join-credential");
        let response = self.get(&path).send().await?;
        parse_api_response(response).await
    }
}
