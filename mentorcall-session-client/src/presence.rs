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

//! Presence logging.

use log::debug;
use mentorcall_session_types::requests::LeaveEventRequest;

use crate::error::ApiError;
use crate::{parse_status_only, SessionApiClient};

impl SessionApiClient {
    /// Record that this client left the room.
    ///
    /// Calls `POST /api/v1/sessions/{session_key}/leave-event`.
    ///
    /// Callers treat this as fire-and-forget; a failure here must never
    /// delay a disconnect.
    pub async fn post_leave_event(
        &self,
        session_key: &str,
        event: &LeaveEventRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/api/v1/sessions/{session_key}/leave-event");
        debug!("Posting leave event for {session_key}: {}", event.reason);
        let response = self.post(&path).json(event).send().await?;
        parse_status_only(response).await
    }
}
