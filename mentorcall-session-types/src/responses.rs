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

//! Response types for the session backend REST API.
//!
//! Every endpoint returns an [`APIResponse<T>`] envelope:
//! - On success: `{ "success": true,  "result": <T> }`
//! - On failure: `{ "success": false, "result": <APIError> }`

use serde::{Deserialize, Serialize};

use crate::status::{ParticipantRole, SessionStatus};

// ---------------------------------------------------------------------------
// Generic envelope
// ---------------------------------------------------------------------------

/// Top-level API response envelope.
///
/// # Success example
///
/// ```json
/// { "success": true, "result": { "session_key": "s-42", "status": "ACTIVE", ... } }
/// ```
///
/// # Error example
///
/// ```json
/// { "success": false, "result": { "code": "NOT_A_PARTY", "message": "..." } }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct APIResponse<A: Serialize> {
    pub success: bool,
    pub result: A,
}

impl<A: Serialize> APIResponse<A> {
    /// Wrap a successful result.
    pub fn ok(result: A) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

impl APIResponse<crate::error::APIError> {
    /// Wrap an error result.
    pub fn error(err: crate::error::APIError) -> Self {
        Self {
            success: false,
            result: err,
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint-specific response payloads
// ---------------------------------------------------------------------------

/// Response payload for `GET /api/v1/sessions/{session_key}/status`.
///
/// This is the endpoint polled by the waiting room.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionStatusResponse {
    pub session_key: String,
    pub status: SessionStatus,
    pub participants: Vec<SessionParticipantResponse>,
}

/// One party of a session as recorded by the backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionParticipantResponse {
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub role: ParticipantRole,
}

/// Response payload for the accept, reject, start, end and cancel endpoints.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionActionResponse {
    pub session_key: String,
    pub status: SessionStatus,
    /// Unix timestamp in seconds when the transition was recorded.
    pub updated_at: i64,
}

/// Response payload for `GET /api/v1/sessions/{session_key}/join-credential`.
///
/// The credential is short-lived; it is fetched at the start of every
/// connection attempt and never cached.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JoinCredentialResponse {
    /// Signed room-join token accepted by the media transport provider.
    pub credential: String,
    /// Address of the media transport endpoint, e.g. `"wss://media.example.com"`.
    pub transport_address: String,
    /// Room name the credential authorizes.
    pub room_name: String,
    /// Unix timestamp in seconds after which the credential is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}
