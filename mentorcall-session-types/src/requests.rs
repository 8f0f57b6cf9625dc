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

//! Request types for the session backend REST API.
//!
//! These types define the shape of request bodies. They are used by both
//! the server (for deserialization) and clients (for serialization).

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/v1/sessions/{session_key}/reject`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RejectSessionRequest {
    /// Optional note shown to the requesting party.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body for `POST /api/v1/sessions/{session_key}/leave-event`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LeaveEventRequest {
    /// Unix timestamp in milliseconds when the client left the room.
    pub left_at_ms: f64,

    /// Why the client left, e.g. `"user"` or `"connection_failed"`.
    pub reason: String,
}
