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

//! API error types.
//!
//! Every failed API response is returned as `APIResponse<APIError>` with `success: false`.

use serde::{Deserialize, Serialize};

/// Structured error returned in the `result` field of a failed [`super::APIResponse`].
///
/// The `code` field is a machine-readable identifier (e.g. `"NOT_A_PARTY"`).
/// The `message` field is a human-readable description suitable for display.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct APIError {
    /// Machine-readable error code.
    pub code: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional engineering-level detail for debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engineering_error: Option<String>,
}

impl APIError {
    pub const UNAUTHORIZED: &'static str = "UNAUTHORIZED";
    pub const SESSION_NOT_FOUND: &'static str = "SESSION_NOT_FOUND";
    pub const NOT_A_PARTY: &'static str = "NOT_A_PARTY";
    pub const INVALID_TRANSITION: &'static str = "INVALID_TRANSITION";
    pub const TRANSPORT_UNAVAILABLE: &'static str = "TRANSPORT_UNAVAILABLE";

    pub fn unauthorized() -> Self {
        Self {
            code: Self::UNAUTHORIZED.to_string(),
            message: "Authentication required.".to_string(),
            engineering_error: None,
        }
    }

    pub fn session_not_found(session_key: &str) -> Self {
        Self {
            code: Self::SESSION_NOT_FOUND.to_string(),
            message: format!("Session '{session_key}' not found"),
            engineering_error: None,
        }
    }

    pub fn not_a_party() -> Self {
        Self {
            code: Self::NOT_A_PARTY.to_string(),
            message: "You are not a participant of this session".to_string(),
            engineering_error: None,
        }
    }

    pub fn invalid_transition(from: &str, to: &str) -> Self {
        Self {
            code: Self::INVALID_TRANSITION.to_string(),
            message: format!("Session cannot move from {from} to {to}"),
            engineering_error: None,
        }
    }

    pub fn transport_unavailable(detail: &str) -> Self {
        Self {
            code: Self::TRANSPORT_UNAVAILABLE.to_string(),
            message: "Media service is temporarily unavailable".to_string(),
            engineering_error: Some(detail.to_string()),
        }
    }
}

impl std::fmt::Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for APIError {}
