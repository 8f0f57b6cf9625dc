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

//! Error types for the session API client.

use thiserror::Error;

/// Errors returned by [`SessionApiClient`](crate::SessionApiClient) methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The session JWT is missing, expired, or invalid (HTTP 401).
    #[error("Not authenticated. Please log in.")]
    NotAuthenticated,

    /// The caller is not allowed to act on this session (HTTP 403).
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// The session does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested lifecycle transition is not allowed from the current status (HTTP 409).
    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    /// The media transport provider could not be reached by the backend.
    #[error("Media transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A server error with status code and body.
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// A network or transport error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A configuration error (e.g. missing base URL).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether the failure is on the server/network side rather than the caller's.
    pub fn is_server_side(&self) -> bool {
        match self {
            ApiError::TransportUnavailable(_) | ApiError::Network(_) => true,
            ApiError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
