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

//! Typed async REST client for the mentorcall session backend.
//!
//! Only the small surface the real-time client consumes is covered here:
//! session status polling, the persisted lifecycle transitions, the join
//! credential exchange, and the best-effort leave event.
//!
//! # Example
//!
//! ```no_run
//! use mentorcall_session_client::{AuthMode, SessionApiClient};
//!
//! # async fn example() -> Result<(), mentorcall_session_client::ApiError> {
//! let client = SessionApiClient::new(
//!     "http://localhost:8081",
//!     AuthMode::Bearer("eyJ...".to_string()),
//! );
//!
//! let status = client.get_session_status("s-42").await?;
//! println!("session is {}", status.status);
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod error;
pub mod presence;
pub mod sessions;

pub use error::ApiError;
pub use mentorcall_session_types;

use mentorcall_session_types::APIError;
use reqwest::Client;

/// How the client authenticates with the session API.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Send cookies with every request (browser builds).
    Cookie,
    /// Attach `Authorization: Bearer <token>` to every request.
    Bearer(String),
}

/// A typed REST client for the session backend.
///
/// All methods return strongly-typed responses from
/// [`mentorcall_session_types`] and map HTTP errors to [`ApiError`].
#[derive(Debug, Clone)]
pub struct SessionApiClient {
    base_url: String,
    auth: AuthMode,
    http: Client,
}

impl SessionApiClient {
    /// Create a new client pointing at the given backend base URL.
    ///
    /// # Arguments
    ///
    /// * `base_url` - e.g. `"http://localhost:8081"`
    /// * `auth` - how to authenticate requests
    pub fn new(base_url: &str, auth: AuthMode) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http: Client::new(),
        }
    }

    /// Replace the bearer token after a re-authentication.
    pub fn set_bearer_token(&mut self, token: String) {
        self.auth = AuthMode::Bearer(token);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.apply_auth(self.http.get(self.url(path)))
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.apply_auth(self.http.post(self.url(path)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthMode::Cookie => {
                #[cfg(target_arch = "wasm32")]
                {
                    builder.fetch_credentials_include()
                }
                #[cfg(not(target_arch = "wasm32"))]
                {
                    builder
                }
            }
            AuthMode::Bearer(token) => {
                builder.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            }
        }
    }
}

/// Parse a standard `APIResponse<T>` body, returning `T` on success or
/// mapping the error to [`ApiError`].
pub(crate) async fn parse_api_response<T: serde::de::DeserializeOwned + serde::Serialize>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    match status {
        200 | 201 => {
            let wrapper: mentorcall_session_types::APIResponse<T> = response.json().await?;
            Ok(wrapper.result)
        }
        _ => Err(error_from_status(status, response.text().await.unwrap_or_default())),
    }
}

/// Parse a response where we only care about the status code, not the body.
pub(crate) async fn parse_status_only(response: reqwest::Response) -> Result<(), ApiError> {
    let status = response.status().as_u16();
    match status {
        200..=299 => Ok(()),
        _ => Err(error_from_status(status, response.text().await.unwrap_or_default())),
    }
}

fn error_from_status(status: u16, body: String) -> ApiError {
    match status {
        401 => ApiError::NotAuthenticated,
        403 => ApiError::Forbidden(error_message(&body)),
        404 => ApiError::NotFound(error_message(&body)),
        409 => ApiError::InvalidTransition(error_message(&body)),
        _ => {
            if error_code(&body).as_deref() == Some(APIError::TRANSPORT_UNAVAILABLE) {
                ApiError::TransportUnavailable(error_message(&body))
            } else {
                ApiError::ServerError { status, body }
            }
        }
    }
}

fn parse_error_body(body: &str) -> Option<APIError> {
    serde_json::from_str::<mentorcall_session_types::APIResponse<APIError>>(body)
        .ok()
        .map(|envelope| envelope.result)
}

fn error_code(body: &str) -> Option<String> {
    parse_error_body(body).map(|err| err.code)
}

/// Prefer the structured message; fall back to the raw body.
fn error_message(body: &str) -> String {
    parse_error_body(body)
        .map(|err| err.to_string())
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentorcall_session_types::responses::SessionStatusResponse;
    use mentorcall_session_types::SessionStatus;

    fn response(status: u16, body: &str) -> reqwest::Response {
        http::Response::builder()
            .status(status)
            .body(body.to_string())
            .unwrap()
            .into()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = SessionApiClient::new("http://localhost:8081/", AuthMode::Cookie);
        assert_eq!(client.base_url(), "http://localhost:8081");
        assert_eq!(
            client.url("/api/v1/sessions/s-1/status"),
            "http://localhost:8081/api/v1/sessions/s-1/status"
        );
    }

    #[tokio::test]
    async fn success_envelope_is_unwrapped() {
        let body = r#"{"success":true,"result":{"session_key":"s-1","status":"ACTIVE","participants":[]}}"#;
        let parsed: SessionStatusResponse = parse_api_response(response(200, body)).await.unwrap();
        assert_eq!(parsed.session_key, "s-1");
        assert_eq!(parsed.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_not_authenticated() {
        let err = parse_api_response::<SessionStatusResponse>(response(401, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }

    #[tokio::test]
    async fn forbidden_carries_structured_message() {
        let body = r#"{"success":false,"result":{"code":"NOT_A_PARTY","message":"You are not a participant of this session"}}"#;
        let err = parse_status_only(response(403, body)).await.unwrap_err();
        match err {
            ApiError::Forbidden(msg) => assert!(msg.contains("NOT_A_PARTY")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_unavailable_code_is_recognised() {
        let body = r#"{"success":false,"result":{"code":"TRANSPORT_UNAVAILABLE","message":"Media service is temporarily unavailable"}}"#;
        let err = parse_status_only(response(503, body)).await.unwrap_err();
        assert!(matches!(err, ApiError::TransportUnavailable(_)));
    }

    #[tokio::test]
    async fn plain_server_error_keeps_status_and_body() {
        let err = parse_status_only(response(500, "boom")).await.unwrap_err();
        match err {
            ApiError::ServerError { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
