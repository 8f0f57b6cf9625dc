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

//! Join credential exchange.

use async_trait::async_trait;
use mentorcall_session_client::SessionApiClient;
use mentorcall_session_types::responses::JoinCredentialResponse;

use crate::error::SessionError;

/// A short-lived room-join credential and where to use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCredential {
    pub credential: String,
    pub transport_address: String,
    pub room_name: String,
    pub expires_at: Option<i64>,
}

impl From<JoinCredentialResponse> for JoinCredential {
    fn from(response: JoinCredentialResponse) -> Self {
        Self {
            credential: response.credential,
            transport_address: response.transport_address,
            room_name: response.room_name,
            expires_at: response.expires_at,
        }
    }
}

/// Exchanges a session key for a join credential.
///
/// Fails with `Unauthorized`, `SessionNotAuthorized` or `ServiceUnavailable`.
/// Implementations never retry; the connection state machine does.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn request_join_credential(&self, session_key: &str)
        -> Result<JoinCredential, SessionError>;
}

#[async_trait]
impl CredentialProvider for SessionApiClient {
    async fn request_join_credential(
        &self,
        session_key: &str,
    ) -> Result<JoinCredential, SessionError> {
        let response = self.get_join_credential(session_key).await?;
        Ok(response.into())
    }
}
