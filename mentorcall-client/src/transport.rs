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

//! Seam to the external media-transport provider.
//!
//! The provider (signaling, peer negotiation, codecs) is opaque. It is
//! reached through [`MediaTransport::connect`], which resolves once the
//! signal connection is open, and the resulting [`RoomLink`] for commands.
//! Everything the provider reports afterwards arrives as [`TransportEvent`]s
//! on the returned channel.

use async_trait::async_trait;
use mentorcall_session_types::ParticipantRole;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::media_devices::DeviceSelection;

/// One party in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub identity: String,
    pub display_name: Option<String>,
    pub role: ParticipantRole,
}

impl Participant {
    pub fn new(identity: impl Into<String>, role: ParticipantRole) -> Self {
        Self {
            identity: identity.into(),
            display_name: None,
            role,
        }
    }
}

/// Everything the provider needs to join a room.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub session_key: String,
    pub credential: String,
    pub transport_address: String,
    pub room_name: String,
    pub devices: DeviceSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenShareTrack {
    pub track_id: String,
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("credential rejected: {0}")]
    CredentialRejected(String),

    #[error("transport unreachable: {0}")]
    Unreachable(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Peer transport could not traverse NAT/firewall.
    #[error("ICE negotiation failed: {0}")]
    IceFailed(String),

    #[error("device access denied: {0}")]
    PermissionDenied(String),

    #[error("room closed: {0}")]
    Closed(String),
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::CredentialRejected(_) => SessionError::Unauthorized,
            TransportError::Unreachable(msg) => SessionError::ServiceUnavailable(msg),
            TransportError::Handshake(msg) | TransportError::Closed(msg) => {
                SessionError::Transport(msg)
            }
            TransportError::IceFailed(msg) => SessionError::NetworkConfigurationFailure(msg),
            TransportError::PermissionDenied(msg) => SessionError::PermissionDenied(msg),
        }
    }
}

/// Library events reported by the provider after the signal connection opened.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Media transport negotiated.
    PeerConnected,
    /// Media negotiation failed while the signal connection stays up.
    PeerNegotiationFailed(TransportError),
    Reconnecting,
    /// Recovered from an interruption. `peer` tells whether media is up again.
    Reconnected { peer: bool },
    ParticipantJoined(Participant),
    ParticipantLeft { identity: String },
    DataReceived { from: String, payload: Vec<u8> },
    /// The shared screen track ended outside the app.
    ScreenShareEnded { track_id: String },
    /// Terminal disconnect declared by the library.
    Disconnected {
        reason: String,
        error: Option<TransportError>,
    },
}

pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Perform the transport handshake. Resolves at signal connection.
    async fn connect(
        &self,
        params: ConnectParams,
    ) -> Result<(Arc<dyn RoomLink>, TransportEvents), TransportError>;
}

/// Commands on an open room.
pub trait RoomLink: Send + Sync {
    fn local_participant(&self) -> Participant;

    /// Current snapshot of remote participants.
    fn remote_participants(&self) -> Vec<Participant>;

    fn set_microphone_enabled(&self, enabled: bool) -> Result<(), TransportError>;

    fn set_camera_enabled(&self, enabled: bool) -> Result<(), TransportError>;

    fn publish_local_tracks(&self, devices: &DeviceSelection) -> Result<(), TransportError>;

    fn start_screen_share(&self) -> Result<ScreenShareTrack, TransportError>;

    fn stop_screen_share(&self) -> Result<(), TransportError>;

    /// Best-effort broadcast to every other participant.
    fn send_data(&self, payload: &[u8]) -> Result<(), TransportError>;

    fn stop_local_tracks(&self);

    fn close(&self);
}
