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

//! Real-time connection lifecycle manager for two-party mentorship sessions.
//!
//! This crate establishes, supervises, recovers and hands off the live media
//! room connection of a session across the device test → waiting room →
//! active call flow, and detects when the session has been started.
//!
//! The media transport itself (signaling, peer negotiation, codecs) is an
//! external provider reached through [`MediaTransport`]/[`RoomLink`]; the
//! persisted session lifecycle is reached through [`SessionBackend`] and
//! [`CredentialProvider`], both implemented for
//! [`SessionApiClient`](mentorcall_session_client::SessionApiClient).
//!
//! # Outline of usage
//!
//! For more detailed documentation see the doc for each struct.
//!
//! ## Shared services
//! ```ignore
//! let api = Arc::new(SessionApiClient::new(base_url, AuthMode::Bearer(token)));
//! let services = SessionServices {
//!     credentials: api.clone(),
//!     backend: api,
//!     transport: Arc::new(MyTransport::new()),
//!     registry: ConnectionRegistry::spawn(),
//!     bus: EventBus::new(),
//! };
//! ```
//!
//! ### Device query and preview:
//! ```ignore
//! let devices = Arc::new(DeviceController::new(media_backend, services.bus.clone()));
//! let available = devices.list_devices().await?;
//! devices.preview_selection(Some(&available.cameras[i].device_id), None).await?;
//! ```
//!
//! ## Waiting room → active call:
//! ```ignore
//! let options = SessionCallOptions { session_key, role, config: ClientConfig::from_env()? };
//! let mut call = SessionCall::waiting_room(options, services).with_devices(devices);
//! call.join_with_selected_devices().await?;
//! call.wait_for_start().await;
//! let call = call.advance_to_active().await?; // adopts the same connection
//!
//! call.connection().toggle_mute()?;
//! call.leave().await;
//! ```

mod abort;
mod client;
mod config;
mod connection;
mod control;
mod credentials;
mod error;
mod event_bus;
mod events;
mod handoff;
mod media_devices;
mod platform;
mod retry;
mod session_api;
mod transport;

#[cfg(test)]
mod tests;

pub use abort::{AbortController, AbortToken};
pub use client::{CallView, SessionCall, SessionCallOptions};
pub use config::{ClientConfig, HandoffTiming};
pub use connection::{
    transition, ConnectOutcome, ConnectionAttempt, ConnectionManager, ConnectionPhase,
    ConnectionRegistry, HandleEvent, InvalidTransition, LocalMediaState, ParticipantSet,
    PhaseCell, PhaseEvent, Readiness, RoomConnectionHandle, SessionServices,
    WeakRoomConnectionHandle,
};
pub use credentials::{CredentialProvider, JoinCredential};
pub use error::SessionError;
pub use event_bus::{EventBus, EVENT_BUS_CAPACITY};
pub use events::{ClientEvent, ScreenShareEvent};
pub use handoff::{AdvanceGate, AdvanceReason, HandoffDetector, PollVerdict, StatusWatch};
pub use media_devices::{
    AvailableDevices, DeviceController, DeviceLists, DeviceSelection, MediaBackend,
    MediaDeviceInfo, MediaDeviceKind, PreviewStream, SelectableDevices,
};
pub use platform::{now_ms, IntervalHandle, TimerSet};
pub use retry::{run_with_retry, RetryNotice, RetryPolicy, RetryState};
pub use session_api::SessionBackend;
pub use transport::{
    ConnectParams, MediaTransport, Participant, RoomLink, ScreenShareTrack, TransportError,
    TransportEvent, TransportEvents,
};

pub use mentorcall_session_types::{ControlMessage, ParticipantRole, SessionStatus};
