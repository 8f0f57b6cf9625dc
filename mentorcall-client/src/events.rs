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

//! Framework-agnostic event types for the session client.
//!
//! These events are emitted via the [`EventBus`](crate::EventBus) and can be
//! subscribed to by any frontend framework (Dioxus, Leptos, a native shell, etc.)

use mentorcall_session_types::SessionStatus;
use std::time::Duration;

use crate::connection::{ConnectionPhase, Readiness};
use crate::error::SessionError;
use crate::handoff::AdvanceReason;
use crate::media_devices::{DeviceSelection, MediaDeviceInfo};
use crate::transport::Participant;

/// Events emitted by the session client that UI frameworks can subscribe to.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    // === Connection Events ===
    /// The view's connection moved to a new phase
    PhaseChanged {
        session_key: String,
        phase: ConnectionPhase,
    },

    /// An attempt failed and another is scheduled. The UI should keep showing
    /// "connecting", not an error.
    Retrying {
        session_key: String,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        error: SessionError,
    },

    /// The connection gave up; no further automatic retry happens
    ConnectionFailed {
        session_key: String,
        error: SessionError,
    },

    // === Participant Events ===
    ParticipantJoined(Participant),

    /// A remote participant left (identity)
    ParticipantLeft(String),

    /// Presence count changed ("N/2 ready")
    ReadinessChanged(Readiness),

    // === Session Events ===
    /// The session was started; the view should advance to the active call
    SessionStarted {
        session_key: String,
        via: AdvanceReason,
    },

    /// The persisted session reached a closed status (ended, canceled, declined)
    SessionClosed {
        session_key: String,
        status: SessionStatus,
    },

    // === Device Events ===
    /// Media devices have been enumerated
    DevicesLoaded {
        cameras: Vec<MediaDeviceInfo>,
        microphones: Vec<MediaDeviceInfo>,
    },

    /// The selected camera/microphone pair changed
    DeviceSelectionChanged(DeviceSelection),

    /// Media permission was denied
    PermissionDenied(String),

    // === Local Media Events ===
    MuteChanged(bool),

    VideoChanged(bool),

    ScreenShareStateChange(ScreenShareEvent),
}

/// Screen share lifecycle as seen by the local participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScreenShareEvent {
    /// Sharing started; carries the shared track id
    Started(String),
    /// Sharing stopped by the local user
    Stopped,
    /// The shared content was ended outside the app (e.g. the browser's
    /// "stop sharing" bar) and the local state was reverted
    EndedOutOfBand,
}
