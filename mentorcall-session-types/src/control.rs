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

//! Ephemeral control messages relayed over an open room's data channel.
//!
//! Control messages are never persisted and delivery is best-effort, at most
//! once. Receivers must tolerate kinds they do not understand.

use serde::{Deserialize, Serialize};

/// Discriminant carried in the `type` field of a [`ControlMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMessageKind {
    /// The privileged participant persisted the "start session" transition.
    SessionStarted,
    /// Any kind this build does not know about.
    #[serde(other)]
    Unknown,
}

/// A control message as it appears on the wire.
///
/// ```json
/// { "type": "session_started", "sessionKey": "s-42", "timestamp": 1707004800000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: ControlMessageKind,
    pub session_key: String,
    /// Milliseconds since the Unix epoch at the sender.
    pub timestamp: f64,
}

impl ControlMessage {
    pub fn session_started(session_key: impl Into<String>, timestamp: f64) -> Self {
        Self {
            kind: ControlMessageKind::SessionStarted,
            session_key: session_key.into(),
            timestamp,
        }
    }

    /// True when this is a `session_started` message for `session_key`.
    pub fn starts_session(&self, session_key: &str) -> bool {
        self.kind == ControlMessageKind::SessionStarted && self.session_key == session_key
    }
}
