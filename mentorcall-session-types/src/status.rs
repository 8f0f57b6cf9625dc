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

//! Persisted session lifecycle as exposed by the session backend.
//!
//! The real-time client observes and drives this lifecycle but does not own
//! it. [`SessionStatus::can_transition_to`] encodes the transitions the
//! backend is known to perform so callers can sanity-check what they poll.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a mentorship session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Accepted,
    Declined,
    Active,
    Ended,
    Canceled,
}

impl SessionStatus {
    /// Whether the backend moves a session from `self` to `next`.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Declined)
                | (Pending, Canceled)
                | (Accepted, Active)
                | (Accepted, Canceled)
                | (Active, Ended)
                | (Active, Canceled)
        )
    }

    /// No further transitions happen from a closed session.
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            SessionStatus::Declined | SessionStatus::Ended | SessionStatus::Canceled
        )
    }

    pub fn is_active(self) -> bool {
        self == SessionStatus::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::Accepted => "ACCEPTED",
            SessionStatus::Declined => "DECLINED",
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Ended => "ENDED",
            SessionStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a party in a two-party session.
///
/// The mentor is the privileged party: only the mentor may start the
/// session, which is what triggers the `session_started` control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Mentor,
    Mentee,
}

impl ParticipantRole {
    pub fn is_privileged(self) -> bool {
        self == ParticipantRole::Mentor
    }
}
