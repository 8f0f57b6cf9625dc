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

use log::{debug, warn};
use mentorcall_session_types::SessionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollVerdict {
    Wait,
    Advance,
    /// The session ended, was canceled or was declined.
    Closed(SessionStatus),
}

/// Decides from successive status polls whether the session was started
/// while this participant was watching.
///
/// A session already active on the first poll is a rejoin: it never
/// advances on its own and waits for an explicit control message. A status
/// the backend cannot reach from the last one observed (a stale read) is
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct StatusWatch {
    last: Option<SessionStatus>,
}

impl StatusWatch {
    pub fn observe(&mut self, status: SessionStatus) -> PollVerdict {
        if status.is_closed() {
            return PollVerdict::Closed(status);
        }
        let Some(previous) = self.last else {
            self.last = Some(status);
            if status.is_active() {
                debug!("Session already active on first poll; waiting for an explicit start");
            }
            return PollVerdict::Wait;
        };
        if !reachable(previous, status) {
            warn!("Ignoring status {status} after {previous}; the session cannot move back");
            return PollVerdict::Wait;
        }
        self.last = Some(status);
        if !previous.is_active() && status.is_active() {
            PollVerdict::Advance
        } else {
            PollVerdict::Wait
        }
    }
}

/// Whether `to` can follow `from`, allowing for polls that missed one
/// intermediate status.
fn reachable(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;
    from == to
        || from.can_transition_to(to)
        || [Pending, Accepted, Declined, Active, Ended, Canceled]
            .into_iter()
            .any(|via| from.can_transition_to(via) && via.can_transition_to(to))
}
