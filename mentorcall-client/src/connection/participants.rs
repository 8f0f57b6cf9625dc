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

use std::collections::BTreeMap;
use std::fmt;

use crate::transport::Participant;

/// "N of M present", derived from the live participant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub present: usize,
    pub expected: usize,
    pub local_present: bool,
}

impl Readiness {
    /// Local participant present and at least `expected` parties in the room.
    pub fn is_ready(&self) -> bool {
        self.local_present && self.present >= self.expected
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ready", self.present.min(self.expected), self.expected)
    }
}

/// Local participant plus remote participants keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct ParticipantSet {
    local: Option<Participant>,
    remote: BTreeMap<String, Participant>,
}

impl ParticipantSet {
    pub fn set_local(&mut self, participant: Participant) {
        self.local = Some(participant);
    }

    pub fn local(&self) -> Option<&Participant> {
        self.local.as_ref()
    }

    /// Returns true if the participant was not already present.
    pub fn upsert(&mut self, participant: Participant) -> bool {
        if self.local.as_ref().map(|p| &p.identity) == Some(&participant.identity) {
            return false;
        }
        self.remote
            .insert(participant.identity.clone(), participant)
            .is_none()
    }

    pub fn remove(&mut self, identity: &str) -> Option<Participant> {
        self.remote.remove(identity)
    }

    /// Replace the remote set with `snapshot`, returning who joined and who left.
    pub fn reconcile(&mut self, snapshot: Vec<Participant>) -> (Vec<Participant>, Vec<String>) {
        let mut next = BTreeMap::new();
        let mut joined = Vec::new();
        for participant in snapshot {
            if self.local.as_ref().map(|p| &p.identity) == Some(&participant.identity) {
                continue;
            }
            if !self.remote.contains_key(&participant.identity) {
                joined.push(participant.clone());
            }
            next.insert(participant.identity.clone(), participant);
        }
        let left = self
            .remote
            .keys()
            .filter(|identity| !next.contains_key(*identity))
            .cloned()
            .collect();
        self.remote = next;
        (joined, left)
    }

    pub fn remote(&self) -> impl Iterator<Item = &Participant> {
        self.remote.values()
    }

    pub fn remote_count(&self) -> usize {
        self.remote.len()
    }

    /// Local plus remote.
    pub fn total(&self) -> usize {
        self.remote.len() + usize::from(self.local.is_some())
    }

    pub fn clear(&mut self) {
        self.local = None;
        self.remote.clear();
    }

    pub fn readiness(&self, expected: usize) -> Readiness {
        Readiness {
            present: self.total(),
            expected,
            local_present: self.local.is_some(),
        }
    }
}
