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

//! Connection phases and the transition table between them.
//!
//! Every incoming library event maps to one [`PhaseEvent`]; [`transition`]
//! either accepts it or rejects it for the current phase. All phase writes go
//! through [`PhaseCell::apply`], which logs rejected pairs instead of applying them.

use log::{debug, info};
use std::fmt;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    /// Control channel open, membership events flowing, no media yet.
    SignalConnected,
    /// Media transport negotiated.
    PeerConnected,
    /// Interrupted; participants and "connected" semantics are kept.
    Reconnecting,
    Disconnected,
    Failed,
    /// Superseded by a newer attempt.
    Aborted,
}

impl ConnectionPhase {
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConnectionPhase::SignalConnected
                | ConnectionPhase::PeerConnected
                | ConnectionPhase::Reconnecting
        )
    }

    pub fn is_connecting(self) -> bool {
        self == ConnectionPhase::Connecting
    }

    pub fn is_peer_connected(self) -> bool {
        self == ConnectionPhase::PeerConnected
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConnectionPhase::Disconnected | ConnectionPhase::Failed | ConnectionPhase::Aborted
        )
    }

    /// Whether a handle in this phase may be adopted by another view.
    pub fn is_adoptable(self) -> bool {
        self.is_connected()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionPhase::Idle => "idle",
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::SignalConnected => "signal_connected",
            ConnectionPhase::PeerConnected => "peer_connected",
            ConnectionPhase::Reconnecting => "reconnecting",
            ConnectionPhase::Disconnected => "disconnected",
            ConnectionPhase::Failed => "failed",
            ConnectionPhase::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    ConnectRequested,
    SignalEstablished,
    PeerEstablished,
    TransportInterrupted,
    TransportRestored { peer: bool },
    DisconnectRequested,
    /// The library declared a terminal disconnect.
    RemoteClosed,
    Fail,
    Supersede,
    /// A registry handle in the given phase was adopted.
    Adopted(ConnectionPhase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{event:?} is not allowed in phase {from}")]
pub struct InvalidTransition {
    pub from: ConnectionPhase,
    pub event: PhaseEvent,
}

pub fn transition(
    from: ConnectionPhase,
    event: PhaseEvent,
) -> Result<ConnectionPhase, InvalidTransition> {
    use ConnectionPhase::*;
    use PhaseEvent::*;

    let live = !from.is_terminal() && from != Idle;
    let next = match (from, event) {
        (Idle | Disconnected | Failed | Aborted, ConnectRequested) => Some(Connecting),
        (Connecting, SignalEstablished) => Some(SignalConnected),
        (SignalConnected | Reconnecting, PeerEstablished) => Some(PeerConnected),
        (SignalConnected | PeerConnected, TransportInterrupted) => Some(Reconnecting),
        (Reconnecting, TransportRestored { peer: true }) => Some(PeerConnected),
        (Reconnecting, TransportRestored { peer: false }) => Some(SignalConnected),
        (_, RemoteClosed) if live => Some(Disconnected),
        (_, DisconnectRequested) => Some(Disconnected),
        (_, Fail) if live => Some(Failed),
        (_, Supersede) if live => Some(Aborted),
        (Connecting, Adopted(phase)) if phase.is_adoptable() => Some(phase),
        _ => None,
    };
    next.ok_or(InvalidTransition { from, event })
}

/// The current phase of one connection, observable through a watch channel.
#[derive(Debug)]
pub struct PhaseCell {
    label: String,
    tx: watch::Sender<ConnectionPhase>,
}

impl PhaseCell {
    pub fn new(label: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(ConnectionPhase::Idle);
        Self {
            label: label.into(),
            tx,
        }
    }

    pub fn get(&self) -> ConnectionPhase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionPhase> {
        self.tx.subscribe()
    }

    /// Apply `event`, returning the new phase if the table accepted it.
    pub fn apply(&self, event: PhaseEvent) -> Result<ConnectionPhase, InvalidTransition> {
        let mut outcome = Err(InvalidTransition {
            from: ConnectionPhase::Idle,
            event,
        });
        self.tx.send_if_modified(|phase| {
            outcome = transition(*phase, event);
            match outcome {
                Ok(next) if next != *phase => {
                    *phase = next;
                    true
                }
                _ => false,
            }
        });
        match outcome {
            Ok(next) => {
                info!("[{}] {event:?} -> {next}", self.label);
                Ok(next)
            }
            Err(rejected) => {
                debug!("[{}] rejected transition: {rejected}", self.label);
                Err(rejected)
            }
        }
    }
}
