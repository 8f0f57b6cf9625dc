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

//! The established media room, shared between the view that opened it and
//! the connection registry.

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::participants::{ParticipantSet, Readiness};
use super::state::{ConnectionPhase, PhaseCell, PhaseEvent};
use crate::error::SessionError;
use crate::media_devices::DeviceSelection;
use crate::platform::spawn;
use crate::transport::{
    Participant, RoomLink, ScreenShareTrack, TransportError, TransportEvent, TransportEvents,
};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

const HANDLE_EVENT_CAPACITY: usize = 64;

/// What one handle has published locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalMediaState {
    pub muted: bool,
    pub video_enabled: bool,
    pub screen_share: Option<ScreenShareTrack>,
    pub published: bool,
}

impl LocalMediaState {
    fn for_devices(devices: &DeviceSelection) -> Self {
        Self {
            muted: !(devices.granted && devices.microphone_id.is_some()),
            video_enabled: devices.granted && devices.camera_id.is_some(),
            screen_share: None,
            published: false,
        }
    }
}

/// Everything a handle reports to whoever is attached to it.
#[derive(Debug, Clone)]
pub enum HandleEvent {
    Phase {
        event: PhaseEvent,
        phase: ConnectionPhase,
    },
    ParticipantJoined(Participant),
    ParticipantLeft(String),
    ReadinessChanged(Readiness),
    Data {
        from: String,
        payload: Vec<u8>,
    },
    ScreenShareEnded {
        track_id: String,
    },
    /// Peer negotiation failed terminally with another party present.
    NegotiationFailed(SessionError),
    /// `requested` is false when the transport closed on its own.
    Closed {
        requested: bool,
        error: Option<SessionError>,
    },
}

#[derive(Debug, Default)]
struct HandleState {
    participants: ParticipantSet,
    media: LocalMediaState,
    closed: bool,
}

struct HandleInner {
    id: u64,
    session_key: String,
    expected_participants: usize,
    link: Arc<dyn RoomLink>,
    phase: PhaseCell,
    state: Mutex<HandleState>,
    events: broadcast::Sender<HandleEvent>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

/// Opaque handle to an established room: the link, the local media state and
/// the set of remote parties.
///
/// Cloning shares the same connection. Exactly one canonical handle per
/// session key is kept in the [`ConnectionRegistry`](super::ConnectionRegistry).
#[derive(Clone)]
pub struct RoomConnectionHandle {
    inner: Arc<HandleInner>,
}

/// Non-owning reference used by timers and background tasks.
#[derive(Clone)]
pub struct WeakRoomConnectionHandle {
    inner: Weak<HandleInner>,
}

impl WeakRoomConnectionHandle {
    pub fn upgrade(&self) -> Option<RoomConnectionHandle> {
        self.inner.upgrade().map(|inner| RoomConnectionHandle { inner })
    }
}

impl RoomConnectionHandle {
    /// Wrap a freshly signal-connected link and start pumping its events.
    pub fn establish(
        session_key: &str,
        link: Arc<dyn RoomLink>,
        events: TransportEvents,
        devices: &DeviceSelection,
        expected_participants: usize,
    ) -> Self {
        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        let phase = PhaseCell::new(format!("{session_key}#{id}"));
        let _ = phase.apply(PhaseEvent::ConnectRequested);
        let _ = phase.apply(PhaseEvent::SignalEstablished);

        let mut participants = ParticipantSet::default();
        participants.set_local(link.local_participant());
        participants.reconcile(link.remote_participants());

        let (tx, _) = broadcast::channel(HANDLE_EVENT_CAPACITY);
        let inner = Arc::new(HandleInner {
            id,
            session_key: session_key.to_string(),
            expected_participants,
            link,
            phase,
            state: Mutex::new(HandleState {
                participants,
                media: LocalMediaState::for_devices(devices),
                closed: false,
            }),
            events: tx,
            pump: Mutex::new(None),
        });

        let pump = spawn(pump_events(Arc::downgrade(&inner), events));
        *inner.pump.lock() = Some(pump);

        info!("Room connection {session_key}#{id} established");
        Self { inner }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn session_key(&self) -> &str {
        &self.inner.session_key
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.inner.phase.get()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.inner.phase.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HandleEvent> {
        self.inner.events.subscribe()
    }

    pub fn downgrade(&self) -> WeakRoomConnectionHandle {
        WeakRoomConnectionHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Not closed and in an adoptable phase.
    pub fn is_alive(&self) -> bool {
        !self.inner.state.lock().closed && self.phase().is_adoptable()
    }

    pub fn local_participant(&self) -> Option<Participant> {
        self.inner.state.lock().participants.local().cloned()
    }

    pub fn remote_participants(&self) -> Vec<Participant> {
        self.inner
            .state
            .lock()
            .participants
            .remote()
            .cloned()
            .collect()
    }

    pub fn readiness(&self) -> Readiness {
        self.inner
            .state
            .lock()
            .participants
            .readiness(self.inner.expected_participants)
    }

    pub fn media_state(&self) -> LocalMediaState {
        self.inner.state.lock().media.clone()
    }

    /// Returns the new muted state.
    pub fn toggle_mute(&self) -> Result<bool, SessionError> {
        self.ensure_connected()?;
        let mut state = self.inner.state.lock();
        let muted = !state.media.muted;
        self.inner.link.set_microphone_enabled(!muted)?;
        state.media.muted = muted;
        Ok(muted)
    }

    /// Returns whether the camera is now enabled.
    pub fn toggle_video(&self) -> Result<bool, SessionError> {
        self.ensure_connected()?;
        let mut state = self.inner.state.lock();
        let enabled = !state.media.video_enabled;
        self.inner.link.set_camera_enabled(enabled)?;
        state.media.video_enabled = enabled;
        Ok(enabled)
    }

    /// Start or stop sharing. Returns the shared track while sharing.
    pub fn toggle_screen_share(&self) -> Result<Option<ScreenShareTrack>, SessionError> {
        self.ensure_connected()?;
        let mut state = self.inner.state.lock();
        if state.media.screen_share.is_some() {
            self.inner.link.stop_screen_share()?;
            state.media.screen_share = None;
            Ok(None)
        } else {
            let track = self.inner.link.start_screen_share()?;
            state.media.screen_share = Some(track.clone());
            Ok(Some(track))
        }
    }

    /// Publish local tracks once peer-connected with another party present.
    ///
    /// Returns true if tracks were published by this call.
    pub fn maybe_publish(&self, devices: &DeviceSelection) -> Result<bool, SessionError> {
        if !self.phase().is_peer_connected() || !devices.has_media() {
            return Ok(false);
        }
        let mut state = self.inner.state.lock();
        if state.media.published || state.participants.total() < 2 {
            return Ok(false);
        }
        self.inner.link.publish_local_tracks(devices)?;
        state.media.published = true;
        info!("[{}] published local tracks", self.label());
        Ok(true)
    }

    pub fn send_data(&self, payload: &[u8]) -> Result<(), SessionError> {
        self.ensure_connected()?;
        Ok(self.inner.link.send_data(payload)?)
    }

    /// Reconcile the participant set with the transport's snapshot.
    pub fn refresh_participants(&self) -> bool {
        if !self.phase().is_connected() {
            return false;
        }
        let snapshot = self.inner.link.remote_participants();
        let (joined, left, readiness) = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return false;
            }
            let (joined, left) = state.participants.reconcile(snapshot);
            let readiness = state
                .participants
                .readiness(self.inner.expected_participants);
            (joined, left, readiness)
        };
        if joined.is_empty() && left.is_empty() {
            return false;
        }
        debug!(
            "[{}] refresh found {} joined, {} left",
            self.label(),
            joined.len(),
            left.len()
        );
        for participant in joined {
            self.broadcast(HandleEvent::ParticipantJoined(participant));
        }
        for identity in left {
            self.broadcast(HandleEvent::ParticipantLeft(identity));
        }
        self.broadcast(HandleEvent::ReadinessChanged(readiness));
        true
    }

    /// Tear the room down: stop local tracks, close the link, clear participants.
    pub fn close(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            if state.media.screen_share.take().is_some() {
                let _ = self.inner.link.stop_screen_share();
            }
            state.media.published = false;
            state.participants.clear();
        }
        self.inner.link.stop_local_tracks();
        self.inner.link.close();
        self.apply(PhaseEvent::DisconnectRequested);
        self.broadcast(HandleEvent::Closed {
            requested: true,
            error: None,
        });
        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }
        info!("Room connection {} closed", self.label());
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.phase().is_connected() && !self.inner.state.lock().closed {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn label(&self) -> String {
        format!("{}#{}", self.inner.session_key, self.inner.id)
    }

    fn apply(&self, event: PhaseEvent) -> Option<ConnectionPhase> {
        let phase = self.inner.phase.apply(event).ok()?;
        self.broadcast(HandleEvent::Phase { event, phase });
        Some(phase)
    }

    fn broadcast(&self, event: HandleEvent) {
        // No receivers is fine: nobody is attached right now.
        let _ = self.inner.events.send(event);
    }

    fn on_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::PeerConnected => {
                self.apply(PhaseEvent::PeerEstablished);
            }
            TransportEvent::PeerNegotiationFailed(err) => self.on_negotiation_failed(err),
            TransportEvent::Reconnecting => {
                self.apply(PhaseEvent::TransportInterrupted);
            }
            TransportEvent::Reconnected { peer } => {
                self.apply(PhaseEvent::TransportRestored { peer });
            }
            TransportEvent::ParticipantJoined(participant) => {
                let readiness = {
                    let mut state = self.inner.state.lock();
                    if state.closed || !state.participants.upsert(participant.clone()) {
                        return;
                    }
                    state
                        .participants
                        .readiness(self.inner.expected_participants)
                };
                info!("[{}] {} joined", self.label(), participant.identity);
                self.broadcast(HandleEvent::ParticipantJoined(participant));
                self.broadcast(HandleEvent::ReadinessChanged(readiness));
            }
            TransportEvent::ParticipantLeft { identity } => {
                let readiness = {
                    let mut state = self.inner.state.lock();
                    if state.participants.remove(&identity).is_none() {
                        return;
                    }
                    state
                        .participants
                        .readiness(self.inner.expected_participants)
                };
                info!("[{}] {identity} left", self.label());
                self.broadcast(HandleEvent::ParticipantLeft(identity));
                self.broadcast(HandleEvent::ReadinessChanged(readiness));
            }
            TransportEvent::DataReceived { from, payload } => {
                self.broadcast(HandleEvent::Data { from, payload });
            }
            TransportEvent::ScreenShareEnded { track_id } => {
                let reverted = {
                    let mut state = self.inner.state.lock();
                    match &state.media.screen_share {
                        Some(track) if track.track_id == track_id => {
                            state.media.screen_share = None;
                            true
                        }
                        _ => false,
                    }
                };
                if reverted {
                    info!("[{}] screen share {track_id} ended out of band", self.label());
                    self.broadcast(HandleEvent::ScreenShareEnded { track_id });
                } else {
                    debug!("[{}] ignoring end of unknown track {track_id}", self.label());
                }
            }
            TransportEvent::Disconnected { reason, error } => self.on_remote_close(reason, error),
        }
    }

    fn on_negotiation_failed(&self, err: TransportError) {
        let remote = self.inner.state.lock().participants.remote_count();
        if remote == 0 {
            debug!(
                "[{}] peer negotiation failed with nobody else present, staying signal-connected: {err}",
                self.label()
            );
            return;
        }
        let error = SessionError::from(err);
        if matches!(error, SessionError::NetworkConfigurationFailure(_)) {
            if self.apply(PhaseEvent::Fail).is_some() {
                self.broadcast(HandleEvent::NegotiationFailed(error));
            }
        } else {
            warn!(
                "[{}] peer negotiation failed, signal connection still up: {error}",
                self.label()
            );
        }
    }

    fn on_remote_close(&self, reason: String, error: Option<TransportError>) {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.participants.clear();
            state.media = LocalMediaState::default();
        }
        warn!("[{}] transport disconnected: {reason}", self.label());
        self.apply(PhaseEvent::RemoteClosed);
        let error = error
            .map(SessionError::from)
            .unwrap_or(SessionError::Transport(reason));
        self.broadcast(HandleEvent::Closed {
            requested: false,
            error: Some(error),
        });
    }
}

async fn pump_events(inner: Weak<HandleInner>, mut events: TransportEvents) {
    while let Some(event) = events.recv().await {
        let Some(strong) = inner.upgrade() else {
            return;
        };
        RoomConnectionHandle { inner: strong }.on_transport_event(event);
    }
    if let Some(strong) = inner.upgrade() {
        RoomConnectionHandle { inner: strong }.on_transport_event(TransportEvent::Disconnected {
            reason: "transport event stream ended".to_string(),
            error: None,
        });
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
        if !self.state.get_mut().closed {
            debug!("Last reference to {}#{} dropped, closing link", self.session_key, self.id);
            self.link.stop_local_tracks();
            self.link.close();
        }
    }
}

impl std::fmt::Debug for RoomConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomConnectionHandle")
            .field("id", &self.inner.id)
            .field("session_key", &self.inner.session_key)
            .field("phase", &self.phase())
            .finish()
    }
}
