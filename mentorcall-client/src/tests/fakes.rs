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

//! In-memory stand-ins for the external collaborators.

use async_broadcast::{Receiver, TryRecvError};
use async_trait::async_trait;
use mentorcall_session_types::responses::{SessionParticipantResponse, SessionStatusResponse};
use mentorcall_session_types::{ParticipantRole, SessionStatus};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::connection::{ConnectionRegistry, SessionServices};
use crate::credentials::{CredentialProvider, JoinCredential};
use crate::error::SessionError;
use crate::event_bus::EventBus;
use crate::events::ClientEvent;
use crate::media_devices::{DeviceSelection, MediaBackend, MediaDeviceInfo, PreviewStream};
use crate::session_api::SessionBackend;
use crate::transport::{
    ConnectParams, MediaTransport, Participant, RoomLink, ScreenShareTrack, TransportError,
    TransportEvent, TransportEvents,
};

pub const SESSION: &str = "s-42";

pub fn mentor() -> Participant {
    Participant::new("mentor@example.com", ParticipantRole::Mentor)
}

pub fn mentee() -> Participant {
    Participant::new("mentee@example.com", ParticipantRole::Mentee)
}

pub fn granted_devices() -> DeviceSelection {
    DeviceSelection {
        camera_id: Some("cam-1".to_string()),
        microphone_id: Some("mic-1".to_string()),
        granted: true,
    }
}

pub fn unavailable() -> SessionError {
    SessionError::ServiceUnavailable("transport provider unreachable".to_string())
}

/// Let every spawned task run until the runtime is idle. Advances paused
/// time by one millisecond.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn drain(rx: &mut Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Overflowed(_)) => continue,
            Err(_) => return events,
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCredentials {
    calls: AtomicU32,
    script: Mutex<VecDeque<SessionError>>,
}

impl FakeCredentials {
    /// Fail the next `times` requests with `error`.
    pub fn fail_next(&self, times: usize, error: SessionError) {
        let mut script = self.script.lock();
        for _ in 0..times {
            script.push_back(error.clone());
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn request_join_credential(
        &self,
        session_key: &str,
    ) -> Result<JoinCredential, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.script.lock().pop_front() {
            return Err(error);
        }
        Ok(JoinCredential {
            credential: format!("cred-{session_key}"),
            transport_address: "wss://media.example.com".to_string(),
            room_name: format!("room-{session_key}"),
            expires_at: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Room link
// ---------------------------------------------------------------------------

pub struct FakeLink {
    pub session_key: String,
    local: Participant,
    remote: Mutex<Vec<Participant>>,
    screen: Mutex<Option<String>>,
    next_track: AtomicU32,
    fail_sends: AtomicBool,
    closed: AtomicBool,
    tracks_stopped: AtomicBool,
    pub microphone_calls: AtomicU32,
    pub camera_calls: AtomicU32,
    pub publish_calls: AtomicU32,
    pub snapshot_calls: AtomicU32,
    pub sent: Mutex<Vec<Vec<u8>>>,
}

impl FakeLink {
    fn new(session_key: &str, local: Participant, remote: Vec<Participant>) -> Self {
        Self {
            session_key: session_key.to_string(),
            local,
            remote: Mutex::new(remote),
            screen: Mutex::new(None),
            next_track: AtomicU32::new(1),
            fail_sends: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            tracks_stopped: AtomicBool::new(false),
            microphone_calls: AtomicU32::new(0),
            camera_calls: AtomicU32::new(0),
            publish_calls: AtomicU32::new(0),
            snapshot_calls: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Change what the provider reports without emitting membership events.
    pub fn set_remote(&self, remote: Vec<Participant>) {
        *self.remote.lock() = remote;
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn tracks_stopped(&self) -> bool {
        self.tracks_stopped.load(Ordering::SeqCst)
    }

    pub fn sharing(&self) -> Option<String> {
        self.screen.lock().clone()
    }
}

impl RoomLink for FakeLink {
    fn local_participant(&self) -> Participant {
        self.local.clone()
    }

    fn remote_participants(&self) -> Vec<Participant> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.remote.lock().clone()
    }

    fn set_microphone_enabled(&self, _enabled: bool) -> Result<(), TransportError> {
        self.microphone_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_camera_enabled(&self, _enabled: bool) -> Result<(), TransportError> {
        self.camera_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn publish_local_tracks(&self, _devices: &DeviceSelection) -> Result<(), TransportError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn start_screen_share(&self) -> Result<ScreenShareTrack, TransportError> {
        let track_id = format!("screen-{}", self.next_track.fetch_add(1, Ordering::SeqCst));
        *self.screen.lock() = Some(track_id.clone());
        Ok(ScreenShareTrack { track_id })
    }

    fn stop_screen_share(&self) -> Result<(), TransportError> {
        *self.screen.lock() = None;
        Ok(())
    }

    fn send_data(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Closed("data channel closed".to_string()));
        }
        self.sent.lock().push(payload.to_vec());
        Ok(())
    }

    fn stop_local_tracks(&self) {
        self.tracks_stopped.store(true, Ordering::SeqCst);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub struct FakeTransport {
    local: Participant,
    initial_remote: Mutex<Vec<Participant>>,
    handshakes: AtomicU32,
    delay: Mutex<Duration>,
    script: Mutex<VecDeque<TransportError>>,
    links: Mutex<Vec<Arc<FakeLink>>>,
    senders: Mutex<Vec<mpsc::UnboundedSender<TransportEvent>>>,
}

impl FakeTransport {
    pub fn new(local: Participant) -> Self {
        Self {
            local,
            initial_remote: Mutex::new(Vec::new()),
            handshakes: AtomicU32::new(0),
            delay: Mutex::new(Duration::ZERO),
            script: Mutex::new(VecDeque::new()),
            links: Mutex::new(Vec::new()),
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn set_initial_remote(&self, remote: Vec<Participant>) {
        *self.initial_remote.lock() = remote;
    }

    pub fn fail_next(&self, error: TransportError) {
        self.script.lock().push_back(error);
    }

    pub fn handshakes(&self) -> u32 {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn links(&self) -> Vec<Arc<FakeLink>> {
        self.links.lock().clone()
    }

    pub fn last_link(&self) -> Arc<FakeLink> {
        self.links
            .lock()
            .last()
            .cloned()
            .expect("no connection was made")
    }

    /// Deliver a library event on the most recent connection.
    pub fn emit(&self, event: TransportEvent) {
        let senders = self.senders.lock();
        let sender = senders.last().expect("no connection was made");
        sender.send(event).expect("event stream closed");
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    async fn connect(
        &self,
        params: ConnectParams,
    ) -> Result<(Arc<dyn RoomLink>, TransportEvents), TransportError> {
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.script.lock().pop_front() {
            return Err(error);
        }
        assert_eq!(params.credential, format!("cred-{}", params.session_key));

        let link = Arc::new(FakeLink::new(
            &params.session_key,
            self.local.clone(),
            self.initial_remote.lock().clone(),
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        self.links.lock().push(link.clone());
        self.senders.lock().push(tx);
        let link: Arc<dyn RoomLink> = link;
        Ok((link, rx))
    }
}

// ---------------------------------------------------------------------------
// Session backend
// ---------------------------------------------------------------------------

pub struct FakeBackend {
    statuses: Mutex<VecDeque<SessionStatus>>,
    pub polls: AtomicU32,
    pub start_calls: AtomicU32,
    pub end_calls: AtomicU32,
    pub leaves: Mutex<Vec<(String, String)>>,
}

impl FakeBackend {
    /// Polls return `statuses` in order, repeating the last one.
    pub fn new(statuses: &[SessionStatus]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            polls: AtomicU32::new(0),
            start_calls: AtomicU32::new(0),
            end_calls: AtomicU32::new(0),
            leaves: Mutex::new(Vec::new()),
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn set_statuses(&self, statuses: &[SessionStatus]) {
        *self.statuses.lock() = statuses.iter().copied().collect();
    }

    fn next_status(&self) -> SessionStatus {
        let mut statuses = self.statuses.lock();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or(SessionStatus::Accepted)
        } else {
            statuses.front().copied().unwrap_or(SessionStatus::Accepted)
        }
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn session_status(
        &self,
        session_key: &str,
    ) -> Result<SessionStatusResponse, SessionError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(SessionStatusResponse {
            session_key: session_key.to_string(),
            status: self.next_status(),
            participants: vec![SessionParticipantResponse {
                identity: mentor().identity,
                display_name: None,
                role: ParticipantRole::Mentor,
            }],
        })
    }

    async fn accept(&self, _session_key: &str) -> Result<SessionStatus, SessionError> {
        self.set_statuses(&[SessionStatus::Accepted]);
        Ok(SessionStatus::Accepted)
    }

    async fn reject(
        &self,
        _session_key: &str,
        _reason: Option<&str>,
    ) -> Result<SessionStatus, SessionError> {
        self.set_statuses(&[SessionStatus::Declined]);
        Ok(SessionStatus::Declined)
    }

    async fn start_session(&self, _session_key: &str) -> Result<SessionStatus, SessionError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.set_statuses(&[SessionStatus::Active]);
        Ok(SessionStatus::Active)
    }

    async fn end(&self, _session_key: &str) -> Result<SessionStatus, SessionError> {
        self.end_calls.fetch_add(1, Ordering::SeqCst);
        self.set_statuses(&[SessionStatus::Ended]);
        Ok(SessionStatus::Ended)
    }

    async fn record_leave(&self, session_key: &str, reason: &str) -> Result<(), SessionError> {
        self.leaves
            .lock()
            .push((session_key.to_string(), reason.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Media devices
// ---------------------------------------------------------------------------

pub struct FakePreview {
    camera_id: Option<String>,
    microphone_id: Option<String>,
    active: Arc<AtomicI32>,
    stopped: bool,
}

impl PreviewStream for FakePreview {
    fn camera_id(&self) -> Option<&str> {
        self.camera_id.as_deref()
    }

    fn microphone_id(&self) -> Option<&str> {
        self.microphone_id.as_deref()
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub struct FakeMediaBackend {
    devices: Mutex<Result<Vec<MediaDeviceInfo>, SessionError>>,
    /// Previews currently holding the devices.
    pub active: Arc<AtomicI32>,
    pub opened: AtomicU32,
    fail_open: Mutex<Option<SessionError>>,
}

impl FakeMediaBackend {
    pub fn new(devices: Result<Vec<MediaDeviceInfo>, SessionError>) -> Self {
        Self {
            devices: Mutex::new(devices),
            active: Arc::new(AtomicI32::new(0)),
            opened: AtomicU32::new(0),
            fail_open: Mutex::new(None),
        }
    }

    /// Fail the next `open_preview` with `error`.
    pub fn fail_next_open(&self, error: SessionError) {
        *self.fail_open.lock() = Some(error);
    }

    pub fn active_previews(&self) -> i32 {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaBackend for FakeMediaBackend {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, SessionError> {
        self.devices.lock().clone()
    }

    async fn open_preview(
        &self,
        camera_id: Option<&str>,
        microphone_id: Option<&str>,
    ) -> Result<Box<dyn PreviewStream>, SessionError> {
        if self.active.load(Ordering::SeqCst) > 0 {
            return Err(SessionError::Transport("device busy".to_string()));
        }
        if let Some(error) = self.fail_open.lock().take() {
            return Err(error);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePreview {
            camera_id: camera_id.map(str::to_string),
            microphone_id: microphone_id.map(str::to_string),
            active: self.active.clone(),
            stopped: false,
        }))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// One participant's client: fakes plus the services built from them.
pub struct Harness {
    pub credentials: Arc<FakeCredentials>,
    pub transport: Arc<FakeTransport>,
    pub backend: Arc<FakeBackend>,
    pub services: SessionServices,
}

impl Harness {
    /// Must be called inside a tokio runtime.
    pub fn new(local: Participant) -> Self {
        let credentials = Arc::new(FakeCredentials::default());
        let transport = Arc::new(FakeTransport::new(local));
        let backend = Arc::new(FakeBackend::new(&[SessionStatus::Accepted]));
        let services = SessionServices {
            credentials: credentials.clone(),
            transport: transport.clone(),
            backend: backend.clone(),
            registry: ConnectionRegistry::spawn(),
            bus: EventBus::new(),
        };
        Self {
            credentials,
            transport,
            backend,
            services,
        }
    }

    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        self.services.bus.subscribe()
    }
}
