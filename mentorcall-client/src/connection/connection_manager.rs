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

//! Connection state machine for one view.
//!
//! A [`ConnectionManager`] owns at most one [`ConnectionAttempt`] at a time
//! and drives it through the [`ConnectionPhase`]s: credential fetch,
//! transport handshake, registration in the [`ConnectionRegistry`], and then
//! supervision of the resulting [`RoomConnectionHandle`] until an explicit
//! [`disconnect`](ConnectionManager::disconnect).
//!
//! Every state write of an attempt is guarded by that attempt's
//! [`AbortToken`], so a superseded attempt can never touch the view again.

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::participants::Readiness;
use super::registry::{ConnectionRegistry, RegistryClaim};
use super::room_handle::{HandleEvent, RoomConnectionHandle};
use super::state::{ConnectionPhase, PhaseCell, PhaseEvent};
use crate::abort::{AbortController, AbortToken};
use crate::config::ClientConfig;
use crate::credentials::CredentialProvider;
use crate::error::SessionError;
use crate::event_bus::EventBus;
use crate::events::{ClientEvent, ScreenShareEvent};
use crate::media_devices::DeviceSelection;
use crate::platform::{now_ms, spawn, IntervalHandle, TimerSet};
use crate::retry::{backoff_sleep, run_with_retry, RetryNotice, RetryState};
use crate::session_api::SessionBackend;
use crate::transport::{ConnectParams, MediaTransport, RoomLink, TransportEvents};

/// External collaborators shared by every view of one client.
#[derive(Clone)]
pub struct SessionServices {
    pub credentials: Arc<dyn CredentialProvider>,
    pub transport: Arc<dyn MediaTransport>,
    pub backend: Arc<dyn SessionBackend>,
    pub registry: ConnectionRegistry,
    pub bus: EventBus,
}

impl std::fmt::Debug for SessionServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionServices")
            .field("registry", &self.registry)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

/// The attempt currently owned by a manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionAttempt {
    pub session_key: String,
    pub phase: ConnectionPhase,
    pub retry_count: u32,
    /// Generation of the attempt's abort token.
    pub generation: u64,
    pub started_at_ms: f64,
}

/// How a `connect()` call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new transport connection was made.
    Established,
    /// A live handle from the registry was adopted.
    Adopted,
    /// This manager already holds a live handle for the key.
    AlreadyConnected,
    /// An attempt for the key is already in flight.
    InProgress,
}

#[derive(Default)]
struct ManagerState {
    session_key: Option<String>,
    devices: DeviceSelection,
    handle: Option<RoomConnectionHandle>,
    attempt: Option<ConnectionAttempt>,
    timers: TimerSet,
    listener: Option<JoinHandle<()>>,
    recovery: Option<JoinHandle<()>>,
    navigating_forward: bool,
    last_error: Option<SessionError>,
}

struct Shared {
    config: ClientConfig,
    services: SessionServices,
    phase: PhaseCell,
    aborts: AbortController,
    retry: Mutex<RetryState>,
    state: Mutex<ManagerState>,
    current: watch::Sender<Option<RoomConnectionHandle>>,
}

pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig, services: SessionServices) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                services,
                phase: PhaseCell::new("view"),
                aborts: AbortController::new(),
                retry: Mutex::new(RetryState::default()),
                state: Mutex::new(ManagerState::default()),
                current: watch::channel(None).0,
            }),
        }
    }

    /// Connect this view to `session_key`.
    ///
    /// A call while an attempt for the same key is in flight, or while a live
    /// handle for it is held, is a no-op. A call for a different key, or
    /// after the held handle died, supersedes whatever this view had.
    /// The registry is consulted before a new transport connection is made.
    pub async fn connect(
        &self,
        session_key: &str,
        devices: DeviceSelection,
    ) -> Result<ConnectOutcome, SessionError> {
        let token = match self.shared.begin(session_key, devices.clone()) {
            Ok(token) => token,
            Err(outcome) => return Ok(outcome),
        };
        self.shared.establish(token, session_key, devices).await
    }

    /// Tear the connection down.
    ///
    /// Synchronously aborts the attempt and cancels every timer this view
    /// owns before releasing anything. Unless the view is navigating forward,
    /// the handle is unregistered and closed and a best-effort leave event is
    /// sent without being awaited.
    pub fn disconnect(&self) {
        self.shared.disconnect("user");
    }

    /// Mark that the view is handing its connection to the next view.
    ///
    /// While set, disconnecting or dropping the manager releases the view
    /// without closing the connection or unregistering it.
    pub fn set_navigating_forward(&self, navigating_forward: bool) {
        self.shared.state.lock().navigating_forward = navigating_forward;
    }

    pub fn is_navigating_forward(&self) -> bool {
        self.shared.state.lock().navigating_forward
    }

    /// Returns the new muted state, or `None` when not connected.
    pub fn toggle_mute(&self) -> Result<Option<bool>, SessionError> {
        let Some(handle) = self.live_handle() else {
            return Ok(None);
        };
        let muted = handle.toggle_mute()?;
        self.shared.services.bus.emit(ClientEvent::MuteChanged(muted));
        Ok(Some(muted))
    }

    /// Returns whether the camera is now on, or `None` when not connected.
    pub fn toggle_video(&self) -> Result<Option<bool>, SessionError> {
        let Some(handle) = self.live_handle() else {
            return Ok(None);
        };
        let enabled = handle.toggle_video()?;
        self.shared
            .services
            .bus
            .emit(ClientEvent::VideoChanged(enabled));
        Ok(Some(enabled))
    }

    /// Returns whether the screen is now shared, or `None` when not connected.
    pub fn toggle_screen_share(&self) -> Result<Option<bool>, SessionError> {
        let Some(handle) = self.live_handle() else {
            return Ok(None);
        };
        let event = match handle.toggle_screen_share()? {
            Some(track) => ScreenShareEvent::Started(track.track_id),
            None => ScreenShareEvent::Stopped,
        };
        let sharing = matches!(event, ScreenShareEvent::Started(_));
        self.shared
            .services
            .bus
            .emit(ClientEvent::ScreenShareStateChange(event));
        Ok(Some(sharing))
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.shared.phase.get()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.shared.phase.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.phase().is_connected()
    }

    pub fn is_connecting(&self) -> bool {
        self.phase().is_connecting()
    }

    pub fn is_peer_connected(&self) -> bool {
        self.phase().is_peer_connected()
    }

    pub fn session_key(&self) -> Option<String> {
        self.shared.state.lock().session_key.clone()
    }

    pub fn handle(&self) -> Option<RoomConnectionHandle> {
        self.shared.state.lock().handle.clone()
    }

    /// Observe which handle this view is attached to. Changes on connect,
    /// on recovery after an unexpected disconnect and on teardown.
    pub fn subscribe_handle(&self) -> watch::Receiver<Option<RoomConnectionHandle>> {
        self.shared.current.subscribe()
    }

    /// Devices passed to the last `connect()`.
    pub fn devices(&self) -> DeviceSelection {
        self.shared.state.lock().devices.clone()
    }

    pub fn readiness(&self) -> Readiness {
        match self.handle() {
            Some(handle) if self.is_connected() => handle.readiness(),
            _ => Readiness {
                present: 0,
                expected: self.shared.config.expected_participants,
                local_present: false,
            },
        }
    }

    pub fn current_attempt(&self) -> Option<ConnectionAttempt> {
        let mut attempt = self.shared.state.lock().attempt.clone()?;
        attempt.phase = self.phase();
        attempt.retry_count = self.shared.retry.lock().attempt();
        Some(attempt)
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.shared.state.lock().last_error.clone()
    }

    /// Number of periodic timers currently owned by this view.
    pub fn active_timers(&self) -> usize {
        self.shared.state.lock().timers.len()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    fn live_handle(&self) -> Option<RoomConnectionHandle> {
        if !self.is_connected() {
            return None;
        }
        self.handle()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shared.disconnect("view closed");
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("phase", &self.phase())
            .field("session_key", &self.session_key())
            .finish()
    }
}

impl Shared {
    /// Synchronous part of `connect()`: decide whether to start an attempt and,
    /// if so, supersede the previous one and issue its token.
    fn begin(
        &self,
        session_key: &str,
        devices: DeviceSelection,
    ) -> Result<AbortToken, ConnectOutcome> {
        let mut state = self.state.lock();
        let phase = self.phase.get();
        let same_key = state.session_key.as_deref() == Some(session_key);

        if same_key && phase.is_connecting() {
            debug!("connect({session_key}) ignored: attempt already in flight");
            return Err(ConnectOutcome::InProgress);
        }
        if same_key && state.handle.as_ref().is_some_and(|h| h.is_alive()) {
            debug!("connect({session_key}) ignored: already connected");
            return Err(ConnectOutcome::AlreadyConnected);
        }

        let previous_key = state.session_key.clone();
        let old_handle = self.detach(&mut state);
        if let Some(recovery) = state.recovery.take() {
            recovery.abort();
        }
        if phase.is_connecting() {
            self.apply_phase(
                previous_key.as_deref().unwrap_or(session_key),
                PhaseEvent::Supersede,
            );
        } else if phase.is_connected() {
            self.apply_phase(
                previous_key.as_deref().unwrap_or(session_key),
                PhaseEvent::DisconnectRequested,
            );
        }
        if let (Some(handle), Some(key)) = (old_handle, previous_key.as_deref()) {
            self.teardown(key, handle, "superseded");
        }

        let token = self.aborts.issue();
        self.retry.lock().reset();
        state.session_key = Some(session_key.to_string());
        state.devices = devices;
        state.last_error = None;
        state.attempt = Some(ConnectionAttempt {
            session_key: session_key.to_string(),
            phase: ConnectionPhase::Connecting,
            retry_count: 0,
            generation: token.generation(),
            started_at_ms: now_ms(),
        });
        self.apply_phase(session_key, PhaseEvent::ConnectRequested);
        Ok(token)
    }

    /// Asynchronous part of `connect()`: adopt from the registry, wait for
    /// another view's attempt for the same key, or lead the retried connect
    /// sequence. Then attach to the resulting handle.
    async fn establish(
        self: &Arc<Self>,
        token: AbortToken,
        session_key: &str,
        devices: DeviceSelection,
    ) -> Result<ConnectOutcome, SessionError> {
        let _claim = loop {
            let pending = match self.services.registry.claim(session_key).await {
                RegistryClaim::Live(handle) => {
                    token.check()?;
                    info!("Adopting live connection {session_key}#{}", handle.id());
                    self.attach(&token, session_key, handle);
                    return Ok(ConnectOutcome::Adopted);
                }
                RegistryClaim::Lead(claim) => break claim,
                RegistryClaim::Pending(pending) => pending,
            };
            debug!("Waiting for another view's attempt on {session_key}");
            let resolved = tokio::select! {
                biased;
                _ = token.aborted() => return Err(SessionError::Aborted),
                resolved = pending => resolved.ok().flatten(),
            };
            if let Some(handle) = resolved.filter(|h| h.is_alive()) {
                token.check()?;
                info!(
                    "Adopting connection {session_key}#{} from a concurrent attempt",
                    handle.id()
                );
                self.attach(&token, session_key, handle);
                return Ok(ConnectOutcome::Adopted);
            }
        };
        token.check()?;

        let result = run_with_retry(
            &self.config.retry,
            &self.retry,
            &token,
            |notice| self.on_retry(session_key, notice),
            |_| self.attempt_once(&token, session_key, &devices),
        )
        .await;

        let (link, events) = match result {
            Ok(connected) => connected,
            Err(SessionError::Aborted) => {
                debug!("Attempt for {session_key} aborted");
                return Err(SessionError::Aborted);
            }
            Err(e) => {
                self.fail(&token, session_key, e.clone());
                return Err(e);
            }
        };

        let handle = RoomConnectionHandle::establish(
            session_key,
            link,
            events,
            &devices,
            self.config.expected_participants,
        );
        if let Err(e) = self.services.registry.put(handle.clone()).await {
            warn!("Could not register {session_key}#{}: {e}", handle.id());
        }
        if !token.is_current() {
            debug!("Attempt for {session_key} superseded after connecting; closing");
            self.services
                .registry
                .delete_handle(session_key, handle.id());
            handle.close();
            return Err(SessionError::Aborted);
        }
        self.attach(&token, session_key, handle);
        Ok(ConnectOutcome::Established)
    }

    /// Credential fetch then transport handshake, each a cancellation point.
    async fn attempt_once(
        &self,
        token: &AbortToken,
        session_key: &str,
        devices: &DeviceSelection,
    ) -> Result<(Arc<dyn RoomLink>, TransportEvents), SessionError> {
        let credential = self
            .services
            .credentials
            .request_join_credential(session_key)
            .await?;
        token.check()?;

        let params = ConnectParams {
            session_key: session_key.to_string(),
            credential: credential.credential,
            transport_address: credential.transport_address,
            room_name: credential.room_name,
            devices: devices.clone(),
        };
        let after = self.config.connect_timeout;
        let (link, events) = tokio::time::timeout(after, self.services.transport.connect(params))
            .await
            .map_err(|_| SessionError::Timeout {
                after,
                stage: "connecting to the media transport",
            })??;

        if !token.is_current() {
            link.close();
            return Err(SessionError::Aborted);
        }
        Ok((link, events))
    }

    fn on_retry(&self, session_key: &str, notice: &RetryNotice) {
        self.services.bus.emit(ClientEvent::Retrying {
            session_key: session_key.to_string(),
            attempt: notice.attempt,
            max_attempts: notice.max_attempts,
            delay: notice.delay,
            error: notice.error.clone(),
        });
    }

    fn fail(&self, token: &AbortToken, session_key: &str, error: SessionError) {
        if !token.is_current() {
            debug!("Discarding failure of superseded attempt for {session_key}: {error}");
            return;
        }
        error!("Connection to {session_key} failed: {error}");
        self.state.lock().last_error = Some(error.clone());
        self.apply_phase(session_key, PhaseEvent::Fail);
        if error.is_user_visible() {
            self.services.bus.emit(ClientEvent::ConnectionFailed {
                session_key: session_key.to_string(),
                error,
            });
        }
    }

    /// Make `handle` this view's connection: mirror its phase, start the
    /// participant refresh and listen to its events.
    fn attach(
        self: &Arc<Self>,
        token: &AbortToken,
        session_key: &str,
        handle: RoomConnectionHandle,
    ) {
        let events = handle.subscribe();
        {
            let mut state = self.state.lock();
            if !token.is_current() {
                return;
            }
            state.handle = Some(handle.clone());
            self.current.send_replace(Some(handle.clone()));

            let weak_handle = handle.downgrade();
            state.timers.push(
                "participant-refresh",
                IntervalHandle::new(self.config.participant_refresh_interval, move || {
                    if let Some(handle) = weak_handle.upgrade() {
                        handle.refresh_participants();
                    }
                }),
            );

            let listener = spawn(listen(
                Arc::downgrade(self),
                token.clone(),
                session_key.to_string(),
                handle.clone(),
                events,
            ));
            if let Some(old) = state.listener.replace(listener) {
                old.abort();
            }
        }

        self.on_handle_phase(session_key, &handle, handle.phase());
        self.services
            .bus
            .emit(ClientEvent::ReadinessChanged(handle.readiness()));
    }

    fn on_handle_event(
        self: &Arc<Self>,
        token: &AbortToken,
        session_key: &str,
        handle: &RoomConnectionHandle,
        event: HandleEvent,
    ) {
        let bus = &self.services.bus;
        match event {
            HandleEvent::Phase { phase, .. } => self.on_handle_phase(session_key, handle, phase),
            HandleEvent::ParticipantJoined(participant) => {
                bus.emit(ClientEvent::ParticipantJoined(participant));
                self.publish_if_ready(handle);
            }
            HandleEvent::ParticipantLeft(identity) => {
                bus.emit(ClientEvent::ParticipantLeft(identity));
            }
            HandleEvent::ReadinessChanged(readiness) => {
                bus.emit(ClientEvent::ReadinessChanged(readiness));
            }
            HandleEvent::ScreenShareEnded { .. } => {
                bus.emit(ClientEvent::ScreenShareStateChange(
                    ScreenShareEvent::EndedOutOfBand,
                ));
            }
            HandleEvent::NegotiationFailed(error) => {
                let handle = {
                    let mut state = self.state.lock();
                    self.detach(&mut state)
                };
                if let Some(handle) = handle {
                    self.teardown(session_key, handle, "connection_failed");
                }
                self.fail(token, session_key, error);
            }
            HandleEvent::Closed {
                requested: false,
                error,
            } => {
                let error = error.unwrap_or(SessionError::Transport("disconnected".into()));
                self.recover(session_key, handle, error);
            }
            HandleEvent::Data { .. } | HandleEvent::Closed { .. } => {}
        }
    }

    /// Bring the view's phase in line with the handle's.
    fn on_handle_phase(
        self: &Arc<Self>,
        session_key: &str,
        handle: &RoomConnectionHandle,
        target: ConnectionPhase,
    ) {
        use ConnectionPhase::*;

        let event = match (self.phase.get(), target) {
            (current, target) if current == target => None,
            (Connecting, SignalConnected) => Some(PhaseEvent::SignalEstablished),
            (Connecting, target) if target.is_adoptable() => Some(PhaseEvent::Adopted(target)),
            (_, PeerConnected) => Some(PhaseEvent::PeerEstablished),
            (Reconnecting, SignalConnected) => Some(PhaseEvent::TransportRestored { peer: false }),
            (_, Reconnecting) => Some(PhaseEvent::TransportInterrupted),
            (_, Failed) => Some(PhaseEvent::Fail),
            (_, Disconnected) => Some(PhaseEvent::RemoteClosed),
            _ => None,
        };
        if let Some(event) = event {
            self.apply_phase(session_key, event);
        }

        if self.phase.get() == PeerConnected {
            self.retry.lock().reset();
            self.publish_if_ready(handle);
        }
    }

    fn publish_if_ready(&self, handle: &RoomConnectionHandle) {
        let devices = self.state.lock().devices.clone();
        if let Err(e) = handle.maybe_publish(&devices) {
            warn!("Publishing local tracks failed: {e}");
        }
    }

    /// The transport closed without being asked to. Counts as a failed
    /// attempt against the same budget and reconnects after the backoff.
    fn recover(
        self: &Arc<Self>,
        session_key: &str,
        handle: &RoomConnectionHandle,
        error: SessionError,
    ) {
        let (token, devices) = {
            let mut state = self.state.lock();
            let owned = state.handle.as_ref().map(|h| h.id()) == Some(handle.id());
            if !owned {
                return;
            }
            self.detach(&mut state);
            let token = self.aborts.issue();
            state.attempt = Some(ConnectionAttempt {
                session_key: session_key.to_string(),
                phase: ConnectionPhase::Connecting,
                retry_count: 0,
                generation: token.generation(),
                started_at_ms: now_ms(),
            });
            (token, state.devices.clone())
        };
        self.services
            .registry
            .delete_handle(session_key, handle.id());

        if self.phase.get().is_connected() {
            self.apply_phase(session_key, PhaseEvent::RemoteClosed);
        }
        self.apply_phase(session_key, PhaseEvent::ConnectRequested);

        let failures = self.retry.lock().record_failure();
        if failures >= self.config.retry.max_attempts {
            let error = SessionError::RetryExhausted {
                attempts: failures,
                last: Box::new(error),
            };
            self.fail(&token, session_key, error);
            return;
        }

        let delay = self.config.retry.backoff(failures);
        warn!(
            "Connection to {session_key} lost ({error}); reconnecting in {delay:?} (attempt {failures}/{})",
            self.config.retry.max_attempts
        );
        self.on_retry(
            session_key,
            &RetryNotice {
                attempt: failures,
                max_attempts: self.config.retry.max_attempts,
                delay,
                error,
            },
        );

        let shared = self.clone();
        let key = session_key.to_string();
        let task = spawn(async move {
            if backoff_sleep(delay, &token).await.is_err() {
                return;
            }
            if let Err(e) = shared.establish(token, &key, devices).await {
                debug!("Reconnect to {key} ended with {e}");
            }
        });
        if let Some(old) = self.state.lock().recovery.replace(task) {
            old.abort();
        }
    }

    fn disconnect(&self, reason: &str) {
        self.aborts.abort_all();
        let (handle, session_key, navigating_forward) = {
            let mut state = self.state.lock();
            let handle = self.detach(&mut state);
            if let Some(recovery) = state.recovery.take() {
                recovery.abort();
            }
            state.attempt = None;
            (handle, state.session_key.clone(), state.navigating_forward)
        };
        let Some(session_key) = session_key else {
            return;
        };

        match handle {
            Some(handle) if navigating_forward => {
                info!(
                    "Releasing {session_key}#{} for the next view without disconnecting",
                    handle.id()
                );
            }
            Some(handle) => {
                self.teardown(&session_key, handle, reason);
                self.apply_phase(&session_key, PhaseEvent::DisconnectRequested);
            }
            None => {
                self.apply_phase(&session_key, PhaseEvent::DisconnectRequested);
            }
        }
    }

    /// Unregister, close and log a leave event without waiting for it.
    fn teardown(&self, session_key: &str, handle: RoomConnectionHandle, reason: &str) {
        self.services
            .registry
            .delete_handle(session_key, handle.id());
        handle.close();

        let backend = self.services.backend.clone();
        let key = session_key.to_string();
        let reason = reason.to_string();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = backend.record_leave(&key, &reason).await {
                        debug!("Leave event for {key} not recorded: {e}");
                    }
                });
            }
            Err(_) => debug!("No runtime; skipping leave event for {key}"),
        }
    }

    /// Cancel timers and the listener and take the handle. Must run before
    /// anything owned by the view is released.
    fn detach(&self, state: &mut ManagerState) -> Option<RoomConnectionHandle> {
        let cancelled = state.timers.clear();
        if cancelled > 0 {
            debug!("Cancelled {cancelled} timer(s)");
        }
        if let Some(listener) = state.listener.take() {
            listener.abort();
        }
        self.current.send_replace(None);
        state.handle.take()
    }

    fn apply_phase(&self, session_key: &str, event: PhaseEvent) -> Option<ConnectionPhase> {
        let before = self.phase.get();
        let phase = self.phase.apply(event).ok()?;
        if phase != before {
            self.services.bus.emit(ClientEvent::PhaseChanged {
                session_key: session_key.to_string(),
                phase,
            });
        }
        Some(phase)
    }
}

async fn listen(
    shared: Weak<Shared>,
    token: AbortToken,
    session_key: String,
    handle: RoomConnectionHandle,
    mut events: broadcast::Receiver<HandleEvent>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = token.aborted() => return,
            event = events.recv() => event,
        };
        match event {
            Ok(event) => {
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                if !token.is_current() {
                    return;
                }
                shared.on_handle_event(&token, &session_key, &handle, event);
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Listener for {session_key} missed {missed} events; resyncing");
                if let Some(shared) = shared.upgrade() {
                    handle.refresh_participants();
                    shared.on_handle_phase(&session_key, &handle, handle.phase());
                }
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
