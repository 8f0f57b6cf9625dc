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

//! Readiness & handoff detector for the waiting room.
//!
//! Two independent producers feed one [`AdvanceGate`]:
//!
//! 1. **Push**: a `session_started` control message for this session
//!    arriving on the room's data path.
//! 2. **Poll**: the persisted session status, polled by the non-privileged
//!    party once it has been connected for the minimum dwell time, advancing
//!    only on an observed non-active → active change.
//!
//! Whichever arrives first wins; the other becomes a no-op.

use log::{debug, info, warn};
use mentorcall_session_types::{ControlMessage, ParticipantRole};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::gate::{AdvanceGate, AdvanceReason};
use super::status_watch::{PollVerdict, StatusWatch};
use crate::config::HandoffTiming;
use crate::connection::{HandleEvent, RoomConnectionHandle};
use crate::control;
use crate::error::SessionError;
use crate::event_bus::EventBus;
use crate::events::ClientEvent;
use crate::platform::{now_ms, spawn, IntervalHandle, TimerSet};
use crate::session_api::SessionBackend;

struct DetectorInner {
    session_key: String,
    role: ParticipantRole,
    timing: HandoffTiming,
    backend: Arc<dyn SessionBackend>,
    bus: EventBus,
    gate: AdvanceGate,
    cancel: CancellationToken,
    status: Mutex<StatusWatch>,
    timers: Mutex<TimerSet>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Delayed advance after a local start. Survives a change of handle.
    started: Mutex<Option<JoinHandle<()>>>,
}

pub struct HandoffDetector {
    inner: Arc<DetectorInner>,
}

impl HandoffDetector {
    pub fn new(
        session_key: &str,
        role: ParticipantRole,
        timing: HandoffTiming,
        backend: Arc<dyn SessionBackend>,
        bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(DetectorInner {
                session_key: session_key.to_string(),
                role,
                timing,
                backend,
                bus,
                gate: AdvanceGate::new(),
                cancel: CancellationToken::new(),
                status: Mutex::new(StatusWatch::default()),
                timers: Mutex::new(TimerSet::new()),
                tasks: Mutex::new(Vec::new()),
                started: Mutex::new(None),
            }),
        }
    }

    pub fn gate(&self) -> &AdvanceGate {
        &self.inner.gate
    }

    pub fn is_advanced(&self) -> bool {
        self.inner.gate.is_advanced()
    }

    /// Resolves once either producer (or [`start_session`](Self::start_session)) fired.
    pub async fn wait_for_start(&self) -> AdvanceReason {
        self.inner.gate.wait().await
    }

    /// Start both producers on `handle`. Watching a new handle replaces the
    /// producers of the previous one.
    pub fn watch(&self, handle: &RoomConnectionHandle) {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() || inner.gate.is_advanced() {
            return;
        }
        inner.stop_producers();

        let mut tasks = inner.tasks.lock();
        tasks.push(spawn(listen_for_start(
            inner.clone(),
            handle.subscribe(),
        )));
        if !inner.role.is_privileged() {
            tasks.push(spawn(poll_after_dwell(inner.clone(), handle.clone())));
        }
    }

    /// Persist the start, announce it on the data path and advance this
    /// view after the configured start delay.
    ///
    /// Only the privileged participant may start a session. A failed
    /// broadcast is logged; the other party then learns of the start from
    /// its status poll.
    pub async fn start_session(&self, handle: &RoomConnectionHandle) -> Result<(), SessionError> {
        let inner = &self.inner;
        if !inner.role.is_privileged() {
            return Err(SessionError::SessionNotAuthorized(
                "only the mentor can start the session".to_string(),
            ));
        }
        if !handle.phase().is_connected() {
            return Err(SessionError::NotConnected);
        }

        let status = inner.backend.start_session(&inner.session_key).await?;
        info!("Session {} persisted as {status}", inner.session_key);

        let message = ControlMessage::session_started(&inner.session_key, now_ms());
        match control::encode(&message).and_then(|payload| handle.send_data(&payload)) {
            Ok(()) => debug!("Broadcast session_started for {}", inner.session_key),
            Err(e) => warn!(
                "Could not broadcast session_started for {}: {e}",
                inner.session_key
            ),
        }

        let delayed = inner.clone();
        let task = spawn(async move {
            tokio::select! {
                _ = delayed.cancel.cancelled() => {}
                _ = tokio::time::sleep(delayed.timing.start_delay) => {
                    delayed.advance(AdvanceReason::Initiated);
                }
            }
        });
        if let Some(previous) = inner.started.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Stop the producers of the watched handle without cancelling the
    /// detector. A later [`watch`](Self::watch) starts them again.
    pub fn unwatch(&self) {
        self.inner.stop_producers();
    }

    /// Stop every producer and timer. Synchronous.
    pub fn stop(&self) {
        self.inner.stop();
    }
}

impl Drop for HandoffDetector {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl std::fmt::Debug for HandoffDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandoffDetector")
            .field("session_key", &self.inner.session_key)
            .field("role", &self.inner.role)
            .field("advanced", &self.inner.gate.reason())
            .finish()
    }
}

impl DetectorInner {
    fn advance(&self, reason: AdvanceReason) {
        if self.cancel.is_cancelled() || !self.gate.try_advance(reason) {
            return;
        }
        self.bus.emit(ClientEvent::SessionStarted {
            session_key: self.session_key.clone(),
            via: reason,
        });
        self.timers.lock().clear();
    }

    fn on_data(&self, from: &str, payload: &[u8]) {
        let message = match control::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                debug!("Ignoring data from {from}: {e}");
                return;
            }
        };
        if !message.starts_session(&self.session_key) {
            debug!("Ignoring {:?} for {} from {from}", message.kind, message.session_key);
            return;
        }
        if self.role.is_privileged() {
            return;
        }
        info!("{from} started session {}", self.session_key);
        self.advance(AdvanceReason::ControlMessage);
    }

    async fn poll_once(&self) {
        if self.cancel.is_cancelled() || self.gate.is_advanced() {
            return;
        }
        let response = tokio::select! {
            _ = self.cancel.cancelled() => return,
            response = self.backend.session_status(&self.session_key) => response,
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                debug!("Status poll for {} failed: {e}", self.session_key);
                return;
            }
        };
        if self.cancel.is_cancelled() {
            return;
        }
        let verdict = self.status.lock().observe(response.status);
        match verdict {
            PollVerdict::Wait => {}
            PollVerdict::Advance => self.advance(AdvanceReason::StatusPoll),
            PollVerdict::Closed(status) => {
                info!("Session {} is {status}; stopping the status poll", self.session_key);
                self.timers.lock().clear();
                self.bus.emit(ClientEvent::SessionClosed {
                    session_key: self.session_key.clone(),
                    status,
                });
            }
        }
    }

    fn stop_producers(&self) {
        self.timers.lock().clear();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    fn stop(&self) {
        self.cancel.cancel();
        self.stop_producers();
        if let Some(started) = self.started.lock().take() {
            started.abort();
        }
    }
}

async fn listen_for_start(
    inner: Arc<DetectorInner>,
    mut events: tokio::sync::broadcast::Receiver<HandleEvent>,
) {
    loop {
        let event = tokio::select! {
            _ = inner.cancel.cancelled() => return,
            event = events.recv() => event,
        };
        match event {
            Ok(HandleEvent::Data { from, payload }) => inner.on_data(&from, &payload),
            Ok(HandleEvent::Closed { .. }) => return,
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                warn!("Start listener missed {missed} room events");
            }
            Err(RecvError::Closed) => return,
        }
    }
}

async fn poll_after_dwell(inner: Arc<DetectorInner>, handle: RoomConnectionHandle) {
    let mut phase = handle.subscribe_phase();
    drop(handle);
    let connected = tokio::select! {
        _ = inner.cancel.cancelled() => return,
        connected = phase.wait_for(|p| p.is_connected()) => connected.is_ok(),
    };
    if !connected {
        return;
    }

    debug!(
        "Waiting {:?} before polling status of {}",
        inner.timing.min_dwell, inner.session_key
    );
    tokio::select! {
        _ = inner.cancel.cancelled() => return,
        _ = phase.wait_for(|p| p.is_terminal()) => return,
        _ = tokio::time::sleep(inner.timing.min_dwell) => {}
    }

    inner.poll_once().await;
    if inner.cancel.is_cancelled() || inner.gate.is_advanced() || phase.borrow().is_terminal() {
        return;
    }

    let ticking = inner.clone();
    let timer = IntervalHandle::new_async(inner.timing.poll_interval, move || {
        let inner = ticking.clone();
        async move { inner.poll_once().await }
    });
    {
        let mut timers = inner.timers.lock();
        if inner.cancel.is_cancelled() || inner.gate.is_advanced() {
            return;
        }
        timers.push("status-poll", timer);
    }

    // The poll lives no longer than the connection it was started for.
    tokio::select! {
        _ = inner.cancel.cancelled() => {}
        _ = phase.wait_for(|p| p.is_terminal()) => {
            debug!(
                "Connection for {} ended; stopping the status poll",
                inner.session_key
            );
            inner.timers.lock().clear();
        }
    }
}
