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

use log::{debug, info};
use mentorcall_session_types::ParticipantRole;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::connection::{ConnectOutcome, ConnectionManager, Readiness, SessionServices};
use crate::error::SessionError;
use crate::handoff::{AdvanceReason, HandoffDetector};
use crate::media_devices::{DeviceController, DeviceSelection};
use crate::platform::spawn;

/// Options struct for constructing a call via [SessionCall::waiting_room(options, services)][SessionCall::waiting_room]
#[derive(Clone, Debug, PartialEq)]
pub struct SessionCallOptions {
    /// Session being joined
    pub session_key: String,

    /// Role of the local participant; only the mentor may start the session
    pub role: ParticipantRole,

    pub config: ClientConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallView {
    WaitingRoom,
    ActiveCall,
}

/// One view of a mentorship session: the waiting room or the active call.
///
/// Construct the waiting room with [waiting_room()][Self::waiting_room],
/// [join()][Self::join] it, and once the session starts hand the live
/// connection to the active call with [advance_to_active()][Self::advance_to_active].
/// [leave()][Self::leave] tears everything down.
pub struct SessionCall {
    options: SessionCallOptions,
    view: CallView,
    services: SessionServices,
    connection: ConnectionManager,
    detector: Option<Arc<HandoffDetector>>,
    devices: Option<Arc<DeviceController>>,
    rewatch: Option<JoinHandle<()>>,
}

impl SessionCall {
    pub fn waiting_room(options: SessionCallOptions, services: SessionServices) -> Self {
        let detector = HandoffDetector::new(
            &options.session_key,
            options.role,
            options.config.handoff,
            services.backend.clone(),
            services.bus.clone(),
        );
        Self::build(options, services, CallView::WaitingRoom, Some(Arc::new(detector)))
    }

    /// The device controller whose selection is used by
    /// [join_with_selected_devices()][Self::join_with_selected_devices] and
    /// whose preview is released on leave.
    pub fn with_devices(mut self, devices: Arc<DeviceController>) -> Self {
        self.devices = Some(devices);
        self
    }

    fn build(
        options: SessionCallOptions,
        services: SessionServices,
        view: CallView,
        detector: Option<Arc<HandoffDetector>>,
    ) -> Self {
        let connection = ConnectionManager::new(options.config.clone(), services.clone());
        Self {
            options,
            view,
            services,
            connection,
            detector,
            devices: None,
            rewatch: None,
        }
    }

    pub fn view(&self) -> CallView {
        self.view
    }

    pub fn session_key(&self) -> &str {
        &self.options.session_key
    }

    pub fn role(&self) -> ParticipantRole {
        self.options.role
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn readiness(&self) -> Readiness {
        self.connection.readiness()
    }

    /// Connect with the given devices and, in the waiting room, start
    /// watching for the session start on every handle the view attaches to.
    pub async fn join(&mut self, devices: DeviceSelection) -> Result<ConnectOutcome, SessionError> {
        let outcome = self
            .connection
            .connect(&self.options.session_key, devices)
            .await?;
        if let Some(detector) = &self.detector {
            if self.rewatch.is_none() {
                self.rewatch = Some(spawn(rewatch_handles(
                    Arc::downgrade(detector),
                    self.connection.subscribe_handle(),
                )));
            }
        }
        Ok(outcome)
    }

    pub async fn join_with_selected_devices(&mut self) -> Result<ConnectOutcome, SessionError> {
        let selection = self
            .devices
            .as_ref()
            .map(|devices| devices.selection())
            .unwrap_or_else(DeviceSelection::none);
        self.join(selection).await
    }

    /// Start the session (mentor only). See [`HandoffDetector::start_session`].
    pub async fn start_session(&self) -> Result<(), SessionError> {
        let detector = self.detector.as_ref().ok_or(SessionError::NotConnected)?;
        let handle = self.connection.handle().ok_or(SessionError::NotConnected)?;
        detector.start_session(&handle).await
    }

    /// Resolves once the waiting room should advance. `None` in the active call.
    pub async fn wait_for_start(&self) -> Option<AdvanceReason> {
        match &self.detector {
            Some(detector) => Some(detector.wait_for_start().await),
            None => None,
        }
    }

    /// Hand the live connection to the active-call view.
    ///
    /// The "navigating forward" flag is set before this view lets go, so the
    /// connection stays open and registered; the new view adopts it from the
    /// registry without a new handshake.
    pub async fn advance_to_active(mut self) -> Result<SessionCall, SessionError> {
        if self.view == CallView::ActiveCall {
            return Ok(self);
        }
        self.stop_watching();
        self.connection.set_navigating_forward(true);

        let devices = self.connection.devices();
        let mut active = SessionCall::build(
            self.options.clone(),
            self.services.clone(),
            CallView::ActiveCall,
            None,
        );
        active.devices = self.devices.take();

        let outcome = active.connection.connect(&self.options.session_key, devices).await;
        drop(self);
        let outcome = outcome?;
        info!("Active call view ready ({outcome:?})");
        Ok(active)
    }

    /// End the session for both parties (mentor only), then leave.
    pub async fn end_session(self) -> Result<(), SessionError> {
        if !self.options.role.is_privileged() {
            return Err(SessionError::SessionNotAuthorized(
                "only the mentor can end the session".to_string(),
            ));
        }
        let status = self.services.backend.end(&self.options.session_key).await?;
        debug!("Session {} is now {status}", self.options.session_key);
        self.leave().await;
        Ok(())
    }

    /// Full teardown: stop the detector, disconnect, release the devices.
    pub async fn leave(mut self) {
        self.stop_watching();
        self.connection.set_navigating_forward(false);
        self.connection.disconnect();
        if let Some(devices) = self.devices.take() {
            devices.release().await;
        }
    }

    fn stop_watching(&mut self) {
        if let Some(rewatch) = self.rewatch.take() {
            rewatch.abort();
        }
        if let Some(detector) = self.detector.take() {
            detector.stop();
        }
    }
}

impl Drop for SessionCall {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

impl std::fmt::Debug for SessionCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCall")
            .field("session_key", &self.options.session_key)
            .field("view", &self.view)
            .field("connection", &self.connection)
            .finish()
    }
}

/// Point the detector at every new handle the view attaches to.
async fn rewatch_handles(
    detector: Weak<HandoffDetector>,
    mut handles: tokio::sync::watch::Receiver<Option<crate::connection::RoomConnectionHandle>>,
) {
    let mut watched = None;
    loop {
        let current = handles.borrow_and_update().clone();
        let Some(detector) = detector.upgrade() else {
            return;
        };
        match current {
            Some(handle) if watched != Some(handle.id()) => {
                watched = Some(handle.id());
                detector.watch(&handle);
            }
            Some(_) => {}
            None if watched.take().is_some() => detector.unwatch(),
            None => {}
        }
        drop(detector);
        if handles.changed().await.is_err() {
            return;
        }
    }
}
