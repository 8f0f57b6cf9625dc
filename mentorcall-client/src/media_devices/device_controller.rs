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

//! Device enumeration and local preview.

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use super::media_device_list::{DeviceLists, MediaDeviceInfo};
use crate::error::SessionError;
use crate::event_bus::EventBus;
use crate::events::ClientEvent;

/// The camera/microphone pair handed to the connection state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelection {
    pub camera_id: Option<String>,
    pub microphone_id: Option<String>,
    /// Whether the user granted device access. Tracks are only published
    /// when this is true.
    pub granted: bool,
}

impl DeviceSelection {
    /// A selection with no devices, used to join audio/video-less.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_media(&self) -> bool {
        self.granted && (self.camera_id.is_some() || self.microphone_id.is_some())
    }
}

/// A running local preview. Stopping releases the underlying devices.
pub trait PreviewStream: Send + Sync {
    fn camera_id(&self) -> Option<&str>;
    fn microphone_id(&self) -> Option<&str>;
    fn stop(&mut self);
}

/// Platform access to local media devices.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Enumerate input devices. Fails with [`SessionError::PermissionDenied`]
    /// if the user declines access.
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, SessionError>;

    async fn open_preview(
        &self,
        camera_id: Option<&str>,
        microphone_id: Option<&str>,
    ) -> Result<Box<dyn PreviewStream>, SessionError>;
}

/// Enumerated devices, as returned by [`DeviceController::list_devices`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableDevices {
    pub cameras: Vec<MediaDeviceInfo>,
    pub microphones: Vec<MediaDeviceInfo>,
}

/// Enumerates cameras and microphones, owns the preview stream and reports
/// the selected pair upward through [`subscribe_selection`](Self::subscribe_selection)
/// and [`ClientEvent::DeviceSelectionChanged`].
pub struct DeviceController {
    backend: Arc<dyn MediaBackend>,
    bus: EventBus,
    lists: Mutex<DeviceLists>,
    preview: tokio::sync::Mutex<Option<Box<dyn PreviewStream>>>,
    selection: watch::Sender<DeviceSelection>,
}

impl DeviceController {
    pub fn new(backend: Arc<dyn MediaBackend>, bus: EventBus) -> Self {
        let (selection, _) = watch::channel(DeviceSelection::none());
        Self {
            backend,
            bus,
            lists: Mutex::new(DeviceLists::default()),
            preview: tokio::sync::Mutex::new(None),
            selection,
        }
    }

    /// Enumerate cameras and microphones.
    ///
    /// `PermissionDenied` and `NoDevicesFound` are non-fatal: the caller may
    /// proceed with [`DeviceSelection::none`].
    pub async fn list_devices(&self) -> Result<AvailableDevices, SessionError> {
        let devices = match self.backend.enumerate_devices().await {
            Ok(devices) => devices,
            Err(SessionError::PermissionDenied(reason)) => {
                warn!("Device access denied: {reason}");
                self.set_selection(DeviceSelection::none());
                self.bus.emit(ClientEvent::PermissionDenied(reason.clone()));
                return Err(SessionError::PermissionDenied(reason));
            }
            Err(e) => return Err(e),
        };

        let (available, selection) = {
            let mut lists = self.lists.lock();
            lists.load(devices);
            let available = AvailableDevices {
                cameras: lists.cameras.devices().to_vec(),
                microphones: lists.microphones.devices().to_vec(),
            };
            let selection = DeviceSelection {
                camera_id: lists.cameras.selected(),
                microphone_id: lists.microphones.selected(),
                granted: !lists.is_empty(),
            };
            (available, selection)
        };

        info!(
            "Found {} camera(s) and {} microphone(s)",
            available.cameras.len(),
            available.microphones.len()
        );
        self.bus.emit(ClientEvent::DevicesLoaded {
            cameras: available.cameras.clone(),
            microphones: available.microphones.clone(),
        });
        self.set_selection(selection);

        if available.cameras.is_empty() && available.microphones.is_empty() {
            return Err(SessionError::NoDevicesFound);
        }
        Ok(available)
    }

    /// Open a preview for the given devices, replacing any prior preview.
    ///
    /// The old stream is stopped before the new one is opened. `None` keeps
    /// the current selection for that kind; unknown ids are ignored. The
    /// selection only changes once the new preview is open.
    pub async fn preview_selection(
        &self,
        camera_id: Option<&str>,
        microphone_id: Option<&str>,
    ) -> Result<DeviceSelection, SessionError> {
        let mut preview = self.preview.lock().await;

        let selection = {
            let lists = self.lists.lock();
            if let Some(id) = camera_id.filter(|id| !lists.cameras.contains(id)) {
                debug!("Ignoring unknown camera {id}");
            }
            if let Some(id) = microphone_id.filter(|id| !lists.microphones.contains(id)) {
                debug!("Ignoring unknown microphone {id}");
            }
            DeviceSelection {
                camera_id: lists.cameras.candidate(camera_id),
                microphone_id: lists.microphones.candidate(microphone_id),
                granted: self.selection.borrow().granted,
            }
        };

        if let Some(mut old) = preview.take() {
            debug!("Stopping previous preview");
            old.stop();
        }

        let stream = match self
            .backend
            .open_preview(
                selection.camera_id.as_deref(),
                selection.microphone_id.as_deref(),
            )
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Could not open preview: {e}");
                return Err(e);
            }
        };
        *preview = Some(stream);

        {
            let mut lists = self.lists.lock();
            if let Some(id) = &selection.camera_id {
                lists.cameras.select(id);
            }
            if let Some(id) = &selection.microphone_id {
                lists.microphones.select(id);
            }
        }
        self.set_selection(selection.clone());
        Ok(selection)
    }

    pub fn selection(&self) -> DeviceSelection {
        self.selection.borrow().clone()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<DeviceSelection> {
        self.selection.subscribe()
    }

    pub async fn has_preview(&self) -> bool {
        self.preview.lock().await.is_some()
    }

    /// Stop the preview and release the devices.
    pub async fn release(&self) {
        if let Some(mut stream) = self.preview.lock().await.take() {
            info!("Releasing preview devices");
            stream.stop();
        }
    }

    fn set_selection(&self, selection: DeviceSelection) {
        let changed = self.selection.send_if_modified(|current| {
            if *current == selection {
                false
            } else {
                *current = selection.clone();
                true
            }
        });
        if changed {
            self.bus.emit(ClientEvent::DeviceSelectionChanged(selection));
        }
    }
}

impl std::fmt::Debug for DeviceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceController")
            .field("selection", &*self.selection.borrow())
            .finish()
    }
}
