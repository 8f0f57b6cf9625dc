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

use serde::{Deserialize, Serialize};

/// Kind of a local input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    AudioInput,
    VideoInput,
}

/// One entry of the platform's device enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub label: String,
    pub kind: MediaDeviceKind,
}

impl MediaDeviceInfo {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>, kind: MediaDeviceKind) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind,
        }
    }
}

/// A "smart" list of [`MediaDeviceInfo`] items, used by [`DeviceLists`].
///
/// The list keeps track of a currently selected device. Until something is
/// selected explicitly, the first device is the selection.
#[derive(Debug, Clone, Default)]
pub struct SelectableDevices {
    devices: Vec<MediaDeviceInfo>,
    selected: Option<String>,
}

impl SelectableDevices {
    pub fn new(devices: Vec<MediaDeviceInfo>) -> Self {
        Self {
            devices,
            selected: None,
        }
    }

    /// Select a device by the `device_id` of an entry in [`devices()`](Self::devices).
    ///
    /// Returns `false` and changes nothing if the id is unknown.
    pub fn select(&mut self, device_id: &str) -> bool {
        if self.contains(device_id) {
            self.selected = Some(device_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn devices(&self) -> &[MediaDeviceInfo] {
        &self.devices
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d.device_id == device_id)
    }

    /// The id [`select`](Self::select) would leave selected, without selecting it.
    pub fn candidate(&self, device_id: Option<&str>) -> Option<String> {
        match device_id {
            Some(id) if self.contains(id) => Some(id.to_string()),
            _ => self.selected(),
        }
    }

    /// Returns the `device_id` of the currently selected device, or `None` if there are no devices.
    pub fn selected(&self) -> Option<String> {
        match &self.selected {
            Some(selected) => Some(selected.clone()),
            // device 0 is the default selection
            None => self.devices.first().map(|d| d.device_id.clone()),
        }
    }

    /// Replace the device list, keeping the selection if it still exists.
    pub fn replace(&mut self, devices: Vec<MediaDeviceInfo>) {
        if let Some(selected) = &self.selected {
            if !devices.iter().any(|d| &d.device_id == selected) {
                self.selected = None;
            }
        }
        self.devices = devices;
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// The available audio and video input devices, each with a current selection.
#[derive(Debug, Clone, Default)]
pub struct DeviceLists {
    pub cameras: SelectableDevices,
    pub microphones: SelectableDevices,
}

impl DeviceLists {
    /// Split a raw enumeration into cameras and microphones.
    pub fn load(&mut self, devices: Vec<MediaDeviceInfo>) {
        let (cameras, microphones): (Vec<_>, Vec<_>) = devices
            .into_iter()
            .partition(|d| d.kind == MediaDeviceKind::VideoInput);
        self.cameras.replace(cameras);
        self.microphones.replace(microphones);
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty() && self.microphones.is_empty()
    }
}
