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

//! Local camera and microphone handling.

mod device_controller;
mod media_device_list;

pub use device_controller::{
    AvailableDevices, DeviceController, DeviceSelection, MediaBackend, PreviewStream,
};
pub use media_device_list::{DeviceLists, MediaDeviceInfo, MediaDeviceKind, SelectableDevices};
