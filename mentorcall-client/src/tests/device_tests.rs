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

use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::fakes::*;
use crate::error::SessionError;
use crate::event_bus::EventBus;
use crate::events::ClientEvent;
use crate::media_devices::{DeviceController, DeviceSelection, MediaDeviceInfo, MediaDeviceKind};

fn catalog() -> Vec<MediaDeviceInfo> {
    vec![
        MediaDeviceInfo::new("cam-1", "Built-in Camera", MediaDeviceKind::VideoInput),
        MediaDeviceInfo::new("cam-2", "USB Camera", MediaDeviceKind::VideoInput),
        MediaDeviceInfo::new("mic-1", "Built-in Microphone", MediaDeviceKind::AudioInput),
    ]
}

fn controller(devices: Result<Vec<MediaDeviceInfo>, SessionError>) -> (DeviceController, Arc<FakeMediaBackend>, EventBus) {
    let backend = Arc::new(FakeMediaBackend::new(devices));
    let bus = EventBus::new();
    (DeviceController::new(backend.clone(), bus.clone()), backend, bus)
}

#[tokio::test]
async fn lists_devices_and_selects_the_first_of_each_kind() {
    let (devices, _backend, bus) = controller(Ok(catalog()));
    let mut events = bus.subscribe();

    let available = devices.list_devices().await.unwrap();
    assert_eq!(available.cameras.len(), 2);
    assert_eq!(available.microphones.len(), 1);
    assert_eq!(devices.selection(), granted_devices());

    let events = drain(&mut events);
    assert!(matches!(events[0], ClientEvent::DevicesLoaded { .. }));
    assert!(matches!(
        &events[1],
        ClientEvent::DeviceSelectionChanged(selection) if *selection == granted_devices()
    ));
}

#[tokio::test]
async fn denied_permission_is_reported_and_non_fatal() {
    let (devices, _backend, bus) = controller(Err(SessionError::PermissionDenied(
        "NotAllowedError".to_string(),
    )));
    let mut events = bus.subscribe();

    let err = devices.list_devices().await.unwrap_err();
    assert!(matches!(err, SessionError::PermissionDenied(_)));
    assert!(err.is_non_fatal());
    assert!(err.guidance().is_some());
    assert_eq!(devices.selection(), DeviceSelection::none());
    assert!(!devices.selection().has_media());
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, ClientEvent::PermissionDenied(reason) if reason == "NotAllowedError")));
}

#[tokio::test]
async fn no_devices_is_non_fatal() {
    let (devices, _backend, _bus) = controller(Ok(Vec::new()));

    let err = devices.list_devices().await.unwrap_err();
    assert!(matches!(err, SessionError::NoDevicesFound));
    assert!(err.is_non_fatal());
    assert!(!devices.selection().has_media());
}

#[tokio::test]
async fn switching_devices_stops_the_old_preview_first() {
    let (devices, backend, _bus) = controller(Ok(catalog()));
    devices.list_devices().await.unwrap();

    devices.preview_selection(None, None).await.unwrap();
    assert_eq!(backend.active_previews(), 1);

    let selection = devices
        .preview_selection(Some("cam-2"), None)
        .await
        .unwrap();
    assert_eq!(selection.camera_id.as_deref(), Some("cam-2"));
    assert_eq!(selection.microphone_id.as_deref(), Some("mic-1"));
    assert_eq!(backend.active_previews(), 1);
    assert_eq!(backend.opened.load(Ordering::SeqCst), 2);
    assert_eq!(devices.selection(), selection);
}

#[tokio::test]
async fn failed_preview_leaves_the_selection_untouched() {
    let (devices, backend, bus) = controller(Ok(catalog()));
    devices.list_devices().await.unwrap();
    devices.preview_selection(None, None).await.unwrap();
    let mut events = bus.subscribe();

    backend.fail_next_open(SessionError::Transport("camera in use".to_string()));
    let err = devices
        .preview_selection(Some("cam-2"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));
    assert_eq!(devices.selection(), granted_devices());
    assert!(!devices.has_preview().await);
    assert!(drain(&mut events).is_empty());

    // Retrying without ids reopens what is published, not the failed camera.
    let selection = devices.preview_selection(None, None).await.unwrap();
    assert_eq!(selection, granted_devices());
    assert_eq!(backend.active_previews(), 1);
}

#[tokio::test]
async fn unknown_device_keeps_the_current_selection() {
    let (devices, _backend, _bus) = controller(Ok(catalog()));
    devices.list_devices().await.unwrap();

    let selection = devices
        .preview_selection(Some("cam-9"), None)
        .await
        .unwrap();
    assert_eq!(selection.camera_id.as_deref(), Some("cam-1"));
}

#[tokio::test]
async fn selection_changes_are_observable() {
    let (devices, _backend, _bus) = controller(Ok(catalog()));
    let mut selection = devices.subscribe_selection();
    devices.list_devices().await.unwrap();
    assert!(selection.has_changed().unwrap());
    assert_eq!(selection.borrow_and_update().camera_id.as_deref(), Some("cam-1"));

    devices.preview_selection(Some("cam-2"), None).await.unwrap();
    assert_eq!(selection.borrow_and_update().camera_id.as_deref(), Some("cam-2"));
}

#[tokio::test]
async fn release_stops_the_preview() {
    let (devices, backend, _bus) = controller(Ok(catalog()));
    devices.list_devices().await.unwrap();
    devices.preview_selection(None, None).await.unwrap();

    devices.release().await;
    assert_eq!(backend.active_previews(), 0);
    assert!(!devices.has_preview().await);

    // Releasing twice is harmless.
    devices.release().await;
    assert_eq!(backend.active_previews(), 0);
}
