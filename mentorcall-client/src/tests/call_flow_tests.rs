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

//! Waiting room to active call, end to end.

use mentorcall_session_types::{ParticipantRole, SessionStatus};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::fakes::*;
use crate::client::{CallView, SessionCall, SessionCallOptions};
use crate::config::ClientConfig;
use crate::connection::ConnectionPhase;
use crate::error::SessionError;
use crate::media_devices::{DeviceController, MediaDeviceInfo, MediaDeviceKind};
use crate::transport::TransportEvent;

fn waiting_room(harness: &Harness, role: ParticipantRole) -> SessionCall {
    SessionCall::waiting_room(
        SessionCallOptions {
            session_key: SESSION.to_string(),
            role,
            config: ClientConfig::default(),
        },
        harness.services.clone(),
    )
}

#[tokio::test(start_paused = true)]
async fn advancing_reuses_the_waiting_room_connection() {
    let side = Harness::new(mentee());
    side.backend
        .set_statuses(&[SessionStatus::Accepted, SessionStatus::Active]);
    let mut call = waiting_room(&side, ParticipantRole::Mentee);
    call.join(granted_devices()).await.unwrap();
    side.transport
        .emit(TransportEvent::ParticipantJoined(mentor()));
    side.transport.emit(TransportEvent::PeerConnected);
    assert!(call.wait_for_start().await.is_some());

    let link = side.transport.last_link();
    let active = call.advance_to_active().await.unwrap();
    settle().await;

    assert_eq!(active.view(), CallView::ActiveCall);
    assert_eq!(active.connection().phase(), ConnectionPhase::PeerConnected);
    assert_eq!(active.readiness().to_string(), "2/2 ready");
    assert_eq!(side.transport.handshakes(), 1);
    assert_eq!(side.credentials.calls(), 1);
    assert!(!link.is_closed());
    assert!(side.backend.leaves.lock().is_empty());
    assert_eq!(active.wait_for_start().await, None);

    // The waiting room's timers went with it.
    let polls = side.backend.polls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(side.backend.polls(), polls);

    active.leave().await;
    settle().await;
    assert!(link.is_closed());
    assert_eq!(side.services.registry.len().await, 0);
    assert_eq!(side.backend.leaves.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn advancing_after_the_connection_died_connects_again() {
    let side = Harness::new(mentee());
    let mut call = waiting_room(&side, ParticipantRole::Mentee);
    call.join(granted_devices()).await.unwrap();
    call.connection().handle().unwrap().close();

    let active = call.advance_to_active().await.unwrap();
    assert_eq!(side.transport.handshakes(), 2);
    assert_eq!(active.connection().phase(), ConnectionPhase::SignalConnected);
}

#[tokio::test(start_paused = true)]
async fn leaving_the_waiting_room_releases_devices_and_connection() {
    let side = Harness::new(mentee());
    let media = Arc::new(FakeMediaBackend::new(Ok(vec![
        MediaDeviceInfo::new("cam-1", "Camera", MediaDeviceKind::VideoInput),
        MediaDeviceInfo::new("mic-1", "Microphone", MediaDeviceKind::AudioInput),
    ])));
    let devices = Arc::new(DeviceController::new(media.clone(), side.services.bus.clone()));
    devices.list_devices().await.unwrap();
    devices.preview_selection(None, None).await.unwrap();

    let mut call = waiting_room(&side, ParticipantRole::Mentee).with_devices(devices.clone());
    call.join_with_selected_devices().await.unwrap();
    let link = side.transport.last_link();

    call.leave().await;
    settle().await;
    assert!(link.is_closed());
    assert_eq!(media.active_previews(), 0);
    assert_eq!(side.services.registry.len().await, 0);
    assert_eq!(
        side.backend.leaves.lock().clone(),
        vec![(SESSION.to_string(), "user".to_string())]
    );

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(side.backend.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn mentor_ends_the_session_for_both() {
    let side = Harness::new(mentor());
    let mut call = waiting_room(&side, ParticipantRole::Mentor);
    call.join(granted_devices()).await.unwrap();
    let link = side.transport.last_link();

    call.end_session().await.unwrap();
    settle().await;
    assert_eq!(side.backend.end_calls.load(Ordering::SeqCst), 1);
    assert!(link.is_closed());
}

#[tokio::test(start_paused = true)]
async fn mentee_cannot_end_the_session() {
    let side = Harness::new(mentee());
    let mut call = waiting_room(&side, ParticipantRole::Mentee);
    call.join(granted_devices()).await.unwrap();
    let link = side.transport.last_link();

    let err = call.end_session().await.unwrap_err();
    assert!(matches!(err, SessionError::SessionNotAuthorized(_)));
    assert_eq!(side.backend.end_calls.load(Ordering::SeqCst), 0);
    // Dropping the refused call still tears the connection down.
    settle().await;
    assert!(link.is_closed());
}
