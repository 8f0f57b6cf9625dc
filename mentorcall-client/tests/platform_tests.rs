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

//! Tests for the platform timers and the connection phase table.

use mentorcall_client::{now_ms, transition, ConnectionPhase, IntervalHandle, PhaseEvent, TimerSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_now_ms_is_in_milliseconds() {
    let ms = now_ms();
    assert!(ms > 1_000_000_000_000.0, "Expected milliseconds, got {ms}");
}

#[tokio::test(start_paused = true)]
async fn test_interval_handle_drop_cancels() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    {
        let _handle = IntervalHandle::new(Duration::from_millis(5), move || {
            counter_clone.fetch_add(1, Ordering::Relaxed);
        });
        tokio::time::sleep(Duration::from_millis(22)).await;
    }
    let count_at_drop = counter.load(Ordering::Relaxed);
    assert_eq!(count_at_drop, 4);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(counter.load(Ordering::Relaxed), count_at_drop);
}

#[tokio::test(start_paused = true)]
async fn test_timer_set_reports_what_it_cancelled() {
    let mut timers = TimerSet::new();
    timers.push("participant-refresh", IntervalHandle::new(Duration::from_secs(2), || {}));
    timers.push("status-poll", IntervalHandle::new(Duration::from_secs(1), || {}));
    assert_eq!(timers.names(), vec!["participant-refresh", "status-poll"]);

    assert_eq!(timers.clear(), 2);
    assert!(timers.is_empty());
    assert_eq!(timers.clear(), 0);
}

#[test]
fn test_full_connection_lifecycle_through_the_table() {
    use ConnectionPhase::*;
    let steps = [
        (PhaseEvent::ConnectRequested, Connecting),
        (PhaseEvent::SignalEstablished, SignalConnected),
        (PhaseEvent::PeerEstablished, PeerConnected),
        (PhaseEvent::TransportInterrupted, Reconnecting),
        (PhaseEvent::TransportRestored { peer: true }, PeerConnected),
        (PhaseEvent::DisconnectRequested, Disconnected),
        (PhaseEvent::ConnectRequested, Connecting),
    ];
    let mut phase = Idle;
    for (event, expected) in steps {
        phase = transition(phase, event).unwrap();
        assert_eq!(phase, expected);
    }
}

#[test]
fn test_rejected_transitions_name_the_pair() {
    let err = transition(ConnectionPhase::Idle, PhaseEvent::PeerEstablished).unwrap_err();
    assert_eq!(err.from, ConnectionPhase::Idle);
    assert!(err.to_string().contains("idle"));
}
