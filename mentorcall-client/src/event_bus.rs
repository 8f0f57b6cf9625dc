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

//! Event bus for framework-agnostic client events.
//!
//! A MPMC (multi-producer, multi-consumer) broadcast channel for
//! [`ClientEvent`]s. Any component holding the bus can emit; any number of
//! subscribers each receive every event emitted after they subscribed.
//!
//! The bus is an ordinary value: one per client (or per test), cloned into
//! every component that emits.
//!
//! # Example
//!
//! ```ignore
//! use mentorcall_client::{ClientEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         if let ClientEvent::ReadinessChanged(readiness) = event {
//!             println!("{readiness}");
//!         }
//!     }
//! });
//! ```

use crate::events::ClientEvent;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};

/// Capacity of the event bus channel
pub const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: Sender<ClientEvent>,
    // Keeps the channel open while nobody is subscribed.
    _keepalive: InactiveReceiver<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (mut sender, receiver) = broadcast(capacity);
        // Drop the oldest event instead of blocking emitters.
        sender.set_overflow(true);
        sender.set_await_active(false);
        Self {
            sender,
            _keepalive: receiver.deactivate(),
        }
    }

    /// Subscribe to client events.
    ///
    /// Returns a receiver that will receive all future client events.
    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        self.sender.new_receiver()
    }

    /// Emit a client event to all subscribers.
    ///
    /// This is a non-blocking operation. If the channel is full, the oldest
    /// message will be dropped to make room (overflow behavior).
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.sender.try_broadcast(event);
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
