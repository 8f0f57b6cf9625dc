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

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Which producer moved the view to the active call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvanceReason {
    /// A `session_started` control message arrived on the data path.
    ControlMessage,
    /// The status poll saw the session become active.
    StatusPoll,
    /// This participant started the session itself.
    Initiated,
}

/// One-shot "already navigated" guard shared by every producer.
///
/// The first [`try_advance`](Self::try_advance) wins; later calls are no-ops.
#[derive(Debug, Clone)]
pub struct AdvanceGate {
    fired: Arc<AtomicBool>,
    reason: Arc<watch::Sender<Option<AdvanceReason>>>,
}

impl AdvanceGate {
    pub fn new() -> Self {
        let (reason, _) = watch::channel(None);
        Self {
            fired: Arc::new(AtomicBool::new(false)),
            reason: Arc::new(reason),
        }
    }

    /// Returns true only for the call that fired the gate.
    pub fn try_advance(&self, reason: AdvanceReason) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        info!("Advancing to the active call via {reason:?}");
        self.reason.send_replace(Some(reason));
        true
    }

    pub fn is_advanced(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<AdvanceReason> {
        *self.reason.borrow()
    }

    /// Resolves with the winning reason once the gate fired.
    pub async fn wait(&self) -> AdvanceReason {
        let mut rx = self.reason.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // The sender lives as long as `self`.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for AdvanceGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_producer_wins() {
        let gate = AdvanceGate::new();
        assert!(gate.try_advance(AdvanceReason::StatusPoll));
        assert!(!gate.try_advance(AdvanceReason::ControlMessage));
        assert_eq!(gate.reason(), Some(AdvanceReason::StatusPoll));
    }

    #[tokio::test]
    async fn wait_resolves_after_advance() {
        let gate = AdvanceGate::new();
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait().await }
        });
        tokio::task::yield_now().await;
        gate.try_advance(AdvanceReason::ControlMessage);
        assert_eq!(waiter.await.unwrap(), AdvanceReason::ControlMessage);
        assert_eq!(gate.wait().await, AdvanceReason::ControlMessage);
    }
}
