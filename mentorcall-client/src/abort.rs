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

//! Abort tokens for connection attempts.
//!
//! Every `connect()` issues a fresh [`AbortToken`] from the view's
//! [`AbortController`], superseding the previous one. A token is compared by
//! generation, not by a shared boolean, so a late callback from attempt N can
//! never pass the check once attempt N+1 exists, even after rapid re-entrant
//! `connect()` calls.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;

#[derive(Debug, Clone, Default)]
pub struct AbortController {
    generation: Arc<AtomicU64>,
    current: Arc<Mutex<CancellationToken>>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a new attempt, aborting every token issued before it.
    pub fn issue(&self) -> AbortToken {
        let mut current = self.current.lock();
        current.cancel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *current = cancel.clone();
        AbortToken {
            generation,
            latest: self.generation.clone(),
            cancel,
        }
    }

    /// Abort every outstanding token without issuing a new one.
    pub fn abort_all(&self) {
        let current = self.current.lock();
        current.cancel();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct AbortToken {
    generation: u64,
    latest: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl AbortToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while no newer attempt has been started and nothing aborted this one.
    pub fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && self.latest.load(Ordering::SeqCst) == self.generation
    }

    /// `Err(SessionError::Aborted)` once superseded.
    pub fn check(&self) -> Result<(), SessionError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(SessionError::Aborted)
        }
    }

    /// Resolves as soon as this token is aborted or superseded.
    pub async fn aborted(&self) {
        self.cancel.cancelled().await
    }
}
