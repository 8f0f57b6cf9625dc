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

use log::debug;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A repeating timer that fires a callback at a fixed interval.
///
/// The timer runs as a tokio task. Dropping the handle (or calling
/// [`cancel`](Self::cancel)) sets a quit flag that every tick checks before
/// invoking the callback, then aborts the task, so no tick fires after the
/// handle is gone.
pub struct IntervalHandle {
    quit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IntervalHandle {
    /// Create a repeating timer. The first tick fires one `period` from now.
    pub fn new<F: Fn() + Send + 'static>(period: Duration, callback: F) -> Self {
        Self::new_async(period, move || {
            callback();
            std::future::ready(())
        })
    }

    /// Create a repeating timer whose tick is asynchronous.
    ///
    /// Ticks never overlap: a slow tick delays the next one instead of
    /// queueing a burst.
    pub fn new_async<F, Fut>(period: Duration, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let quit = Arc::new(AtomicBool::new(false));
        let quit_clone = quit.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it.
            interval.tick().await;

            loop {
                interval.tick().await;
                if quit_clone.load(Ordering::Acquire) {
                    break;
                }
                callback().await;
            }
        });

        Self {
            quit,
            handle: Some(handle),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.quit.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for IntervalHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for IntervalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Every periodic timer owned by one view or connection attempt.
///
/// Clearing the set cancels all of its timers before returning.
#[derive(Debug, Default)]
pub struct TimerSet {
    timers: Vec<(&'static str, IntervalHandle)>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, timer: IntervalHandle) {
        self.timers.push((name, timer));
    }

    /// Cancel every timer, returning how many were running.
    pub fn clear(&mut self) -> usize {
        let count = self.timers.len();
        for (name, timer) in self.timers.drain(..) {
            debug!("Cancelling timer '{name}'");
            timer.cancel();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.timers.iter().map(|(name, _)| *name).collect()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.clear();
    }
}
