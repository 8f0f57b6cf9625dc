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

//! Platform primitives for the client.
//!
//! - **`now_ms()`**: current time in milliseconds since the Unix epoch
//! - **`spawn(future)`**: spawn an async task on the tokio runtime
//! - **`IntervalHandle`** / **`TimerSet`**: repeating timers that are
//!   cancelled synchronously when dropped or cleared
//!
//! A tokio runtime must be active whenever a task or timer is created.

mod timers;

pub use timers::{IntervalHandle, TimerSet};

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

/// Returns the current time in milliseconds since the Unix epoch.
pub fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as f64
}

/// Spawn an async task on the tokio runtime.
pub fn spawn<F: Future<Output = ()> + Send + 'static>(future: F) -> JoinHandle<()> {
    tokio::spawn(future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_now_ms_returns_reasonable_value() {
        let ms = now_ms();
        // Should be well past year 2020 (1577836800000 ms)
        assert!(ms > 1_577_836_800_000.0, "now_ms() returned {ms}");
        // Should be before year 2100
        assert!(ms < 4_102_444_800_000.0, "now_ms() returned {ms}");
    }

    #[tokio::test]
    async fn test_spawn_executes_future() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = flag.clone();

        spawn(async move {
            flag_clone.store(true, Ordering::Relaxed);
        })
        .await
        .unwrap();

        assert!(flag.load(Ordering::Relaxed), "spawned future should have run");
    }
}
