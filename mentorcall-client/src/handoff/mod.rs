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

//! Waiting room → active call handoff.

mod detector;
mod gate;
mod status_watch;

pub use detector::HandoffDetector;
pub use gate::{AdvanceGate, AdvanceReason};
pub use status_watch::{PollVerdict, StatusWatch};
