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

//! Room connection lifecycle: phases, the per-view state machine, the shared
//! handle and the registry that lets a later view adopt it.

mod connection_manager;
mod participants;
mod registry;
mod room_handle;
mod state;

pub use connection_manager::{
    ConnectOutcome, ConnectionAttempt, ConnectionManager, SessionServices,
};
pub use participants::{ParticipantSet, Readiness};
pub use registry::{AttemptClaim, ConnectionRegistry, RegistryClaim};
pub use room_handle::{HandleEvent, LocalMediaState, RoomConnectionHandle, WeakRoomConnectionHandle};
pub use state::{transition, ConnectionPhase, InvalidTransition, PhaseCell, PhaseEvent};
