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
 */

//! Shared API types for the mentorcall session backend.
//!
//! This crate defines the contract between the session backend and the
//! real-time client: persisted session status, join credentials, and the
//! ephemeral control message relayed over an open room.
//! It is intentionally framework-agnostic: no HTTP client, no async runtime.

pub mod control;
pub mod error;
pub mod requests;
pub mod responses;
pub mod status;

pub use control::{ControlMessage, ControlMessageKind};
pub use error::APIError;
pub use responses::APIResponse;
pub use status::{ParticipantRole, SessionStatus};
