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

//! Wire encoding of control messages sent over the room's data path.

use mentorcall_session_types::ControlMessage;

use crate::error::SessionError;

pub fn encode(message: &ControlMessage) -> Result<Vec<u8>, SessionError> {
    serde_json::to_vec(message).map_err(|e| SessionError::Control(e.to_string()))
}

pub fn decode(payload: &[u8]) -> Result<ControlMessage, SessionError> {
    serde_json::from_slice(payload).map_err(|e| SessionError::Control(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentorcall_session_types::ControlMessageKind;

    #[test]
    fn decodes_messages_from_other_clients() {
        let payload = br#"{"type":"session_started","sessionKey":"s-7","timestamp":1707004800000}"#;
        let message = decode(payload).unwrap();
        assert!(message.starts_session("s-7"));
        assert!(!message.starts_session("s-8"));
    }

    #[test]
    fn unknown_kinds_decode_but_never_start_a_session() {
        let payload = br#"{"type":"raise_hand","sessionKey":"s-7","timestamp":1}"#;
        let message = decode(payload).unwrap();
        assert_eq!(message.kind, ControlMessageKind::Unknown);
        assert!(!message.starts_session("s-7"));
    }

    #[test]
    fn garbage_is_a_control_error() {
        assert!(matches!(decode(b"\x00\x01"), Err(SessionError::Control(_))));
    }

    #[test]
    fn encoded_message_decodes_to_itself() {
        let message = ControlMessage::session_started("s-1", 42.0);
        assert_eq!(decode(&encode(&message).unwrap()).unwrap(), message);
    }
}
