//! Protocol messages.

use serde::{Deserialize, Serialize};

use crate::Opcode;

/// A protocol message exchanged between two peers sharing a token.
///
/// # Protocol Flow
///
/// For each unordered pair of peers there is one token; holding every
/// peer-token is the precondition for entering the critical section.
/// 1. A peer missing the token sends `Request` to the current holder.
/// 2. The holder answers with `Grant` immediately if it neither holds nor
///    wants the critical section, otherwise it defers the request and sends
///    the `Grant` when it releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Message {
    /// Ask the receiver to relinquish the shared token.
    Request,
    /// Inform the receiver it now owns the shared token.
    Grant,
}

impl Message {
    /// Wire opcode for this message.
    #[must_use]
    pub fn opcode(self) -> Opcode {
        match self {
            Self::Request => Opcode::Request,
            Self::Grant => Opcode::Grant,
        }
    }

    /// Message corresponding to a wire opcode.
    #[must_use]
    pub fn from_opcode(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Request => Self::Request,
            Opcode::Grant => Self::Grant,
        }
    }
}

impl From<Opcode> for Message {
    fn from(opcode: Opcode) -> Self {
        Self::from_opcode(opcode)
    }
}

impl From<Message> for Opcode {
    fn from(message: Message) -> Self {
        message.opcode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serde() {
        let cbor = ciborium::ser::into_writer(&Message::Request, Vec::new());
        assert!(cbor.is_ok());
    }

    #[test]
    fn opcode_mapping_is_bijective() {
        for message in [Message::Request, Message::Grant] {
            assert_eq!(Message::from_opcode(message.opcode()), message);
        }
    }
}
