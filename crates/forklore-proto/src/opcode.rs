//! Message kind identifiers.

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Wire identifier for each protocol message kind.
///
/// The set is closed: the token-passing protocol exchanges exactly these two
/// kinds, and a frame carries nothing beyond the kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Opcode {
    /// Ask the receiver to relinquish the token shared with the sender.
    Request = 0x01,
    /// Inform the receiver it now owns the token shared with the sender.
    Grant = 0x02,
}

impl Opcode {
    /// Numeric wire value of this opcode.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire value, returning `None` for bytes outside the closed set.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Request),
            0x02 => Some(Self::Grant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_values_are_stable() {
        // Wire values are a compatibility contract.
        assert_eq!(Opcode::Request.to_u8(), 0x01);
        assert_eq!(Opcode::Grant.to_u8(), 0x02);
    }

    #[test]
    fn from_u8_rejects_unknown_values() {
        assert_eq!(Opcode::from_u8(0x00), None);
        assert_eq!(Opcode::from_u8(0x03), None);
        assert_eq!(Opcode::from_u8(0xff), None);
    }

    #[test]
    fn from_u8_inverts_to_u8() {
        for opcode in [Opcode::Request, Opcode::Grant] {
            assert_eq!(Opcode::from_u8(opcode.to_u8()), Some(opcode));
        }
    }
}
