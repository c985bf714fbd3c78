//! Fixed-size wire frame.
//!
//! A frame is a constant four bytes: `[magic u16 BE | version u8 | opcode
//! u8]`. With no payload there is nothing variable-length to parse, so
//! decoding is a handful of comparisons and validation cannot be skipped.

use crate::{Message, Opcode, ProtocolError, Result};

/// Magic value identifying a forklore frame (`"FL"`).
pub const MAGIC: u16 = 0x464C;

/// Current wire protocol version.
pub const VERSION: u8 = 1;

/// Wire length of every frame.
pub const FRAME_LEN: usize = 4;

/// Encode a message into its wire frame.
#[must_use]
pub fn encode(message: Message) -> [u8; FRAME_LEN] {
    let magic = MAGIC.to_be_bytes();
    [magic[0], magic[1], VERSION, message.opcode().to_u8()]
}

/// Decode a wire frame into a message.
///
/// The input must be exactly one frame; a transport that batches frames
/// splits them before calling this.
///
/// # Errors
///
/// Returns a [`ProtocolError`] if the input has the wrong length, the wrong
/// magic, an incompatible version, or an opcode outside the closed set.
pub fn decode(bytes: &[u8]) -> Result<Message> {
    if bytes.len() < FRAME_LEN {
        return Err(ProtocolError::Truncated { got: bytes.len(), need: FRAME_LEN });
    }
    if bytes.len() > FRAME_LEN {
        return Err(ProtocolError::TrailingBytes { extra: bytes.len() - FRAME_LEN });
    }

    let magic = u16::from_be_bytes([bytes[0], bytes[1]]);
    if magic != MAGIC {
        return Err(ProtocolError::BadMagic { found: magic });
    }
    if bytes[2] != VERSION {
        return Err(ProtocolError::UnsupportedVersion { found: bytes[2] });
    }

    let opcode =
        Opcode::from_u8(bytes[3]).ok_or(ProtocolError::UnknownOpcode { found: bytes[3] })?;
    Ok(Message::from_opcode(opcode))
}
