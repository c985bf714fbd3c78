//! Error types for wire-format parsing.

use thiserror::Error;

/// Errors produced while decoding a protocol frame.
///
/// Encoding is infallible; every variant here describes malformed inbound
/// bytes. All variants are terminal for the frame in question; there is no
/// partial decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Frame was shorter than the fixed wire length.
    #[error("truncated frame: got {got} bytes, need {need}")]
    Truncated {
        /// Number of bytes received.
        got: usize,
        /// Number of bytes a frame requires.
        need: usize,
    },

    /// Frame carried bytes beyond the fixed wire length.
    #[error("frame has {extra} trailing bytes")]
    TrailingBytes {
        /// Number of excess bytes.
        extra: usize,
    },

    /// Frame did not start with the protocol magic.
    #[error("bad magic: {found:#06x}")]
    BadMagic {
        /// The two magic bytes that were found.
        found: u16,
    },

    /// Frame was produced by an incompatible protocol version.
    #[error("unsupported protocol version {found}")]
    UnsupportedVersion {
        /// The version byte that was found.
        found: u8,
    },

    /// Frame carried an opcode outside the closed message-kind set.
    #[error("unknown opcode {found:#04x}")]
    UnknownOpcode {
        /// The opcode byte that was found.
        found: u8,
    },
}

/// Convenience alias for fallible wire-format operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
