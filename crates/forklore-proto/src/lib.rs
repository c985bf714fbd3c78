//! Wire format for the forklore token-passing protocol.
//!
//! The protocol has exactly two message kinds and no payload beyond the kind
//! tag, so a frame is a constant four bytes: magic, version, opcode. Sender
//! and receiver identity are the transport's concern and never appear on the
//! wire.
//!
//! All wire types are serde-enabled so hosts can embed them in their own
//! envelopes (journals, CBOR transports) without re-deriving anything.
#![forbid(unsafe_code)]

pub mod errors;
pub mod frame;
pub mod message;
pub mod opcode;

pub use errors::{ProtocolError, Result};
pub use message::Message;
pub use opcode::Opcode;
