//! Deterministic simulation harness for forklore protocol testing.
//!
//! In-memory group simulation for deterministic, reproducible testing of the
//! mutex protocol under arbitrary message interleavings. The harness models
//! exactly the transport contract the core assumes (reliable,
//! order-preserving delivery per sender-receiver pair) as one FIFO queue per
//! ordered pair, and nothing more.

#![forbid(unsafe_code)]

pub mod scenario;
pub mod sched;
pub mod world;

pub use scenario::Scenario;
pub use sched::Interleaver;
pub use world::{LockEvent, World};
