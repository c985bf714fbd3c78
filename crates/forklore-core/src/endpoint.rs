//! Collaborator abstraction between a node and its host.
//!
//! The node consumes exactly this much of the outside world: a
//! fire-and-forget message send and two lock-state notifications. Group
//! membership is static and supplied separately through
//! [`crate::config::GroupConfig`] at construction.

use forklore_proto::Message;

use crate::config::PeerId;

/// Host-provided effects for one node.
///
/// Implementations own delivery policy entirely: addressing, retry, and
/// backoff live behind [`send`](Endpoint::send), never in the node. The
/// protocol requires reliable, order-preserving delivery per
/// sender-receiver pair; a transport that reorders, drops, or duplicates
/// messages voids the protocol invariants. That requirement is a transport
/// contract; the core contains no compensation for its violation.
pub trait Endpoint {
    /// Deliver one message to `to`.
    ///
    /// Fire-and-forget: the node never observes an outcome.
    fn send(&mut self, to: PeerId, message: Message);

    /// The critical section may run.
    ///
    /// Called exactly once per transition into `Holding`.
    fn notify_locked(&mut self);

    /// The critical section must be considered exited.
    ///
    /// Called exactly once per transition back to `Idle`, before any
    /// release-time grants are sent.
    fn notify_unlocked(&mut self);
}
