//! Node error types.

use thiserror::Error;

use crate::config::PeerId;
use crate::node::LockState;

/// Errors returned by the node state machine.
///
/// Variants divide into caller-contract violations (a local operation
/// invoked in the wrong state, an ill-formed group) and
/// protocol-consistency violations (an inbound message the protocol cannot
/// legally produce). The node never mutates state on the error path, so a
/// contract violation is observable and recoverable by the caller; a
/// consistency violation means the distributed "exactly one holder per
/// token" invariant is already broken and the node must be abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Group description was ill-formed at construction.
    #[error("invalid group: size {group_size}, self id {self_id}")]
    InvalidGroup {
        /// Requested group size.
        group_size: u32,
        /// Requested identity for this node.
        self_id: PeerId,
    },

    /// A local operation was invoked in a state that forbids it.
    #[error("operation `{operation}` is invalid in state {state:?}")]
    InvalidState {
        /// Lock state at the time of the call.
        state: LockState,
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// An inbound message named a sender outside the peer set.
    #[error("peer {peer} is not a member of this group")]
    UnknownPeer {
        /// The offending identity.
        peer: PeerId,
    },

    /// A Grant arrived while no lock request was outstanding.
    ///
    /// Requests are only in flight while `AwaitingTokens`, so a Grant in any
    /// other state means a protocol bug or a transport that reordered or
    /// duplicated messages.
    #[error("unsolicited grant from peer {from}")]
    UnexpectedGrant {
        /// Sender of the grant.
        from: PeerId,
    },

    /// A Grant arrived for a token already marked held.
    ///
    /// Both sides of the pair believed they owned the token; the invariant
    /// was broken before this message was ever seen.
    #[error("grant from peer {from} for a token already held")]
    GrantForHeldToken {
        /// Sender of the grant.
        from: PeerId,
    },
}

impl NodeError {
    /// Whether this error signals a broken distributed invariant.
    ///
    /// Fatal errors have no sensible local continuation: the host must stop
    /// driving the node. Non-fatal errors are deterministic rejections of a
    /// caller mistake and leave the node fully usable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownPeer { .. } | Self::UnexpectedGrant { .. } | Self::GrantForHeldToken { .. }
        )
    }
}
