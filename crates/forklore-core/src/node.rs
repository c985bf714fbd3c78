//! Mutex node state machine.
//!
//! The per-process core of the protocol: on every inbound message and every
//! local lock/unlock request it decides whether the pairwise token shared
//! with each peer is granted, withheld, or deferred, and whether this
//! process may enter the critical section.
//!
//! # Architecture: Action-Based State Machine
//!
//! This state machine follows the action pattern:
//! - Methods return `Result<Vec<NodeAction>, NodeError>`
//! - Driver code executes actions (send messages, surface notifications)
//!
//! This enables:
//! - Pure state machine logic (no I/O)
//! - Deterministic replay of any message interleaving in tests
//! - One node implementation for production runtime and simulation
//!
//! # State Machine
//!
//! ```text
//!            request, tokens missing
//! ┌──────┐ ─────────────────────────> ┌────────────────┐
//! │ Idle │                            │ AwaitingTokens │
//! └──────┘ <──┐                       └────────────────┘
//!    │        │ release                       │
//!    │        │                   last Grant arrives
//!    │        │                               ↓
//!    │        │                         ┌─────────┐
//!    │        └─────────────────────────│ Holding │
//!    └────────────────────────────────> └─────────┘
//!      request, all tokens present
//! ```
//!
//! # Deadlock Avoidance
//!
//! Two rules keep the wait graph acyclic: the token for each pair starts
//! with the lower identity, and a node never surrenders a token while it
//! wants or holds the critical section. A Request that cannot be honored is
//! recorded and answered at the next release, so no Grant is ever lost and
//! every waiter makes progress once the current holder finishes.

use forklore_proto::Message;
use serde::{Deserialize, Serialize};

use crate::config::{GroupConfig, PeerId};
use crate::error::NodeError;
use crate::table::{DeferredSet, TokenTable};

/// Actions returned by the node state machine.
///
/// The driver (production runtime or test harness) executes these actions:
/// - `Send`: hand one message to the transport
/// - `Locked` / `Unlocked`: surface the lock-state notification to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    /// Send `message` to peer `to`.
    Send {
        /// Destination peer.
        to: PeerId,
        /// Message to deliver.
        message: Message,
    },

    /// The critical section may now run. Emitted exactly once per
    /// acquisition.
    Locked,

    /// The critical section is closed. Emitted exactly once per release,
    /// ordered before any release-time grants.
    Unlocked,
}

/// Lock state of the local node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    /// Rest state: the section is neither wanted nor held.
    Idle,
    /// A lock request is outstanding and at least one token is missing.
    AwaitingTokens,
    /// Every token is present and the critical section is entered.
    Holding,
}

/// Per-process protocol state machine for one mutex node.
///
/// Owns the token table, the deferred-request set, and the lock state. All
/// entry points run synchronously to completion and are non-reentrant; a
/// host running nodes in parallel must serialize calls into each node.
#[derive(Debug, Clone)]
pub struct Node {
    config: GroupConfig,
    tokens: TokenTable,
    deferred: DeferredSet,
    lock_state: LockState,
}

impl Node {
    /// Create a node in `Idle` with the initial token assignment (the lower
    /// identity of each pair holds).
    #[must_use]
    pub fn new(config: GroupConfig) -> Self {
        Self {
            tokens: TokenTable::new(&config),
            deferred: DeferredSet::default(),
            lock_state: LockState::Idle,
            config,
        }
    }

    /// Static group description.
    #[must_use]
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Current lock state.
    #[must_use]
    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    /// Whether the token shared with `peer` is held locally.
    #[must_use]
    pub fn holds_token(&self, peer: PeerId) -> bool {
        self.tokens.holds(peer)
    }

    /// Number of peer tokens currently held.
    #[must_use]
    pub fn held_tokens(&self) -> usize {
        self.tokens.held_count()
    }

    /// Whether `peer` has a deferred request pending here.
    #[must_use]
    pub fn is_deferred(&self, peer: PeerId) -> bool {
        self.deferred.contains(peer)
    }

    /// Whether no deferred requests are pending.
    #[must_use]
    pub fn deferred_is_empty(&self) -> bool {
        self.deferred.is_empty()
    }

    /// Ask to enter the critical section.
    ///
    /// Emits one `Request` per missing token and moves to `AwaitingTokens`.
    /// If no token is missing the node enters `Holding` directly and emits
    /// `Locked`, the only case in which this call produces a notification.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidState`] unless the node is `Idle`. The
    /// state is unchanged on rejection.
    pub fn request_lock(&mut self) -> Result<Vec<NodeAction>, NodeError> {
        if self.lock_state != LockState::Idle {
            return Err(NodeError::InvalidState {
                state: self.lock_state,
                operation: "request_lock",
            });
        }

        let missing: Vec<PeerId> = self.tokens.missing().collect();
        if missing.is_empty() {
            self.lock_state = LockState::Holding;
            return Ok(vec![NodeAction::Locked]);
        }

        self.lock_state = LockState::AwaitingTokens;
        Ok(missing
            .into_iter()
            .map(|to| NodeAction::Send { to, message: Message::Request })
            .collect())
    }

    /// Leave the critical section.
    ///
    /// Emits `Unlocked` first, so the section is observed as closed before
    /// any token starts moving, then honors every deferred request, clearing
    /// each flag as its Grant goes out.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidState`] unless the node is `Holding`. The
    /// state is unchanged on rejection.
    pub fn release_lock(&mut self) -> Result<Vec<NodeAction>, NodeError> {
        if self.lock_state != LockState::Holding {
            return Err(NodeError::InvalidState {
                state: self.lock_state,
                operation: "release_lock",
            });
        }

        self.lock_state = LockState::Idle;

        let mut actions = vec![NodeAction::Unlocked];
        for peer in self.deferred.drain() {
            match self.try_yield_token(peer) {
                Some(action) => actions.push(action),
                // Cannot fail while Idle; keep the flag if it ever does.
                None => self.deferred.insert(peer),
            }
        }
        Ok(actions)
    }

    /// Process one inbound protocol message from `from`.
    ///
    /// A `Request` either yields the shared token (answering with `Grant`)
    /// or records a deferred request to be honored at the next release. A
    /// `Grant` marks the shared token held; when it is the last missing one
    /// the node enters `Holding` and emits `Locked`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::UnknownPeer`] if `from` is outside the peer set.
    /// Returns [`NodeError::UnexpectedGrant`] for a Grant while not
    /// `AwaitingTokens` and [`NodeError::GrantForHeldToken`] for a Grant on
    /// a token already held; both mean the "exactly one holder per token"
    /// invariant was broken upstream and the host must stop driving this
    /// node. The state is unchanged on every error path.
    pub fn handle_message(
        &mut self,
        from: PeerId,
        message: Message,
    ) -> Result<Vec<NodeAction>, NodeError> {
        if !self.config.is_peer(from) {
            return Err(NodeError::UnknownPeer { peer: from });
        }

        match message {
            Message::Request => match self.try_yield_token(from) {
                Some(action) => Ok(vec![action]),
                None => {
                    self.deferred.insert(from);
                    Ok(Vec::new())
                },
            },
            Message::Grant => {
                if self.lock_state != LockState::AwaitingTokens {
                    return Err(NodeError::UnexpectedGrant { from });
                }
                if self.tokens.holds(from) {
                    return Err(NodeError::GrantForHeldToken { from });
                }

                self.tokens.set_held(from, true);
                if self.tokens.all_held() {
                    self.lock_state = LockState::Holding;
                    Ok(vec![NodeAction::Locked])
                } else {
                    Ok(Vec::new())
                }
            },
        }
    }

    /// Token-release procedure for one peer.
    ///
    /// Gives up the token shared with `peer` and answers with a `Grant`.
    /// Fails (`None`) only when the token is held and this node wants or
    /// holds the section: a node never surrenders a token it needs. A
    /// `Grant` still goes out when the token was already absent; the re-send
    /// is idempotent and shields against a transport that duplicates
    /// Requests.
    fn try_yield_token(&mut self, peer: PeerId) -> Option<NodeAction> {
        if self.tokens.holds(peer) {
            if self.lock_state != LockState::Idle {
                return None;
            }
            self.tokens.set_held(peer, false);
        }
        Some(NodeAction::Send { to: peer, message: Message::Grant })
    }
}
