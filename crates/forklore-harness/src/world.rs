//! World state for protocol simulation.
//!
//! The World owns every node of one simulated group plus the messages in
//! flight between them, tracks per-node notification journals and frame
//! counters, and provides the oracle helpers the invariant checks are built
//! from.

use std::collections::{BTreeMap, VecDeque};

use forklore_core::config::{GroupConfig, PeerId};
use forklore_core::error::NodeError;
use forklore_core::node::{LockState, Node, NodeAction};
use forklore_proto::Message;

/// Lock-state notification observed from one node, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    /// The node entered the critical section.
    Locked,
    /// The node left the critical section.
    Unlocked,
}

/// All nodes of one simulated group plus the in-flight messages between
/// them.
///
/// Each ordered peer pair has its own FIFO link, which is the transport
/// contract the core assumes: reliable, order-preserving delivery per
/// sender-receiver pair, with no cross-pair ordering. Delivery is explicit
/// (nothing moves until a test asks for it), so every interleaving the
/// contract permits can be produced on purpose.
pub struct World {
    nodes: BTreeMap<PeerId, Node>,
    links: BTreeMap<(PeerId, PeerId), VecDeque<Message>>,
    events: BTreeMap<PeerId, Vec<LockEvent>>,
    frames_sent: BTreeMap<PeerId, usize>,
    frames_received: BTreeMap<PeerId, usize>,
}

impl World {
    /// Create a world of `group_size` nodes, all `Idle`, tokens assigned to
    /// the lower identity of each pair.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidGroup`] for an empty group.
    pub fn new(group_size: u32) -> Result<Self, NodeError> {
        // Validates group_size itself; per-node configs below cannot fail.
        GroupConfig::new(group_size, 1)?;

        let mut nodes = BTreeMap::new();
        let mut events = BTreeMap::new();
        let mut frames_sent = BTreeMap::new();
        let mut frames_received = BTreeMap::new();
        for id in 1..=group_size {
            nodes.insert(id, Node::new(GroupConfig::new(group_size, id)?));
            events.insert(id, Vec::new());
            frames_sent.insert(id, 0);
            frames_received.insert(id, 0);
        }

        Ok(Self { nodes, links: BTreeMap::new(), events, frames_sent, frames_received })
    }

    /// Number of participants.
    #[must_use]
    pub fn group_size(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Node by identity.
    #[must_use]
    pub fn node(&self, id: PeerId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Ask node `id` to enter the critical section.
    ///
    /// # Errors
    ///
    /// [`NodeError::UnknownPeer`] for an identity outside the group;
    /// otherwise whatever the node returns.
    pub fn request_lock(&mut self, id: PeerId) -> Result<(), NodeError> {
        let node = self.nodes.get_mut(&id).ok_or(NodeError::UnknownPeer { peer: id })?;
        let actions = node.request_lock()?;
        self.apply_actions(id, actions);
        Ok(())
    }

    /// Ask node `id` to leave the critical section.
    ///
    /// # Errors
    ///
    /// [`NodeError::UnknownPeer`] for an identity outside the group;
    /// otherwise whatever the node returns.
    pub fn release_lock(&mut self, id: PeerId) -> Result<(), NodeError> {
        let node = self.nodes.get_mut(&id).ok_or(NodeError::UnknownPeer { peer: id })?;
        let actions = node.release_lock()?;
        self.apply_actions(id, actions);
        Ok(())
    }

    /// Deliver the oldest in-flight message on the `from → to` link.
    ///
    /// Returns `Ok(false)` if that link is empty.
    ///
    /// # Errors
    ///
    /// Propagates the receiving node's [`NodeError`]; in a legal run
    /// delivery never fails.
    pub fn deliver_one(&mut self, from: PeerId, to: PeerId) -> Result<bool, NodeError> {
        let Some(message) = self.links.get_mut(&(from, to)).and_then(VecDeque::pop_front) else {
            return Ok(false);
        };

        tracing::trace!(from, to, ?message, "deliver");
        *self.frames_received.entry(to).or_insert(0) += 1;

        let node = self.nodes.get_mut(&to).ok_or(NodeError::UnknownPeer { peer: to })?;
        let actions = node.handle_message(from, message)?;
        self.apply_actions(to, actions);
        Ok(true)
    }

    /// Deliver every in-flight message, oldest first per link, links in
    /// ascending order, until the world is quiescent.
    ///
    /// Returns the number of messages delivered.
    ///
    /// # Errors
    ///
    /// Propagates the first delivery failure.
    pub fn deliver_all(&mut self) -> Result<usize, NodeError> {
        let mut delivered = 0;
        while let Some((from, to)) = self.busy_links().first().copied() {
            self.deliver_one(from, to)?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Ordered pairs with at least one message in flight, ascending.
    #[must_use]
    pub fn busy_links(&self) -> Vec<(PeerId, PeerId)> {
        self.links
            .iter()
            .filter(|&(_, queue)| !queue.is_empty())
            .map(|(&link, _)| link)
            .collect()
    }

    /// Total number of messages in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.links.values().map(VecDeque::len).sum()
    }

    /// Messages in flight on the `from → to` link.
    #[must_use]
    pub fn in_flight_between(&self, from: PeerId, to: PeerId) -> usize {
        self.links.get(&(from, to)).map_or(0, VecDeque::len)
    }

    /// Identities currently in `Holding`, ascending.
    ///
    /// Mutual exclusion means this never has more than one element.
    #[must_use]
    pub fn holders(&self) -> Vec<PeerId> {
        self.nodes
            .iter()
            .filter(|&(_, node)| node.lock_state() == LockState::Holding)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Lock-state notifications observed from `id`, in order.
    #[must_use]
    pub fn lock_events(&self, id: PeerId) -> &[LockEvent] {
        self.events.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Frames sent by `id`.
    #[must_use]
    pub fn frames_sent(&self, id: PeerId) -> usize {
        self.frames_sent.get(&id).copied().unwrap_or(0)
    }

    /// Frames received by `id`.
    #[must_use]
    pub fn frames_received(&self, id: PeerId) -> usize {
        self.frames_received.get(&id).copied().unwrap_or(0)
    }

    /// Check the token conservation law over the whole group.
    ///
    /// For every unordered pair, the two table entries plus the Grants in
    /// flight between the pair must account for exactly one token. The
    /// strict "exactly one table entry true" form of the invariant holds at
    /// quiescence, where no Grant is on the wire.
    #[must_use]
    pub fn token_conservation_ok(&self) -> bool {
        let ids: Vec<PeerId> = self.nodes.keys().copied().collect();
        for (index, &a) in ids.iter().enumerate() {
            for &b in &ids[index + 1..] {
                let held = usize::from(self.holds(a, b)) + usize::from(self.holds(b, a));
                let in_flight = self.grants_between(a, b);
                if held + in_flight != 1 {
                    return false;
                }
            }
        }
        true
    }

    fn holds(&self, owner: PeerId, peer: PeerId) -> bool {
        self.nodes.get(&owner).is_some_and(|node| node.holds_token(peer))
    }

    fn grants_between(&self, a: PeerId, b: PeerId) -> usize {
        let count = |from, to| {
            self.links
                .get(&(from, to))
                .map_or(0, |queue| queue.iter().filter(|&&m| m == Message::Grant).count())
        };
        count(a, b) + count(b, a)
    }

    fn apply_actions(&mut self, id: PeerId, actions: Vec<NodeAction>) {
        for action in actions {
            match action {
                NodeAction::Send { to, message } => {
                    *self.frames_sent.entry(id).or_insert(0) += 1;
                    self.links.entry((id, to)).or_default().push_back(message);
                },
                NodeAction::Locked => {
                    if let Some(journal) = self.events.get_mut(&id) {
                        journal.push(LockEvent::Locked);
                    }
                },
                NodeAction::Unlocked => {
                    if let Some(journal) = self.events.get_mut(&id) {
                        journal.push(LockEvent::Unlocked);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_is_quiescent_and_conserves_tokens() {
        let world = World::new(3).unwrap();
        assert_eq!(world.group_size(), 3);
        assert_eq!(world.in_flight(), 0);
        assert!(world.holders().is_empty());
        assert!(world.token_conservation_ok());
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(World::new(0).is_err());
    }

    #[test]
    fn deliver_on_an_empty_link_is_a_no_op() {
        let mut world = World::new(2).unwrap();
        assert!(!world.deliver_one(1, 2).unwrap());
        assert_eq!(world.frames_received(2), 0);
    }

    #[test]
    fn request_puts_messages_in_flight_and_counts_frames() {
        let mut world = World::new(3).unwrap();
        world.request_lock(3).unwrap();

        assert_eq!(world.in_flight(), 2);
        assert_eq!(world.in_flight_between(3, 1), 1);
        assert_eq!(world.in_flight_between(3, 2), 1);
        assert_eq!(world.frames_sent(3), 2);
        assert!(world.token_conservation_ok());
    }

    #[test]
    fn conservation_counts_grants_on_the_wire() {
        let mut world = World::new(2).unwrap();
        world.request_lock(2).unwrap();
        world.deliver_one(2, 1).unwrap();

        // The token left node 1 but has not reached node 2: it is the
        // in-flight Grant.
        assert!(!world.node(1).unwrap().holds_token(2));
        assert!(!world.node(2).unwrap().holds_token(1));
        assert_eq!(world.in_flight_between(1, 2), 1);
        assert!(world.token_conservation_ok());
    }

    #[test]
    fn deliver_all_runs_a_handoff_to_quiescence() {
        let mut world = World::new(2).unwrap();
        world.request_lock(2).unwrap();

        let delivered = world.deliver_all().unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(world.in_flight(), 0);
        assert_eq!(world.holders(), vec![2]);
        assert_eq!(world.lock_events(2), [LockEvent::Locked]);
    }

    #[test]
    fn operations_on_unknown_identities_are_rejected() {
        let mut world = World::new(2).unwrap();
        assert!(world.request_lock(3).is_err());
        assert!(world.release_lock(0).is_err());
    }
}
