//! Token table and deferred-request bookkeeping.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{GroupConfig, PeerId};

/// Which pairwise tokens this node currently holds.
///
/// One boolean per peer identity, self excluded. The token for pair
/// `{i, j}` with `i < j` starts with `i`: this total order over the initial
/// ownership is what keeps the wait graph acyclic, and it is fixed at
/// construction, never re-derived at runtime.
///
/// The table is one side of a distributed invariant: for every pair, exactly
/// one of the two processes' entries for the other is true at any logical
/// instant. The protocol as a whole enforces it; it is not locally
/// checkable.
#[derive(Debug, Clone)]
pub struct TokenTable {
    held: BTreeMap<PeerId, bool>,
}

impl TokenTable {
    /// Initial table for `config`: the lower identity of each pair holds.
    pub(crate) fn new(config: &GroupConfig) -> Self {
        let self_id = config.self_id();
        let held = config.peers().map(|peer| (peer, self_id < peer)).collect();
        Self { held }
    }

    /// Whether the token shared with `peer` is held locally.
    ///
    /// Identities outside the peer set report `false`.
    #[must_use]
    pub fn holds(&self, peer: PeerId) -> bool {
        self.held.get(&peer).copied().unwrap_or(false)
    }

    /// Whether every peer token is present.
    #[must_use]
    pub fn all_held(&self) -> bool {
        self.held.values().all(|&held| held)
    }

    /// Number of tokens currently held.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.values().filter(|&&held| held).count()
    }

    /// Peers whose token is missing, ascending.
    pub fn missing(&self) -> impl Iterator<Item = PeerId> {
        self.held.iter().filter(|&(_, &held)| !held).map(|(&peer, _)| peer)
    }

    pub(crate) fn set_held(&mut self, peer: PeerId, held: bool) {
        debug_assert!(self.held.contains_key(&peer), "peer {peer} outside the token table");
        if let Some(entry) = self.held.get_mut(&peer) {
            *entry = held;
        }
    }
}

/// Peers whose Request could not be honored immediately.
///
/// One flag per peer, set when a Request arrives while this node needs or
/// holds the critical section, and cleared entry by entry as the
/// corresponding Grants go out at release time.
#[derive(Debug, Clone, Default)]
pub struct DeferredSet {
    peers: BTreeSet<PeerId>,
}

impl DeferredSet {
    /// Whether `peer` has a deferred request pending.
    #[must_use]
    pub fn contains(&self, peer: PeerId) -> bool {
        self.peers.contains(&peer)
    }

    /// Whether no deferred requests are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub(crate) fn insert(&mut self, peer: PeerId) {
        self.peers.insert(peer);
    }

    /// Take every pending peer, ascending, leaving the set empty.
    pub(crate) fn drain(&mut self) -> Vec<PeerId> {
        std::mem::take(&mut self.peers).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn table_for(group_size: u32, self_id: PeerId) -> TokenTable {
        let config = GroupConfig::new(group_size, self_id).unwrap();
        TokenTable::new(&config)
    }

    #[test]
    fn lowest_identity_starts_with_every_token() {
        let table = table_for(4, 1);
        assert!(table.all_held());
        assert_eq!(table.held_count(), 3);
        assert_eq!(table.missing().count(), 0);
    }

    #[test]
    fn highest_identity_starts_with_no_token() {
        let table = table_for(4, 4);
        assert!(!table.all_held());
        assert_eq!(table.held_count(), 0);
        assert_eq!(table.missing().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn middle_identity_holds_towards_higher_peers() {
        let table = table_for(3, 2);
        assert!(!table.holds(1));
        assert!(table.holds(3));
        assert_eq!(table.missing().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn holds_is_false_outside_the_peer_set() {
        let table = table_for(3, 2);
        assert!(!table.holds(2));
        assert!(!table.holds(9));
    }

    #[test]
    fn deferred_set_drains_in_ascending_order() {
        let mut deferred = DeferredSet::default();
        deferred.insert(3);
        deferred.insert(1);
        deferred.insert(3);

        assert!(deferred.contains(1));
        assert!(!deferred.contains(2));
        assert_eq!(deferred.drain(), vec![1, 3]);
        assert!(deferred.is_empty());
    }

    proptest! {
        /// The initial assignment is a total order: for every pair, exactly
        /// one side starts as the holder.
        #[test]
        fn initial_ownership_is_exclusive(group_size in 2..16u32, a in 1..16u32, b in 1..16u32) {
            prop_assume!(a <= group_size && b <= group_size && a != b);

            let table_a = table_for(group_size, a);
            let table_b = table_for(group_size, b);
            prop_assert_ne!(table_a.holds(b), table_b.holds(a));
            prop_assert_eq!(table_a.holds(b), a < b);
        }
    }
}
