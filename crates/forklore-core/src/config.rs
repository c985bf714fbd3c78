//! Static group membership.

use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// Identity of one participant, an integer in `[1, group_size]`.
pub type PeerId = u32;

/// Static description of the participant group, fixed for the process
/// lifetime.
///
/// The protocol has no dynamic membership: every node knows the full group
/// at construction and identities never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    group_size: u32,
    self_id: PeerId,
}

impl GroupConfig {
    /// Describe a group of `group_size` participants of which this node is
    /// `self_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidGroup`] unless
    /// `1 <= self_id <= group_size`.
    pub fn new(group_size: u32, self_id: PeerId) -> Result<Self, NodeError> {
        if group_size == 0 || self_id == 0 || self_id > group_size {
            return Err(NodeError::InvalidGroup { group_size, self_id });
        }
        Ok(Self { group_size, self_id })
    }

    /// Number of participants, this node included.
    #[must_use]
    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    /// This node's identity.
    #[must_use]
    pub fn self_id(&self) -> PeerId {
        self.self_id
    }

    /// Whether `peer` is a group member other than this node.
    #[must_use]
    pub fn is_peer(&self, peer: PeerId) -> bool {
        peer >= 1 && peer <= self.group_size && peer != self.self_id
    }

    /// Every peer identity (the group minus this node), ascending.
    pub fn peers(&self) -> impl Iterator<Item = PeerId> + use<> {
        let self_id = self.self_id;
        (1..=self.group_size).filter(move |&peer| peer != self_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_identities() {
        assert!(GroupConfig::new(0, 1).is_err());
        assert!(GroupConfig::new(3, 0).is_err());
        assert!(GroupConfig::new(3, 4).is_err());
    }

    #[test]
    fn accepts_singleton_group() {
        let config = GroupConfig::new(1, 1).unwrap();
        assert_eq!(config.peers().count(), 0);
    }

    #[test]
    fn peers_excludes_self() {
        let config = GroupConfig::new(4, 2).unwrap();
        let peers: Vec<PeerId> = config.peers().collect();
        assert_eq!(peers, vec![1, 3, 4]);
        assert!(config.is_peer(1));
        assert!(!config.is_peer(2));
        assert!(!config.is_peer(5));
        assert!(!config.is_peer(0));
    }
}
