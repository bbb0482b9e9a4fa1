//! Cluster state: which blocks physically live on which peer.

use std::collections::{BTreeMap, BTreeSet};

use corelib::{BlockKey, PeerId, Placement, Ring};

/// Snapshot of block residency, `peer → blocks`.
///
/// Owned by the caller. The planner reads it and derives a new one; it never
/// edits its input. Ordered maps keep iteration, and therefore plans,
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterState {
    peers: BTreeMap<PeerId, BTreeSet<BlockKey>>,
}

impl ClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places every key on the live replicas `ring` assigns it.
    pub fn from_ring<'a>(
        ring: &Ring,
        keys: impl IntoIterator<Item = &'a BlockKey>,
    ) -> corelib::Result<Self> {
        let mut state = Self::new();
        for key in keys {
            let perm = ring.get_peers(key)?;
            for peer in perm.live() {
                state.insert(peer.clone(), *key);
            }
        }
        Ok(state)
    }

    /// Records `key` as resident on `peer`. Returns false if it already was.
    pub fn insert(&mut self, peer: PeerId, key: BlockKey) -> bool {
        self.peers.entry(peer).or_default().insert(key)
    }

    pub fn remove(&mut self, peer: &PeerId, key: &BlockKey) -> bool {
        let Some(blocks) = self.peers.get_mut(peer) else {
            return false;
        };
        let removed = blocks.remove(key);
        if blocks.is_empty() {
            self.peers.remove(peer);
        }
        removed
    }

    pub fn contains(&self, peer: &PeerId, key: &BlockKey) -> bool {
        self.peers.get(peer).is_some_and(|b| b.contains(key))
    }

    pub fn blocks(&self, peer: &PeerId) -> Option<&BTreeSet<BlockKey>> {
        self.peers.get(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.keys()
    }

    /// Every `(peer, block)` residency pair.
    pub fn pairs(&self) -> impl Iterator<Item = (&PeerId, &BlockKey)> {
        self.peers
            .iter()
            .flat_map(|(peer, blocks)| blocks.iter().map(move |b| (peer, b)))
    }

    /// Peers holding `key`.
    pub fn holders(&self, key: &BlockKey) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|(_, blocks)| blocks.contains(key))
            .map(|(peer, _)| peer.clone())
            .collect()
    }

    /// Distinct blocks across all peers.
    pub fn distinct_blocks(&self) -> BTreeSet<BlockKey> {
        self.peers.values().flatten().copied().collect()
    }

    /// Number of residency pairs.
    pub fn resident_count(&self) -> usize {
        self.peers.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl FromIterator<(PeerId, BlockKey)> for ClusterState {
    fn from_iter<I: IntoIterator<Item = (PeerId, BlockKey)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (peer, key) in iter {
            state.insert(peer, key);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{PeerInfo, RingType};

    #[test]
    fn test_insert_and_query() {
        let mut state = ClusterState::new();
        let a = PeerId::from("a");
        let key = BlockKey::data(1, 1, 1);

        assert!(state.insert(a.clone(), key));
        assert!(!state.insert(a.clone(), key));
        assert!(state.contains(&a, &key));
        assert_eq!(state.holders(&key), vec![a.clone()]);
        assert_eq!(state.resident_count(), 1);

        assert!(state.remove(&a, &key));
        assert!(state.is_empty());
    }

    #[test]
    fn test_from_ring_uses_live_replicas() {
        let ring = Ring::create(
            RingType::Ketama,
            1,
            2,
            vec![PeerInfo::new("a", 1), PeerInfo::new("b", 1), PeerInfo::new("c", 1)],
        )
        .unwrap();
        let keys: Vec<BlockKey> = (0..20).map(|i| BlockKey::data(1, 1, i)).collect();
        let state = ClusterState::from_ring(&ring, &keys).unwrap();

        assert_eq!(state.resident_count(), 40);
        assert_eq!(state.distinct_blocks().len(), 20);
        for key in &keys {
            assert_eq!(state.holders(key).len(), 2);
        }
    }
}
