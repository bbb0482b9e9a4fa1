//! Peer abstractions for the placement ring.
//!
//! Peers are the cluster members eligible to hold block replicas. They are
//! identified by an opaque, globally unique string and carry a capacity
//! weight that weighted strategies use to size their share of the keyspace.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a cluster member.
///
/// Ordering is plain byte-wise string ordering, which is what the modulo
/// strategy sorts by, so every member derives the same rotation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A member of the peer directory: identity plus capacity weight.
///
/// Keep this struct small and cheap to clone; liveness, addresses and other
/// mutable state belong to whoever owns the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    /// Capacity, typically storage bytes. Zero is treated as one by strategies
    /// that need a positive weight.
    pub weight: u64,
}

impl PeerInfo {
    pub fn new(id: impl Into<PeerId>, weight: u64) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }

    /// Weight clamped to the minimum viable value of 1.
    pub fn effective_weight(&self) -> u64 {
        self.weight.max(1)
    }
}

/// Ordered candidate list for one block.
///
/// The first `replication` peers must hold a live replica. Anything after
/// that is fallback order, used by union rings and rebalance diffing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerPermutation {
    pub peers: Vec<PeerId>,
    pub replication: usize,
}

impl PeerPermutation {
    pub fn new(peers: Vec<PeerId>, replication: usize) -> Self {
        debug_assert!(replication <= peers.len());
        Self { peers, replication }
    }

    /// The peers that must currently hold a live replica.
    pub fn live(&self) -> &[PeerId] {
        &self.peers[..self.replication.min(self.peers.len())]
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains(peer)
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Peers of `self` followed by the peers of `other` not already present.
    ///
    /// Replication is taken from `self`.
    pub fn union(&self, other: &PeerPermutation) -> PeerPermutation {
        let mut seen: HashSet<&PeerId> = self.peers.iter().collect();
        let mut peers = self.peers.clone();
        for peer in &other.peers {
            if seen.insert(peer) {
                peers.push(peer.clone());
            }
        }
        PeerPermutation {
            peers,
            replication: self.replication,
        }
    }
}

/// Returns the first duplicated id in `ids`, if any.
pub(crate) fn find_duplicate<'a>(ids: impl IntoIterator<Item = &'a PeerId>) -> Option<&'a PeerId> {
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}
