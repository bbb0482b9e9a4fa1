//! Weighted consistent hashing ("ketama").
//!
//! Each peer owns a number of points on a 64-bit hash ring proportional to
//! its own weight (see [`point_count`]). A key is positioned by hashing its
//! encoding; walking clockwise from there and collecting distinct owners
//! yields a full ordering of all peers. Adding or removing a peer only
//! changes the owners of the arcs next to that peer's points.
//!
//! # Algorithm
//!
//! 1. Hash the key to a [`SipToken`]
//! 2. Binary-search the first point at or after the token
//! 3. Walk clockwise (wrapping) and record each owner the first time it shows up
//! 4. Stop once every peer has been seen
//!
//! # Performance
//!
//! - **Time**: O(log p + p) worst case, typically a short walk
//! - **Space**: O(n) for the seen-set and result

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use tracing::debug;

use crate::block::BlockKey;
use crate::error::{Error, Result};
use crate::partitioner::{Partitioner, SipPartitioner};
use crate::peer::{find_duplicate, PeerId, PeerInfo, PeerPermutation};
use crate::ring::{describe_header, next_version, Placement, Ring, RingMutation, RingType};
use crate::token::SipToken;
use crate::vnode::{point_count, VirtualNode};

/// Replication used when none is configured.
pub const DEFAULT_REPLICATION: usize = 1;

#[derive(Clone)]
pub struct KetamaRing {
    version: u32,
    replication: usize,
    /// Sorted by id. Virtual node owners index into this table.
    peers: Vec<PeerInfo>,
    /// Sorted by (token, owner).
    points: Arc<[VirtualNode]>,
}

impl KetamaRing {
    /// Builds the ring. A replication factor of zero means
    /// [`DEFAULT_REPLICATION`].
    pub fn new(version: u32, replication: usize, mut peers: Vec<PeerInfo>) -> Result<Self> {
        if peers.is_empty() {
            return Err(Error::invalid("ketama ring needs at least one peer"));
        }
        if let Some(dup) = find_duplicate(peers.iter().map(|p| &p.id)) {
            return Err(Error::Invalid(format!("duplicate peer {dup}")));
        }
        if peers.len() > u32::MAX as usize {
            return Err(Error::invalid("too many peers"));
        }
        peers.sort_by(|a, b| a.id.cmp(&b.id));

        let replication = if replication == 0 {
            DEFAULT_REPLICATION
        } else {
            replication
        };

        let mut points = Vec::new();
        for (owner, peer) in peers.iter().enumerate() {
            let count = point_count(peer.effective_weight());
            points.extend((0..count).map(|i| VirtualNode::from_index(&peer.id, owner as u32, i)));
        }
        points.sort_unstable();

        debug!(
            version,
            peers = peers.len(),
            points = points.len(),
            replication,
            "built ketama ring"
        );

        Ok(Self {
            version,
            replication,
            peers,
            points: points.into(),
        })
    }

    pub fn replication(&self) -> usize {
        self.replication
    }

    pub fn peers(&self) -> &[PeerInfo] {
        &self.peers
    }

    /// Total virtual points on the ring.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Points owned by `peer`.
    pub fn points_of(&self, peer: &PeerId) -> usize {
        match self.peers.iter().position(|p| &p.id == peer) {
            Some(owner) => self.points.iter().filter(|v| v.owner == owner as u32).count(),
            None => 0,
        }
    }

    fn successor(&self, replication: usize, peers: Vec<PeerInfo>) -> Result<Ring> {
        if replication > peers.len() {
            return Err(Error::InsufficientPeers {
                needed: replication,
                available: peers.len(),
            });
        }
        Ok(Ring::Ketama(KetamaRing::new(
            next_version(self.version)?,
            replication,
            peers,
        )?))
    }
}

impl Placement for KetamaRing {
    fn get_peers(&self, key: &BlockKey) -> Result<PeerPermutation> {
        let n = self.peers.len();
        let position: SipToken = SipPartitioner.partition_block(key);
        let start = self.points.partition_point(|v| v.token < position);

        let mut seen = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let len = self.points.len();
        for i in 0..len {
            let owner = self.points[(start + i) % len].owner as usize;
            if !seen[owner] {
                seen[owner] = true;
                order.push(self.peers[owner].id.clone());
                if order.len() == n {
                    break;
                }
            }
        }

        if order.len() < n || self.replication > order.len() {
            return Err(Error::InsufficientPeers {
                needed: self.replication.max(n),
                available: order.len(),
            });
        }

        Ok(PeerPermutation::new(order, self.replication))
    }

    fn members(&self) -> BTreeSet<PeerId> {
        self.peers.iter().map(|p| p.id.clone()).collect()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn ring_type(&self) -> RingType {
        RingType::Ketama
    }

    fn describe(&self) -> String {
        let mut out = describe_header(RingType::Ketama, self.version, self.replication);
        out.push_str("Peers:\n");
        for peer in &self.peers {
            let _ = writeln!(
                out,
                "\t{} (weight {}, {} points)",
                peer.id,
                peer.weight,
                self.points_of(&peer.id)
            );
        }
        out
    }
}

impl RingMutation for KetamaRing {
    fn add_peers(&self, peers: &[PeerInfo], replication: usize) -> Result<Ring> {
        let mut next = self.peers.clone();
        for peer in peers {
            // An existing member keeps its current weight.
            if !next.iter().any(|p| p.id == peer.id) {
                next.push(peer.clone());
            }
        }
        if next.len() == self.peers.len() {
            return Err(Error::AlreadyExists);
        }
        self.successor(replication, next)
    }

    fn remove_peers(&self, peers: &[PeerId], replication: usize) -> Result<Ring> {
        let next: Vec<PeerInfo> = self
            .peers
            .iter()
            .filter(|p| !peers.contains(&p.id))
            .cloned()
            .collect();
        if next.len() == self.peers.len() {
            return Err(Error::NotExist);
        }
        self.successor(replication, next)
    }

    fn change_replication(&self, replication: usize) -> Result<Ring> {
        self.successor(replication, self.peers.clone())
    }
}

impl fmt::Debug for KetamaRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KetamaRing")
            .field("version", &self.version)
            .field("replication", &self.replication)
            .field("peers", &self.peers)
            .field("points", &self.points.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::{MAX_WEIGHT, POINTS_PER_PEER};

    fn ring(n: usize, replication: usize) -> KetamaRing {
        let peers = (0..n).map(|i| PeerInfo::new(format!("peer-{i}"), 1)).collect();
        KetamaRing::new(1, replication, peers).unwrap()
    }

    #[test]
    fn test_full_distinct_ordering() {
        let r = ring(5, 3);
        for i in 0..200 {
            let perm = r.get_peers(&BlockKey::data(7, 1, i)).unwrap();
            assert_eq!(perm.peers.len(), 5);
            assert_eq!(perm.replication, 3);
            let unique: BTreeSet<_> = perm.peers.iter().collect();
            assert_eq!(unique.len(), 5, "duplicate peer in permutation");
        }
    }

    #[test]
    fn test_zero_replication_defaults_to_one() {
        assert_eq!(ring(3, 0).replication(), 1);
    }

    #[test]
    fn test_zero_weight_gets_points() {
        let r = KetamaRing::new(
            1,
            1,
            vec![PeerInfo::new("heavy", 1 << 40), PeerInfo::new("empty", 0)],
        )
        .unwrap();
        assert_eq!(r.points_of(&PeerId::from("empty")), POINTS_PER_PEER as usize);
        assert_eq!(
            r.points_of(&PeerId::from("heavy")),
            (POINTS_PER_PEER * MAX_WEIGHT) as usize
        );
    }

    #[test]
    fn test_insufficient_peers() {
        let r = KetamaRing::new(1, 4, vec![PeerInfo::new("a", 1), PeerInfo::new("b", 1)]).unwrap();
        assert!(matches!(
            r.get_peers(&BlockKey::data(1, 1, 1)),
            Err(Error::InsufficientPeers { needed: 4, available: 2 })
        ));
    }

    #[test]
    fn test_readd_keeps_weight() {
        let r = KetamaRing::new(1, 1, vec![PeerInfo::new("a", 5)]).unwrap();
        let grown = r
            .add_peers(&[PeerInfo::new("a", 500), PeerInfo::new("b", 5)], 1)
            .unwrap();
        match grown {
            Ring::Ketama(k) => {
                assert_eq!(k.peers()[0], PeerInfo::new("a", 5));
                assert_eq!(k.version(), 2);
            }
            other => panic!("expected ketama ring, got {other:?}"),
        }
    }
}
