//! Checksum-modulo placement.
//!
//! Members are sorted by id. A key's checksum modulo the member count picks a
//! start index, and the key's permutation is the sorted list rotated to start
//! there. Rotation gives every key a full total order over the members, so
//! replica 2, 3, … are "the next peers after the primary" and stay put as long
//! as membership does.
//!
//! Unlike ketama this strategy reshuffles most keys whenever the member count
//! changes; it exists for small, static clusters and tests.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use tracing::debug;

use crate::block::BlockKey;
use crate::error::{Error, Result};
use crate::partitioner::block_checksum;
use crate::peer::{find_duplicate, PeerId, PeerInfo, PeerPermutation};
use crate::ring::{describe_header, next_version, Placement, Ring, RingMutation, RingType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuloRing {
    version: u32,
    replication: usize,
    /// Sorted, no duplicates, never empty.
    peers: Vec<PeerId>,
}

impl ModuloRing {
    pub fn new(version: u32, replication: usize, mut peers: Vec<PeerId>) -> Result<Self> {
        if peers.is_empty() {
            return Err(Error::invalid("modulo ring needs at least one peer"));
        }
        if replication == 0 {
            return Err(Error::invalid("modulo ring needs a replication factor of at least 1"));
        }
        if let Some(dup) = find_duplicate(&peers) {
            return Err(Error::Invalid(format!("duplicate peer {dup}")));
        }
        peers.sort();
        Ok(Self {
            version,
            replication,
            peers,
        })
    }

    pub fn replication(&self) -> usize {
        self.replication
    }

    /// Members in placement order.
    pub fn peers(&self) -> &[PeerId] {
        &self.peers
    }

    fn successor(&self, replication: usize, peers: Vec<PeerId>) -> Result<Ring> {
        if replication > peers.len() {
            return Err(Error::InsufficientPeers {
                needed: replication,
                available: peers.len(),
            });
        }
        let ring = ModuloRing::new(next_version(self.version)?, replication, peers)?;
        debug!(
            version = ring.version,
            peers = ring.peers.len(),
            replication,
            "derived modulo ring"
        );
        Ok(Ring::Modulo(ring))
    }
}

impl Placement for ModuloRing {
    fn get_peers(&self, key: &BlockKey) -> Result<PeerPermutation> {
        let n = self.peers.len();
        if self.replication > n {
            return Err(Error::InsufficientPeers {
                needed: self.replication,
                available: n,
            });
        }

        let start = (block_checksum(key) % n as u64) as usize;
        let peers = self.peers[start..]
            .iter()
            .chain(&self.peers[..start])
            .take(self.replication)
            .cloned()
            .collect();

        Ok(PeerPermutation::new(peers, self.replication))
    }

    fn members(&self) -> BTreeSet<PeerId> {
        self.peers.iter().cloned().collect()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn ring_type(&self) -> RingType {
        RingType::Modulo
    }

    fn describe(&self) -> String {
        let mut out = describe_header(RingType::Modulo, self.version, self.replication);
        out.push_str("Peers:\n");
        for peer in &self.peers {
            let _ = writeln!(out, "\t{}", peer);
        }
        out
    }
}

impl RingMutation for ModuloRing {
    fn add_peers(&self, peers: &[PeerInfo], replication: usize) -> Result<Ring> {
        let mut members = self.members();
        let before = members.len();
        members.extend(peers.iter().map(|p| p.id.clone()));
        if members.len() == before {
            return Err(Error::AlreadyExists);
        }
        self.successor(replication, members.into_iter().collect())
    }

    fn remove_peers(&self, peers: &[PeerId], replication: usize) -> Result<Ring> {
        let remaining: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|p| !peers.contains(p))
            .cloned()
            .collect();
        if remaining.len() == self.peers.len() {
            return Err(Error::NotExist);
        }
        self.successor(replication, remaining)
    }

    fn change_replication(&self, replication: usize) -> Result<Ring> {
        self.successor(replication, self.peers.clone())
    }
}
