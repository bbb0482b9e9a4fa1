//! Ring with exactly one member.

use std::collections::BTreeSet;

use crate::block::BlockKey;
use crate::error::Result;
use crate::peer::{PeerId, PeerInfo, PeerPermutation};
use crate::ring::{describe_header, Placement, RingType};

/// Every key lives on the one peer, replication 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleRing {
    version: u32,
    peer: PeerInfo,
}

impl SingleRing {
    pub fn new(version: u32, peer: PeerInfo) -> Self {
        Self { version, peer }
    }

    pub fn peer(&self) -> &PeerInfo {
        &self.peer
    }
}

impl Placement for SingleRing {
    fn get_peers(&self, _key: &BlockKey) -> Result<PeerPermutation> {
        Ok(PeerPermutation::new(vec![self.peer.id.clone()], 1))
    }

    fn members(&self) -> BTreeSet<PeerId> {
        BTreeSet::from([self.peer.id.clone()])
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn ring_type(&self) -> RingType {
        RingType::Single
    }

    fn describe(&self) -> String {
        let mut out = describe_header(RingType::Single, self.version, 1);
        out.push_str(&format!("Peer: {} (weight {})\n", self.peer.id, self.peer.weight));
        out
    }
}
