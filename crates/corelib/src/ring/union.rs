//! Composite view over the rings before and after a topology change.
//!
//! While blocks migrate, a reader cannot know whether a given block has moved
//! yet. A union ring answers with the new ring's permutation followed by any
//! old-ring peers not already listed, so a lookup tries the post-migration
//! location first and falls back to the pre-migration one.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::block::BlockKey;
use crate::error::Result;
use crate::peer::{PeerId, PeerPermutation};
use crate::ring::{Placement, Ring, RingType};

#[derive(Clone, Debug)]
pub struct UnionRing {
    old: Arc<Ring>,
    new: Arc<Ring>,
}

impl UnionRing {
    pub fn new(old: Arc<Ring>, new: Arc<Ring>) -> Self {
        Self { old, new }
    }

    pub fn old(&self) -> &Arc<Ring> {
        &self.old
    }

    pub fn new_ring(&self) -> &Arc<Ring> {
        &self.new
    }
}

impl Placement for UnionRing {
    fn get_peers(&self, key: &BlockKey) -> Result<PeerPermutation> {
        let new = self.new.get_peers(key)?;
        let old = self.old.get_peers(key)?;
        Ok(new.union(&old))
    }

    fn members(&self) -> BTreeSet<PeerId> {
        let mut members = self.new.members();
        members.extend(self.old.members());
        members
    }

    /// A union is a transient view, not a lineage of its own.
    fn version(&self) -> u32 {
        self.new.version()
    }

    fn ring_type(&self) -> RingType {
        RingType::Union
    }

    fn describe(&self) -> String {
        let indent = |s: String| {
            s.lines()
                .map(|l| format!("\t{l}\n"))
                .collect::<String>()
        };
        format!(
            "Ring: {}\nOld:\n{}New:\n{}",
            RingType::Union,
            indent(self.old.describe()),
            indent(self.new.describe())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::PeerInfo;

    #[test]
    fn test_union_members_and_version() {
        let old = Ring::create(
            RingType::Modulo,
            4,
            1,
            vec![PeerInfo::new("a", 1), PeerInfo::new("b", 1)],
        )
        .unwrap();
        let new = Ring::create(
            RingType::Modulo,
            5,
            2,
            vec![PeerInfo::new("b", 1), PeerInfo::new("c", 1)],
        )
        .unwrap();
        let union = Ring::union(old, new);

        assert_eq!(union.version(), 5);
        assert_eq!(union.ring_type(), RingType::Union);
        assert_eq!(union.members().len(), 3);
        for i in 0..50 {
            let perm = union.get_peers(&BlockKey::data(1, 2, i)).unwrap();
            assert_eq!(perm.replication, 2);
            assert!(perm.peers.len() >= 2 && perm.peers.len() <= 3);
        }
        assert!(union.describe().contains("Old:"));
    }
}
