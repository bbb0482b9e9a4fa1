//! Ring with no members.

use std::collections::BTreeSet;

use crate::block::BlockKey;
use crate::error::Result;
use crate::peer::{PeerId, PeerPermutation};
use crate::ring::{describe_header, Placement, RingType};

/// Bootstrap placeholder: places nothing anywhere.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmptyRing {
    version: u32,
}

impl EmptyRing {
    pub fn new(version: u32) -> Self {
        Self { version }
    }
}

impl Placement for EmptyRing {
    fn get_peers(&self, _key: &BlockKey) -> Result<PeerPermutation> {
        Ok(PeerPermutation::default())
    }

    fn members(&self) -> BTreeSet<PeerId> {
        BTreeSet::new()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn ring_type(&self) -> RingType {
        RingType::Empty
    }

    fn describe(&self) -> String {
        describe_header(RingType::Empty, self.version, 0)
    }
}
