//! Property tests over arbitrary memberships and keys.

use std::collections::BTreeSet;

use corelib::{BlockKey, BlockType, PeerId, PeerInfo, Placement, Ring, RingType};
use proptest::prelude::*;

fn block_key() -> impl Strategy<Value = BlockKey> {
    (any::<u64>(), any::<u64>(), any::<u64>(), any::<bool>()).prop_map(|(v, i, x, inode)| {
        let block_type = if inode { BlockType::INode } else { BlockType::Data };
        BlockKey::new(v, i, x, block_type)
    })
}

/// Between 1 and 8 distinct peers with arbitrary weights.
fn membership() -> impl Strategy<Value = Vec<PeerInfo>> {
    prop::collection::btree_map("[a-z]{1,6}", 0u64..8, 1..8)
        .prop_map(|m| m.into_iter().map(|(id, w)| PeerInfo::new(id, w)).collect())
}

fn strategy_ring() -> impl Strategy<Value = Ring> {
    (membership(), prop::bool::ANY, 1usize..4).prop_map(|(peers, ketama, rep)| {
        let rep = rep.min(peers.len());
        let ring_type = if ketama { RingType::Ketama } else { RingType::Modulo };
        Ring::create(ring_type, 1, rep, peers).unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_get_peers_is_deterministic(ring in strategy_ring(), key in block_key()) {
        let first = ring.get_peers(&key).unwrap();
        prop_assert_eq!(ring.get_peers(&key).unwrap(), first.clone());

        // A decoded copy agrees too.
        let copy = Ring::unmarshal(&ring.marshal().unwrap()).unwrap();
        prop_assert_eq!(copy.get_peers(&key).unwrap(), first);
    }

    #[test]
    fn prop_replication_bounded(ring in strategy_ring(), key in block_key()) {
        let perm = ring.get_peers(&key).unwrap();
        prop_assert!(perm.replication <= perm.peers.len());
        prop_assert!(perm.replication <= ring.members().len());

        let unique: BTreeSet<&PeerId> = perm.peers.iter().collect();
        prop_assert_eq!(unique.len(), perm.peers.len());
        for peer in &perm.peers {
            prop_assert!(ring.members().contains(peer));
        }
    }

    #[test]
    fn prop_union_is_set_union(old in strategy_ring(), new in strategy_ring(), key in block_key()) {
        let o = old.get_peers(&key).unwrap();
        let n = new.get_peers(&key).unwrap();
        let union = Ring::union(old, new);
        let u = union.get_peers(&key).unwrap();

        let expected: BTreeSet<PeerId> = o.peers.iter().chain(&n.peers).cloned().collect();
        let actual: BTreeSet<PeerId> = u.peers.iter().cloned().collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(u.peers.len(), u.peers.iter().collect::<BTreeSet<_>>().len());
        prop_assert_eq!(u.replication, n.replication);
        prop_assert_eq!(&u.peers[..n.peers.len()], &n.peers[..]);
    }

    #[test]
    fn prop_mutation_bumps_version(ring in strategy_ring(), extra in "[0-9]{1,4}") {
        let m = ring.as_mutation().unwrap();
        let rep = ring.get_peers(&BlockKey::data(0, 0, 0)).unwrap().replication;

        let grown = m.add_peers(&[PeerInfo::new(format!("new-{extra}"), 1)], rep).unwrap();
        prop_assert_eq!(grown.version(), ring.version() + 1);

        let same = m.change_replication(rep).unwrap();
        prop_assert_eq!(same.version(), ring.version() + 1);
        prop_assert_eq!(same.members(), ring.members());
    }
}
