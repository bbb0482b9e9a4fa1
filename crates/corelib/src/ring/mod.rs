//! Placement rings.
//!
//! A ring is a versioned, immutable function from a [`BlockKey`] to an
//! ordered list of candidate peers. The strategy set is closed, so [`Ring`]
//! is an enum and the wire tag maps onto it exhaustively:
//!
//! - [`EmptyRing`]: bootstrap placeholder with no members
//! - [`SingleRing`]: exactly one member holds everything
//! - [`ModuloRing`]: checksum-modulo rotation over sorted members
//! - [`KetamaRing`]: weighted consistent hashing
//! - [`UnionRing`]: old ∪ new view used while a migration is in flight
//!
//! Only modulo and ketama rings can change shape; they expose it through the
//! [`RingMutation`] capability returned by [`Ring::as_mutation`].

pub mod empty;
pub mod ketama;
pub mod modulo;
pub mod single;
pub mod union;
pub mod wire;

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::Arc;

use crate::block::BlockKey;
use crate::error::{Error, Result};
use crate::peer::{PeerId, PeerInfo, PeerPermutation};

pub use empty::EmptyRing;
pub use ketama::KetamaRing;
pub use modulo::ModuloRing;
pub use single::SingleRing;
pub use union::UnionRing;
pub use wire::RingRecord;

/// Strategy tag. The numeric values are persisted and must never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RingType {
    Empty = 0,
    Single = 1,
    Modulo = 2,
    Union = 3,
    Ketama = 4,
}

impl RingType {
    pub fn name(self) -> &'static str {
        match self {
            RingType::Empty => "empty",
            RingType::Single => "single",
            RingType::Modulo => "mod",
            RingType::Union => "union",
            RingType::Ketama => "ketama",
        }
    }
}

impl fmt::Display for RingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for RingType {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(RingType::Empty),
            1 => Ok(RingType::Single),
            2 => Ok(RingType::Modulo),
            3 => Ok(RingType::Union),
            4 => Ok(RingType::Ketama),
            other => Err(Error::UnknownType(other)),
        }
    }
}

impl FromStr for RingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "empty" => Ok(RingType::Empty),
            "single" => Ok(RingType::Single),
            "mod" | "modulo" => Ok(RingType::Modulo),
            "union" => Ok(RingType::Union),
            "ketama" => Ok(RingType::Ketama),
            other => Err(Error::Invalid(format!("unknown ring type name {other:?}"))),
        }
    }
}

/// Read-side contract every strategy implements.
///
/// All methods are pure: a ring value never changes after construction, so
/// any number of threads may query it without locking.
pub trait Placement: Send + Sync + fmt::Debug {
    /// Ordered candidate peers for `key`.
    fn get_peers(&self, key: &BlockKey) -> Result<PeerPermutation>;

    /// Full membership, not the per-key subset.
    fn members(&self) -> BTreeSet<PeerId>;

    fn version(&self) -> u32;

    fn ring_type(&self) -> RingType;

    /// Human-readable summary, for diagnostics only.
    fn describe(&self) -> String;
}

/// Structural change capability, implemented by modulo and ketama rings.
///
/// Every operation returns a new ring with `version + 1` and leaves `self`
/// untouched, since the rebalance planner needs old and new side by side.
pub trait RingMutation {
    /// Adds `peers` to the membership and sets the replication factor.
    ///
    /// Fails with [`Error::AlreadyExists`] when membership would not change.
    fn add_peers(&self, peers: &[PeerInfo], replication: usize) -> Result<Ring>;

    /// Removes `peers` from the membership and sets the replication factor.
    ///
    /// Fails with [`Error::NotExist`] when membership would not change.
    fn remove_peers(&self, peers: &[PeerId], replication: usize) -> Result<Ring>;

    /// Same membership, different replication factor.
    fn change_replication(&self, replication: usize) -> Result<Ring>;
}

/// A placement ring of any strategy.
#[derive(Clone, Debug)]
pub enum Ring {
    Empty(EmptyRing),
    Single(SingleRing),
    Modulo(ModuloRing),
    Ketama(KetamaRing),
    Union(UnionRing),
}

impl Ring {
    /// Builds a ring of the given strategy from configuration.
    ///
    /// Static dispatch over the closed strategy set. Union rings are composed
    /// from two existing rings with [`Ring::union`] instead.
    pub fn create(
        ring_type: RingType,
        version: u32,
        replication: usize,
        peers: Vec<PeerInfo>,
    ) -> Result<Ring> {
        match ring_type {
            RingType::Empty => {
                if !peers.is_empty() {
                    return Err(Error::invalid("empty ring cannot have members"));
                }
                Ok(Ring::Empty(EmptyRing::new(version)))
            }
            RingType::Single => {
                let mut peers = peers;
                if peers.len() != 1 {
                    return Err(Error::Invalid(format!(
                        "single ring needs exactly one peer, got {}",
                        peers.len()
                    )));
                }
                Ok(Ring::Single(SingleRing::new(version, peers.remove(0))))
            }
            RingType::Modulo => {
                let ids = peers.into_iter().map(|p| p.id).collect();
                Ok(Ring::Modulo(ModuloRing::new(version, replication, ids)?))
            }
            RingType::Ketama => Ok(Ring::Ketama(KetamaRing::new(version, replication, peers)?)),
            RingType::Union => Err(Error::invalid(
                "union rings are composed from an old and a new ring",
            )),
        }
    }

    /// Transitional view over `old` and `new`.
    pub fn union(old: Ring, new: Ring) -> Ring {
        Self::union_arc(Arc::new(old), Arc::new(new))
    }

    /// Like [`Ring::union`], sharing rings that are already behind an `Arc`.
    pub fn union_arc(old: Arc<Ring>, new: Arc<Ring>) -> Ring {
        Ring::Union(UnionRing::new(old, new))
    }

    /// Capability query for structural change.
    pub fn as_mutation(&self) -> Option<&dyn RingMutation> {
        match self {
            Ring::Modulo(r) => Some(r as &dyn RingMutation),
            Ring::Ketama(r) => Some(r as &dyn RingMutation),
            Ring::Empty(_) | Ring::Single(_) | Ring::Union(_) => None,
        }
    }

    fn inner(&self) -> &dyn Placement {
        match self {
            Ring::Empty(r) => r as &dyn Placement,
            Ring::Single(r) => r,
            Ring::Modulo(r) => r,
            Ring::Ketama(r) => r,
            Ring::Union(r) => r,
        }
    }
}

impl Placement for Ring {
    fn get_peers(&self, key: &BlockKey) -> Result<PeerPermutation> {
        self.inner().get_peers(key)
    }

    fn members(&self) -> BTreeSet<PeerId> {
        self.inner().members()
    }

    fn version(&self) -> u32 {
        self.inner().version()
    }

    fn ring_type(&self) -> RingType {
        self.inner().ring_type()
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Next version in a mutation lineage.
pub(crate) fn next_version(version: u32) -> Result<u32> {
    version
        .checked_add(1)
        .ok_or_else(|| Error::invalid("ring version exhausted"))
}

/// Shared header for `describe` output.
pub(crate) fn describe_header(ring_type: RingType, version: u32, replication: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Ring: {}", ring_type);
    let _ = writeln!(out, "Version: {}", version);
    let _ = writeln!(out, "Replication: {}", replication);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_type_tags_are_stable() {
        assert_eq!(RingType::Empty as u32, 0);
        assert_eq!(RingType::Single as u32, 1);
        assert_eq!(RingType::Modulo as u32, 2);
        assert_eq!(RingType::Union as u32, 3);
        assert_eq!(RingType::Ketama as u32, 4);
        assert_eq!(RingType::try_from(9), Err(Error::UnknownType(9)));
    }

    #[test]
    fn test_union_arc_shares_rings() {
        let modulo = |version, id: &str| {
            Arc::new(Ring::create(RingType::Modulo, version, 1, vec![PeerInfo::new(id, 1)]).unwrap())
        };
        let old = modulo(1, "a");
        let new = modulo(2, "b");

        match Ring::union_arc(old.clone(), new.clone()) {
            Ring::Union(u) => {
                assert!(Arc::ptr_eq(u.old(), &old));
                assert!(Arc::ptr_eq(u.new_ring(), &new));
                assert_eq!(u.version(), 2);
            }
            other => panic!("expected union ring, got {other:?}"),
        }
    }

    #[test]
    fn test_ring_type_from_name() {
        assert_eq!("mod".parse::<RingType>().unwrap(), RingType::Modulo);
        assert_eq!("Ketama".parse::<RingType>().unwrap(), RingType::Ketama);
        assert!("rendezvous".parse::<RingType>().is_err());
    }

    #[test]
    fn test_create_rejects_malformed_input() {
        let two = vec![PeerInfo::new("a", 1), PeerInfo::new("b", 1)];
        assert!(matches!(
            Ring::create(RingType::Single, 1, 1, two.clone()),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            Ring::create(RingType::Empty, 1, 0, two.clone()),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            Ring::create(RingType::Modulo, 1, 1, Vec::new()),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            Ring::create(RingType::Union, 1, 1, two),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn test_mutation_capability() {
        let peers = vec![PeerInfo::new("a", 1), PeerInfo::new("b", 1)];
        let modulo = Ring::create(RingType::Modulo, 1, 1, peers.clone()).unwrap();
        let ketama = Ring::create(RingType::Ketama, 1, 1, peers).unwrap();
        let single = Ring::create(RingType::Single, 1, 1, vec![PeerInfo::new("a", 1)]).unwrap();

        assert!(modulo.as_mutation().is_some());
        assert!(ketama.as_mutation().is_some());
        assert!(single.as_mutation().is_none());
        assert!(Ring::Empty(EmptyRing::new(0)).as_mutation().is_none());
        assert!(Ring::union(modulo, ketama).as_mutation().is_none());
    }
}
