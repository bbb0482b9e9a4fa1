//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Instead of each peer having a single position on the ketama ring, each
//! peer owns a number of points proportional to its capacity weight, up to
//! [`MAX_WEIGHT`]. This provides:
//!
//! 1. **Weighted Load**: a peer with twice the weight receives roughly twice
//!    the keyspace
//! 2. **Bounded Rebalancing**: when a peer joins or leaves, only the arcs
//!    adjacent to its points change owner
//! 3. **Smooth Distribution**: more points = smaller variance between peers
//!
//! # Performance Characteristics
//!
//! - **Memory**: O(p) where p = total points on the ring
//! - **Lookup**: O(log p) binary search, plus a clockwise walk to collect
//!   distinct peers

use crate::peer::PeerId;
use crate::token::sip::SipToken;

/// Points granted per unit of weight.
pub const POINTS_PER_PEER: u64 = 160;

/// Weight above which a peer stops gaining points.
pub const MAX_WEIGHT: u64 = 64;

/// A virtual node on the ketama ring.
///
/// Represents a single token position owned by a peer. The owner is stored as
/// an index into the ring's peer table so the struct stays `Copy`.
///
/// # Invariants
///
/// - Every `VirtualNode` belongs to exactly one peer
/// - Ordering is by token first, then owner, so rings built from the same
///   peers sort identically even when two points collide
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualNode {
    /// Token position on the ring.
    ///
    /// The hash of `"<peer>-<point index>"`.
    pub token: SipToken,

    /// Index of the owning peer in the ring's peer table.
    pub owner: u32,
}

impl VirtualNode {
    #[inline]
    pub fn new(token: SipToken, owner: u32) -> Self {
        Self { token, owner }
    }

    /// Create the `point`-th virtual node of `peer`.
    ///
    /// # Algorithm
    ///
    /// 1. Format string: "peer-point"
    /// 2. Hash the string to get a token
    /// 3. Create VirtualNode with token and owner index
    pub fn from_index(peer: &PeerId, owner: u32, point: u64) -> Self {
        let key = format!("{}-{}", peer, point);
        Self::new(SipToken::from_key(&key), owner)
    }

    #[inline]
    pub fn token(&self) -> SipToken {
        self.token
    }

    #[inline]
    pub fn owner(&self) -> u32 {
        self.owner
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VNode(token={:016x}, owner={})", self.token.0, self.owner)
    }
}

/// Number of points a peer of the given weight receives.
///
/// `POINTS_PER_PEER · weight`, with the weight clamped to `1..=MAX_WEIGHT`.
/// Depends on nothing but the peer's own weight, so a membership change
/// never adds or removes points of the peers that stay.
pub fn point_count(weight: u64) -> u64 {
    POINTS_PER_PEER * weight.clamp(1, MAX_WEIGHT)
}
