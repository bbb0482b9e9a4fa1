//! Rebalance planner.
//!
//! Given the ring before and after a topology change and the current block
//! residency, computes where every block must live next and which peer sends
//! each missing copy.
//!
//! # Algorithm
//!
//! For every resident `(p, block)` pair:
//!
//! 1. `old` and `new` are the block's live replicas under each ring
//! 2. If `p ∈ new`, the copy stays and counts as kept
//! 3. `diff = new \ old`, in `new` order: peers that must receive a copy
//! 4. With `idx` = position of `p` in `old`:
//!    - `idx ≥ |diff|`: `p` sends nothing
//!    - `idx` is the last old slot and `|diff| > |old|` (replication grew):
//!      `p` seeds every remaining destination `diff[idx..]`
//!    - otherwise `p` sends to `diff[idx]`
//!
//! Aligning old slots to diff slots makes each new destination the job of at
//! most one old holder, so the bytes moved scale with the topology change,
//! not the dataset.
//!
//! A peer that holds a block without being one of its old live replicas is
//! not a designated source and sends nothing.
//!
//! The alignment can leave a destination without a sender when the old holder
//! at that slot does not actually have the block (shrink-and-reshuffle
//! transitions). Such blocks are listed in
//! [`RebalancePlan::under_replicated`] rather than silently patched.

use std::collections::BTreeMap;

use corelib::{BlockKey, PeerId, Placement, Ring};
use tracing::{debug, info, trace, warn};

use crate::error::{RebalanceError, Result};
use crate::state::ClusterState;

/// Aggregate outcome of one planning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebalanceStats {
    /// Copies that stay on a peer that already had them.
    pub blocks_kept: u64,
    /// Copies that must be transmitted to a new peer.
    pub blocks_moved: u64,
}

/// One copy to send.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Transfer {
    pub block: BlockKey,
    pub from: PeerId,
    pub to: PeerId,
}

/// Full result of a planning pass.
#[derive(Clone, Debug, Default)]
pub struct RebalancePlan {
    /// Residency once every transfer has completed and dropped copies are gone.
    pub state: ClusterState,
    pub stats: RebalanceStats,
    /// Sends in iteration order of the input state.
    pub transfers: Vec<Transfer>,
    /// Blocks whose new live replicas are not all covered by the plan.
    pub under_replicated: Vec<BlockKey>,
}

impl RebalancePlan {
    /// Transfers the given peer is responsible for sending.
    pub fn transfers_from<'a>(&'a self, peer: &'a PeerId) -> impl Iterator<Item = &'a Transfer> {
        self.transfers.iter().filter(move |t| &t.from == peer)
    }

    pub fn is_noop(&self) -> bool {
        self.transfers.is_empty()
    }
}

/// Per-block placement under both rings, computed once per pass.
struct Placements {
    old: Vec<PeerId>,
    new: Vec<PeerId>,
    diff: Vec<PeerId>,
}

impl Placements {
    fn compute(old_ring: &Ring, new_ring: &Ring, block: &BlockKey) -> Result<Self> {
        let old = old_ring
            .get_peers(block)
            .map_err(|source| RebalanceError::Placement {
                ring: "old",
                block: *block,
                source,
            })?
            .live()
            .to_vec();
        let new = new_ring
            .get_peers(block)
            .map_err(|source| RebalanceError::Placement {
                ring: "new",
                block: *block,
                source,
            })?
            .live()
            .to_vec();
        let diff = new.iter().filter(|p| !old.contains(p)).cloned().collect();
        Ok(Self { old, new, diff })
    }

    /// Destinations `holder` must seed, per the slot alignment rule.
    fn destinations(&self, holder: &PeerId) -> &[PeerId] {
        let Some(idx) = self.old.iter().position(|p| p == holder) else {
            return &[];
        };
        if idx >= self.diff.len() {
            &[]
        } else if idx == self.old.len() - 1 && self.diff.len() > self.old.len() {
            &self.diff[idx..]
        } else {
            &self.diff[idx..=idx]
        }
    }
}

/// Plans the transition from one ring to another.
///
/// Holds both rings by reference; neither is modified.
#[derive(Clone, Copy, Debug)]
pub struct Rebalancer<'a> {
    old: &'a Ring,
    new: &'a Ring,
}

impl<'a> Rebalancer<'a> {
    pub fn new(old: &'a Ring, new: &'a Ring) -> Self {
        Self { old, new }
    }

    /// Computes the plan for `state`.
    ///
    /// Every block is placed under both rings before any output is built, so
    /// a placement failure aborts with no partial plan.
    pub fn plan(&self, state: &ClusterState) -> Result<RebalancePlan> {
        let mut placements = BTreeMap::new();
        for block in state.distinct_blocks() {
            let p = Placements::compute(self.old, self.new, &block)?;
            placements.insert(block, p);
        }

        let mut plan = RebalancePlan::default();
        for (peer, block) in state.pairs() {
            let p = &placements[block];

            if p.new.contains(peer) {
                plan.state.insert(peer.clone(), *block);
                plan.stats.blocks_kept += 1;
            }

            for dest in p.destinations(peer) {
                trace!(%block, from = %peer, to = %dest, "planned transfer");
                plan.state.insert(dest.clone(), *block);
                plan.stats.blocks_moved += 1;
                plan.transfers.push(Transfer {
                    block: *block,
                    from: peer.clone(),
                    to: dest.clone(),
                });
            }
        }

        for (block, p) in &placements {
            if p.new.iter().any(|peer| !plan.state.contains(peer, block)) {
                debug!(%block, new = ?p.new, "block not covered by plan");
                plan.under_replicated.push(*block);
            }
        }

        metrics::counter!("rebalance.blocks_kept").increment(plan.stats.blocks_kept);
        metrics::counter!("rebalance.blocks_moved").increment(plan.stats.blocks_moved);
        metrics::counter!("rebalance.under_replicated")
            .increment(plan.under_replicated.len() as u64);

        if !plan.under_replicated.is_empty() {
            warn!(
                blocks = plan.under_replicated.len(),
                old_version = self.old.version(),
                new_version = self.new.version(),
                "rebalance plan leaves blocks under-replicated"
            );
        }
        info!(
            old_version = self.old.version(),
            new_version = self.new.version(),
            blocks = placements.len(),
            kept = plan.stats.blocks_kept,
            moved = plan.stats.blocks_moved,
            "rebalance plan computed"
        );

        Ok(plan)
    }
}

/// Derives the post-transition cluster state and its statistics.
pub fn rebalance(
    old: &Ring,
    new: &Ring,
    state: &ClusterState,
) -> Result<(ClusterState, RebalanceStats)> {
    let plan = Rebalancer::new(old, new).plan(state)?;
    Ok((plan.state, plan.stats))
}
