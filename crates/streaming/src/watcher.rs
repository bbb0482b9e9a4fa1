//! Ring watcher: reacts to published rings on one member.
//!
//! [`RingWatcher`] subscribes to the ring store and, for every newer ring:
//! - Switches the read view to the union of the settled and incoming rings,
//!   so lookups reach both old and new holders while blocks move
//! - Plans the transition against a fresh residency snapshot
//! - Executes the local peer's transfers
//! - Settles on the new ring once every local transfer succeeded
//!
//! A transition with failed transfers keeps the union view. The next ring
//! that arrives is planned from the last settled ring.

use std::sync::Arc;

use corelib::{Placement, Ring};
use parking_lot::RwLock;
use rebalance::Rebalancer;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::migration::{MigrationExecutor, MigrationReport};
use crate::store::recv_ring;
use crate::transfer::StateProvider;

struct Views {
    /// Last ring whose migration completed.
    settled: Arc<Ring>,
    /// Ring lookups should use right now.
    read: Arc<Ring>,
}

pub struct RingWatcher {
    views: RwLock<Views>,
    state: Arc<dyn StateProvider>,
    executor: MigrationExecutor,
}

impl RingWatcher {
    pub fn new(initial: Arc<Ring>, state: Arc<dyn StateProvider>, executor: MigrationExecutor) -> Self {
        Self {
            views: RwLock::new(Views {
                settled: initial.clone(),
                read: initial,
            }),
            state,
            executor,
        }
    }

    /// Ring to answer placement lookups with.
    pub fn read_view(&self) -> Arc<Ring> {
        self.views.read().read.clone()
    }

    pub fn settled(&self) -> Arc<Ring> {
        self.views.read().settled.clone()
    }

    /// Runs until the ring store goes away.
    pub async fn run(&self, mut rings: broadcast::Receiver<Arc<Ring>>) {
        info!(peer = %self.executor.local(), "ring watcher started");

        while let Ok(ring) = recv_ring(&mut rings).await {
            let version = ring.version();
            match self.handle_ring(ring).await {
                Ok(Some(report)) if !report.is_complete() => {
                    warn!(version, failed = report.failed.len(), "transition left incomplete");
                }
                Ok(_) => {}
                Err(e) => error!(version, error = %e, "failed to apply ring"),
            }
        }

        info!(peer = %self.executor.local(), "ring watcher shutting down, ring channel closed");
    }

    /// Applies one published ring. Returns `None` when it is not newer than
    /// the settled ring.
    pub async fn handle_ring(&self, next: Arc<Ring>) -> Result<Option<MigrationReport>> {
        let old = self.settled();
        if next.version() <= old.version() {
            debug!(
                version = next.version(),
                settled = old.version(),
                "ignoring ring that is not newer"
            );
            return Ok(None);
        }

        let union = Arc::new(Ring::union_arc(old.clone(), next.clone()));
        self.views.write().read = union;
        info!(from = old.version(), to = next.version(), "ring transition started");

        let plan = match self.plan(&old, &next).await {
            Ok(plan) => plan,
            Err(e) => {
                self.views.write().read = old;
                return Err(e);
            }
        };
        let report = self.executor.execute(&plan).await;

        if report.is_complete() {
            let mut views = self.views.write();
            views.settled = next.clone();
            views.read = next.clone();
            info!(version = next.version(), sent = report.sent, "ring transition settled");
        }
        Ok(Some(report))
    }

    async fn plan(&self, old: &Ring, next: &Ring) -> Result<rebalance::RebalancePlan> {
        let state = self.state.cluster_state().await?;
        Ok(Rebalancer::new(old, next).plan(&state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryRingStore, RingStore};
    use crate::transfer::MemoryBlockStore;
    use bytes::Bytes;
    use corelib::{BlockKey, PeerId, PeerInfo, RingType};

    fn ketama(version: u32, replication: usize, ids: &[&str]) -> Ring {
        let peers = ids.iter().map(|id| PeerInfo::new(*id, 1)).collect();
        Ring::create(RingType::Ketama, version, replication, peers).unwrap()
    }

    fn watcher(peer: &str, ring: &Arc<Ring>, blocks: &Arc<MemoryBlockStore>) -> RingWatcher {
        let executor = MigrationExecutor::new(PeerId::from(peer), blocks.clone(), blocks.clone());
        RingWatcher::new(ring.clone(), blocks.clone(), executor)
    }

    fn seed(ring: &Ring, blocks: &MemoryBlockStore, n: u64) -> Vec<BlockKey> {
        let keys: Vec<BlockKey> = (0..n).map(|i| BlockKey::data(3, i, 0)).collect();
        for key in &keys {
            for peer in ring.get_peers(key).unwrap().live() {
                blocks.put(peer.clone(), *key, Bytes::from_static(b"x"));
            }
        }
        keys
    }

    #[tokio::test]
    async fn test_all_members_converge_on_new_ring() {
        let old = Arc::new(ketama(1, 2, &["a", "b", "c"]));
        let new = Arc::new(ketama(2, 2, &["a", "b", "c", "d"]));
        let blocks = Arc::new(MemoryBlockStore::new());
        let keys = seed(&old, &blocks, 200);

        for peer in ["a", "b", "c", "d"] {
            let w = watcher(peer, &old, &blocks);
            let report = w.handle_ring(new.clone()).await.unwrap().unwrap();
            assert!(report.is_complete());
            assert_eq!(w.read_view().version(), 2);
            assert_eq!(w.read_view().ring_type(), RingType::Ketama);
        }

        for key in &keys {
            for peer in new.get_peers(key).unwrap().live() {
                assert!(blocks.contains(peer, key), "{key} missing on {peer}");
            }
        }
    }

    #[tokio::test]
    async fn test_stale_ring_ignored() {
        let ring = Arc::new(ketama(4, 1, &["a"]));
        let blocks = Arc::new(MemoryBlockStore::new());
        let w = watcher("a", &ring, &blocks);

        assert!(w.handle_ring(Arc::new(ketama(3, 1, &["a", "b"]))).await.unwrap().is_none());
        assert_eq!(w.settled().version(), 4);
    }

    #[tokio::test]
    async fn test_planning_failure_restores_view() {
        let old = Arc::new(ketama(1, 1, &["a", "b"]));
        let blocks = Arc::new(MemoryBlockStore::new());
        seed(&old, &blocks, 10);
        let w = watcher("a", &old, &blocks);

        // Replication above membership cannot be placed.
        let bad = Arc::new(ketama(2, 3, &["a", "b"]));
        assert!(w.handle_ring(bad).await.is_err());
        assert_eq!(w.read_view().version(), 1);
        assert_eq!(w.read_view().ring_type(), RingType::Ketama);
    }

    #[tokio::test]
    async fn test_incomplete_transition_keeps_union_view() {
        let old = Arc::new(ketama(1, 1, &["a"]));
        let new = Arc::new(ketama(2, 1, &["b"]));
        let blocks = Arc::new(MemoryBlockStore::new());
        let key = BlockKey::data(1, 1, 1);
        blocks.put(PeerId::from("a"), key, Bytes::new());

        // a's executor reads from a store that lacks the block.
        let empty = Arc::new(MemoryBlockStore::new());
        let executor = MigrationExecutor::new(PeerId::from("a"), empty, blocks.clone());
        let w = RingWatcher::new(old.clone(), blocks.clone(), executor);

        let report = w.handle_ring(new).await.unwrap().unwrap();
        assert!(!report.is_complete());
        assert_eq!(w.settled().version(), 1);
        assert_eq!(w.read_view().ring_type(), RingType::Union);
        let members = w.read_view().members();
        assert!(members.contains(&PeerId::from("a")) && members.contains(&PeerId::from("b")));
    }

    #[tokio::test]
    async fn test_run_follows_store_until_closed() {
        let initial = ketama(1, 1, &["a", "b"]);
        let store = MemoryRingStore::new(initial).unwrap();
        let current = store.current_ring().await.unwrap();
        let blocks = Arc::new(MemoryBlockStore::new());
        seed(&current, &blocks, 50);

        let w = Arc::new(watcher("a", &current, &blocks));
        let rx = store.subscribe();
        let handle = tokio::spawn({
            let w = w.clone();
            async move { w.run(rx).await }
        });

        store.publish_ring(ketama(2, 1, &["a", "b", "c"]), false).await.unwrap();
        store.publish_ring(ketama(3, 2, &["a", "b", "c"]), false).await.unwrap();
        drop(store);
        handle.await.unwrap();

        assert_eq!(w.settled().version(), 3);
        assert_eq!(w.read_view().version(), 3);
    }
}
