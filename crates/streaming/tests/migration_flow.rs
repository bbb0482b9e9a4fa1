//! Whole-cluster migration driven through the ring store.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use corelib::{BlockKey, PeerId, PeerInfo, Placement, Ring, RingType};
use streaming::{
    update_ring, MemoryBlockStore, MemoryRingStore, MigrationExecutor, RingStore, RingWatcher,
};
use tokio::task::JoinHandle;

const PEERS: [&str; 4] = ["a", "b", "c", "d"];

struct Cluster {
    store: MemoryRingStore,
    blocks: Arc<MemoryBlockStore>,
    watchers: Vec<Arc<RingWatcher>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Cluster {
    async fn start(initial: Ring, keys: &[BlockKey]) -> Self {
        let store = MemoryRingStore::new(initial).unwrap();
        let ring = store.current_ring().await.unwrap();
        let blocks = Arc::new(MemoryBlockStore::new());
        for key in keys {
            for peer in ring.get_peers(key).unwrap().live() {
                blocks.put(peer.clone(), *key, Bytes::from(key.to_bytes().to_vec()));
            }
        }

        let mut watchers = Vec::new();
        let mut tasks = Vec::new();
        for peer in PEERS {
            let executor = MigrationExecutor::new(PeerId::from(peer), blocks.clone(), blocks.clone())
                .with_concurrency(2);
            let watcher = Arc::new(RingWatcher::new(ring.clone(), blocks.clone(), executor));
            let rx = store.subscribe();
            let w = watcher.clone();
            tasks.push(tokio::spawn(async move { w.run(rx).await }));
            watchers.push(watcher);
        }
        Self {
            store,
            blocks,
            watchers,
            tasks,
        }
    }

    async fn wait_settled(&self, version: u32) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.watchers.iter().any(|w| w.settled().version() < version) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("watchers did not settle");
    }

    async fn shutdown(self) {
        drop(self.store);
        for task in self.tasks {
            task.await.unwrap();
        }
    }
}

fn keys(n: u64) -> Vec<BlockKey> {
    (0..n).map(|i| BlockKey::data(11, i / 8, i % 8)).collect()
}

fn assert_placed(ring: &Ring, blocks: &MemoryBlockStore, keys: &[BlockKey]) {
    for key in keys {
        for peer in ring.get_peers(key).unwrap().live() {
            let data = blocks.get(peer, key);
            assert_eq!(
                data.as_deref(),
                Some(&key.to_bytes()[..]),
                "{key} not on {peer}"
            );
        }
    }
}

#[tokio::test]
async fn test_grow_then_shrink() {
    let initial = Ring::create(
        RingType::Ketama,
        1,
        2,
        PEERS[..3].iter().map(|id| PeerInfo::new(*id, 1)).collect(),
    )
    .unwrap();
    let keys = keys(300);
    let cluster = Cluster::start(initial, &keys).await;

    let grown = update_ring(&cluster.store, 3, |ring| {
        ring.as_mutation()
            .ok_or_else(|| corelib::Error::Invalid("immutable ring".into()))?
            .add_peers(&[PeerInfo::new("d", 1)], 2)
    })
    .await
    .unwrap();
    cluster.wait_settled(2).await;
    assert_placed(&grown, &cluster.blocks, &keys);

    let shrunk = update_ring(&cluster.store, 3, |ring| {
        ring.as_mutation()
            .ok_or_else(|| corelib::Error::Invalid("immutable ring".into()))?
            .remove_peers(&[PeerId::from("a")], 2)
    })
    .await
    .unwrap();
    cluster.wait_settled(3).await;
    assert_placed(&shrunk, &cluster.blocks, &keys);

    for w in &cluster.watchers {
        assert_eq!(w.read_view().version(), 3);
    }
    cluster.shutdown().await;
}
