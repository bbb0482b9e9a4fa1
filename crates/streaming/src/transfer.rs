//! Block transfer seams.
//!
//! The executor reads a block from the local peer through [`BlockSource`] and
//! hands it to [`BlockSender`]. The byte-level transport behind these traits
//! lives outside this crate; [`MemoryBlockStore`] stands in for a whole
//! cluster's block storage in tests and simulations.

use bytes::Bytes;
use corelib::{BlockKey, PeerId};
use dashmap::DashMap;
use rebalance::ClusterState;
use tracing::trace;

use crate::error::{Result, StreamingError};

/// Delivers a block to a peer.
#[async_trait::async_trait]
pub trait BlockSender: Send + Sync {
    async fn send_block(&self, peer: &PeerId, key: BlockKey, data: Bytes) -> Result<()>;
}

/// Reads a block held by a peer.
#[async_trait::async_trait]
pub trait BlockSource: Send + Sync {
    async fn read_block(&self, peer: &PeerId, key: BlockKey) -> Result<Bytes>;
}

/// Produces the residency snapshot a planning pass runs against.
#[async_trait::async_trait]
pub trait StateProvider: Send + Sync {
    async fn cluster_state(&self) -> Result<ClusterState>;
}

/// Block contents for every peer, keyed by `(peer, block)`.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: DashMap<(PeerId, BlockKey), Bytes>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, peer: PeerId, key: BlockKey, data: Bytes) {
        self.blocks.insert((peer, key), data);
    }

    pub fn get(&self, peer: &PeerId, key: &BlockKey) -> Option<Bytes> {
        self.blocks
            .get(&(peer.clone(), *key))
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, peer: &PeerId, key: &BlockKey) -> bool {
        self.blocks.contains_key(&(peer.clone(), *key))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Current residency of every stored block.
    pub fn snapshot(&self) -> ClusterState {
        self.blocks.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait::async_trait]
impl BlockSender for MemoryBlockStore {
    async fn send_block(&self, peer: &PeerId, key: BlockKey, data: Bytes) -> Result<()> {
        trace!(%peer, block = %key, size = data.len(), "stored transferred block");
        self.put(peer.clone(), key, data);
        Ok(())
    }
}

#[async_trait::async_trait]
impl BlockSource for MemoryBlockStore {
    async fn read_block(&self, peer: &PeerId, key: BlockKey) -> Result<Bytes> {
        self.get(peer, &key).ok_or_else(|| StreamingError::BlockNotFound {
            peer: peer.clone(),
            block: key,
        })
    }
}

#[async_trait::async_trait]
impl StateProvider for MemoryBlockStore {
    async fn cluster_state(&self) -> Result<ClusterState> {
        Ok(self.snapshot())
    }
}
