//! Error types for ring distribution and block migration.

use corelib::{BlockKey, PeerId};
use rebalance::RebalanceError;

/// Errors raised by the ring store, the transfer seams and the watcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamingError {
    /// A ring could not be built, encoded or decoded.
    #[error(transparent)]
    Ring(#[from] corelib::Error),

    /// Planning the transition failed.
    #[error(transparent)]
    Rebalance(#[from] RebalanceError),

    /// Compare-and-swap on the ring version lost.
    #[error("stale ring version {proposed}: store is at {current}")]
    StaleVersion { current: u32, proposed: u32 },

    /// `update_ring` kept losing the compare-and-swap.
    #[error("ring update still conflicting after {attempts} attempts")]
    Contended { attempts: usize },

    /// The transport could not deliver a block.
    #[error("failed to send {block} to {peer}: {reason}")]
    Transfer {
        peer: PeerId,
        block: BlockKey,
        reason: String,
    },

    #[error("block {block} not found on {peer}")]
    BlockNotFound { peer: PeerId, block: BlockKey },

    /// The ring change channel has no more senders.
    #[error("ring subscription closed")]
    Closed,
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, StreamingError>;
