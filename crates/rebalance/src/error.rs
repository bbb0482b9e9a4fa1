//! Error types for rebalance planning.

use corelib::BlockKey;

/// Errors that abort a planning pass.
///
/// A failed pass produces no partial plan; it is safe to retry from scratch
/// once the ring pair is valid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebalanceError {
    /// One of the rings could not place a resident block.
    #[error("{ring} ring cannot place block {block}: {source}")]
    Placement {
        /// Which side of the transition failed, `"old"` or `"new"`.
        ring: &'static str,
        block: BlockKey,
        #[source]
        source: corelib::Error,
    },
}

/// Result type alias for rebalance planning.
pub type Result<T> = std::result::Result<T, RebalanceError>;
