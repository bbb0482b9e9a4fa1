//! Ring distribution and block migration.
//!
//! This crate connects placement rings to a running cluster:
//! - A versioned ring store with compare-and-swap publishing and fan-out
//! - Traits for reading and sending block contents
//! - An executor that runs the local share of a rebalance plan
//! - A watcher that moves a member from one ring to the next

pub mod error;
pub mod migration;
pub mod store;
pub mod transfer;
pub mod watcher;

pub use error::{Result, StreamingError};
pub use migration::{MigrationExecutor, MigrationReport};
pub use store::{recv_ring, update_ring, MemoryRingStore, RingStore};
pub use transfer::{BlockSender, BlockSource, MemoryBlockStore, StateProvider};
pub use watcher::RingWatcher;
