//! Rebalance planning for placement ring transitions.
//!
//! This crate decides what has to move when a cluster goes from one ring to
//! another:
//! - Which resident copies stay where they are
//! - Which peer sends each copy a new replica is missing
//! - Which blocks the plan cannot fully cover
//!
//! Planning is pure: it reads the two rings and a [`ClusterState`] snapshot
//! and returns a new state plus the transfers that produce it.

pub mod error;
pub mod planner;
pub mod state;

pub use error::{RebalanceError, Result};
pub use planner::{rebalance, RebalancePlan, RebalanceStats, Rebalancer, Transfer};
pub use state::ClusterState;
