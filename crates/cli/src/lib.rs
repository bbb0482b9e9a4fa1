//! `ringctl`: operator tool for placement rings.
//!
//! Provides commands for:
//! - Describing a ring built from a JSON configuration
//! - Looking up the placement of a block
//! - Encoding and decoding the ring wire format
//! - Simulating a membership change and its rebalance

pub mod commands;
pub mod config;

pub use commands::Command;
pub use config::{CliConfig, PeerConfig, RingConfig};
