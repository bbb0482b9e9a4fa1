//! Core library for block placement.
//!
//! This crate provides the fundamental abstractions for deciding which
//! cluster members hold each block:
//! - Peer and block identifiers
//! - Token types and partitioners (key hashing)
//! - Virtual nodes for weighted consistent hashing
//! - Placement rings (empty, single, modulo, ketama, union)
//! - Ring mutation and the ring wire format
//!
//! Every member that holds the same ring value computes the same placement
//! for a block without talking to anyone else.

pub mod block;
pub mod error;
pub mod partitioner;
pub mod peer;
pub mod ring;
pub mod token;
pub mod vnode;

pub use block::{BlockKey, BlockType};
pub use error::{Error, Result};
pub use partitioner::{block_checksum, Partitioner};
pub use peer::{PeerId, PeerInfo, PeerPermutation};
pub use ring::{Placement, Ring, RingMutation, RingRecord, RingType};
pub use token::Token;
pub use vnode::VirtualNode;
