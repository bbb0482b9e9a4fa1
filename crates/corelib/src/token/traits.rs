//! Core token trait definitions.

use std::fmt::Debug;
use std::hash::Hash;

/// A position in a 64-bit hash space, as produced by a [`Partitioner`].
///
/// Tokens are immutable, totally ordered values. Implementations must be
/// thread-safe and cheap to compare and hash, since ring lookups do a binary
/// search over them.
///
/// [`Partitioner`]: crate::partitioner::Partitioner
pub trait Token: Copy + Ord + Hash + Send + Sync + Debug + 'static {}
