//! Partitioner abstraction.
//!
//! Partitioners convert block keys into tokens: a checksum for modulo
//! rotation, a ring position for ketama.

pub mod checksum;
pub mod sip;
pub mod traits;

pub use checksum::{block_checksum, ChecksumPartitioner};
pub use sip::SipPartitioner;
pub use traits::Partitioner;
