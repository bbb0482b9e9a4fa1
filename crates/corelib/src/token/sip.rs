//! SipHash-1-3 token implementation.

use crate::token::traits::Token;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Hash ring token using a u64 representation.
///
/// Produced by SipHash-1-3 with the all-zero key. The key is fixed so every
/// cluster member places virtual nodes and blocks at identical positions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SipToken(pub u64);

impl Token for SipToken {}

impl SipToken {
    /// Creates a token from a byte slice.
    ///
    /// Feeds the raw bytes with `Hasher::write` rather than `Hash::hash`,
    /// which would mix in a platform-width length prefix.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = SipHasher13::new();
        hasher.write(data);
        SipToken(hasher.finish())
    }

    /// Creates a token from a string key.
    pub fn from_key(key: &str) -> Self {
        Self::from_bytes(key.as_bytes())
    }
}
