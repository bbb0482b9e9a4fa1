//! XXH3 checksum token implementation.

use crate::token::traits::Token;
use xxhash_rust::xxh3::xxh3_64;

/// Well-distributed 64-bit checksum of a key, used by modulo placement.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Xxh3Token(pub u64);

impl Token for Xxh3Token {}

impl Xxh3Token {
    pub fn from_bytes(data: &[u8]) -> Self {
        Xxh3Token(xxh3_64(data))
    }
}
