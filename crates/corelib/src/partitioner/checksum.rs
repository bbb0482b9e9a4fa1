//! Checksum partitioner used by modulo placement.

use crate::block::BlockKey;
use crate::partitioner::traits::Partitioner;
use crate::token::xxh3::Xxh3Token;

#[derive(Clone, Copy, Debug, Default)]
pub struct ChecksumPartitioner;

impl Partitioner for ChecksumPartitioner {
    type TokenType = Xxh3Token;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        Xxh3Token::from_bytes(key)
    }
}

/// Checksum of a block key's encoding, as used for modulo rotation.
pub fn block_checksum(key: &BlockKey) -> u64 {
    ChecksumPartitioner.partition_block(key).0
}
