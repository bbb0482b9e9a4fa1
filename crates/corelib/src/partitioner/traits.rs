//! Core partitioner trait definitions.

use crate::block::BlockKey;
use crate::token::Token;

/// A partitioner converts keys into tokens.
///
/// Partitioners are stateless and thread-safe, allowing concurrent
/// token generation without synchronization overhead. Every implementation
/// must be a pure function of the key's byte encoding.
pub trait Partitioner: Send + Sync + 'static {
    /// The token type produced by this partitioner.
    type TokenType: Token;

    /// Converts raw bytes into a token.
    fn partition(&self, key: &[u8]) -> Self::TokenType;

    /// Converts a block key into a token via its canonical encoding.
    fn partition_block(&self, key: &BlockKey) -> Self::TokenType {
        self.partition(&key.to_bytes())
    }
}
