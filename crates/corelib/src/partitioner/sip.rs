//! SipHash partitioner, used to position keys and virtual nodes on the ketama ring.

use crate::partitioner::traits::Partitioner;
use crate::token::sip::SipToken;

#[derive(Clone, Copy, Debug, Default)]
pub struct SipPartitioner;

impl Partitioner for SipPartitioner {
    type TokenType = SipToken;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        SipToken::from_bytes(key)
    }
}
