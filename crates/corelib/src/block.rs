//! Block identifiers hashed for placement.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of [`BlockKey::to_bytes`].
pub const BLOCK_KEY_LEN: usize = 25;

/// Distinguishes data blocks from inode-metadata blocks sharing an index space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    Data = 1,
    INode = 2,
}

impl TryFrom<u8> for BlockType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(BlockType::Data),
            2 => Ok(BlockType::INode),
            other => Err(Error::Invalid(format!("unknown block type tag {other}"))),
        }
    }
}

/// Identifier of one stored block: volume, inode, block index and type.
///
/// Placement is a pure function of [`BlockKey::to_bytes`], so the layout is
/// fixed: big-endian `volume ‖ inode ‖ index ‖ type`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct BlockKey {
    pub volume: u64,
    pub inode: u64,
    pub index: u64,
    pub block_type: BlockType,
}

impl BlockKey {
    pub fn new(volume: u64, inode: u64, index: u64, block_type: BlockType) -> Self {
        Self {
            volume,
            inode,
            index,
            block_type,
        }
    }

    /// Shorthand for a data block.
    pub fn data(volume: u64, inode: u64, index: u64) -> Self {
        Self::new(volume, inode, index, BlockType::Data)
    }

    pub fn to_bytes(&self) -> [u8; BLOCK_KEY_LEN] {
        let mut buf = [0u8; BLOCK_KEY_LEN];
        buf[0..8].copy_from_slice(&self.volume.to_be_bytes());
        buf[8..16].copy_from_slice(&self.inode.to_be_bytes());
        buf[16..24].copy_from_slice(&self.index.to_be_bytes());
        buf[24] = self.block_type as u8;
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BLOCK_KEY_LEN {
            return Err(Error::Invalid(format!(
                "block key must be {BLOCK_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let word = |at: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[at..at + 8]);
            u64::from_be_bytes(b)
        };
        Ok(Self {
            volume: word(0),
            inode: word(8),
            index: word(16),
            block_type: BlockType::try_from(bytes[24])?,
        })
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.block_type {
            BlockType::Data => "data",
            BlockType::INode => "inode",
        };
        write!(f, "{}:{}:{}/{}", self.volume, self.inode, self.index, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_layout() {
        let key = BlockKey::new(1, 2, 3, BlockType::INode);
        let bytes = key.to_bytes();
        assert_eq!(bytes[7], 1);
        assert_eq!(bytes[15], 2);
        assert_eq!(bytes[23], 3);
        assert_eq!(bytes[24], 2);
        assert_eq!(BlockKey::from_bytes(&bytes).unwrap(), key);
    }

    #[test]
    fn test_type_distinguishes_keys() {
        let data = BlockKey::new(1, 2, 3, BlockType::Data);
        let inode = BlockKey::new(1, 2, 3, BlockType::INode);
        assert_ne!(data, inode);
        assert_ne!(data.to_bytes(), inode.to_bytes());
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(BlockKey::from_bytes(&[0u8; 3]), Err(Error::Invalid(_))));

        let mut bytes = BlockKey::data(1, 1, 1).to_bytes();
        bytes[24] = 9;
        assert!(matches!(BlockKey::from_bytes(&bytes), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(BlockKey::data(4, 5, 6).to_string(), "4:5:6/data");
    }
}
