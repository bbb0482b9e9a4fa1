//! Ring wire format.
//!
//! Any ring encodes to a single [`RingRecord`], serialized with bincode
//! (fixed-width little-endian integers). Union rings carry no peers of their
//! own; their two sub-rings are nested, fully encoded records under the
//! `"old"` and `"new"` attributes and decode through the same dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::peer::{PeerId, PeerInfo};
use crate::ring::{
    EmptyRing, KetamaRing, ModuloRing, Placement, Ring, RingType, SingleRing, UnionRing,
};

/// Attribute holding a union's pre-migration ring.
pub const ATTR_OLD: &str = "old";
/// Attribute holding a union's post-migration ring.
pub const ATTR_NEW: &str = "new";

/// Largest record accepted by [`Ring::unmarshal`].
const MAX_RECORD_BYTES: u64 = 64 * 1024 * 1024;
/// Deepest union nesting accepted by [`Ring::unmarshal`].
const MAX_NESTING: usize = 16;

/// Persisted form of a ring.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingRecord {
    pub ring_type: u32,
    pub version: u32,
    /// Ignored for empty and union rings.
    pub replication_factor: u32,
    /// Bare identifiers, used by modulo rings.
    pub uuids: Vec<PeerId>,
    /// Identifiers with weights, used by single and ketama rings.
    pub peers: Vec<PeerInfo>,
    pub attrs: BTreeMap<String, Vec<u8>>,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_RECORD_BYTES)
}

fn replication_u32(replication: usize) -> Result<u32> {
    u32::try_from(replication)
        .map_err(|_| Error::Invalid(format!("replication factor {replication} does not fit the wire format")))
}

impl RingRecord {
    pub fn from_ring(ring: &Ring) -> Result<Self> {
        let mut record = RingRecord {
            ring_type: ring.ring_type() as u32,
            version: ring.version(),
            ..Default::default()
        };
        match ring {
            Ring::Empty(_) => {}
            Ring::Single(r) => {
                record.replication_factor = 1;
                record.peers = vec![r.peer().clone()];
            }
            Ring::Modulo(r) => {
                record.replication_factor = replication_u32(r.replication())?;
                record.uuids = r.peers().to_vec();
            }
            Ring::Ketama(r) => {
                record.replication_factor = replication_u32(r.replication())?;
                record.peers = r.peers().to_vec();
            }
            Ring::Union(r) => {
                record.attrs.insert(ATTR_OLD.to_string(), r.old().marshal()?);
                record.attrs.insert(ATTR_NEW.to_string(), r.new_ring().marshal()?);
            }
        }
        Ok(record)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        codec()
            .serialize(self)
            .map_err(|e| Error::Invalid(format!("encode ring record: {e}")))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec()
            .deserialize(bytes)
            .map_err(|e| Error::Invalid(format!("decode ring record: {e}")))
    }

    /// Rebuilds the ring, dispatching on `ring_type`.
    pub fn into_ring(self) -> Result<Ring> {
        self.into_ring_at(0)
    }

    fn into_ring_at(mut self, depth: usize) -> Result<Ring> {
        let ring_type = RingType::try_from(self.ring_type)?;
        let replication = self.replication_factor as usize;
        match ring_type {
            RingType::Empty => {
                if !self.peers.is_empty() || !self.uuids.is_empty() {
                    return Err(Error::invalid("empty ring record lists peers"));
                }
                Ok(Ring::Empty(EmptyRing::new(self.version)))
            }
            RingType::Single => {
                if self.peers.len() != 1 {
                    return Err(Error::Invalid(format!(
                        "single ring record needs one peer, has {}",
                        self.peers.len()
                    )));
                }
                let peer = self.peers.remove(0);
                Ok(Ring::Single(SingleRing::new(self.version, peer)))
            }
            RingType::Modulo => Ok(Ring::Modulo(ModuloRing::new(
                self.version,
                replication,
                self.uuids,
            )?)),
            RingType::Ketama => Ok(Ring::Ketama(KetamaRing::new(
                self.version,
                replication,
                self.peers,
            )?)),
            RingType::Union => {
                if depth >= MAX_NESTING {
                    return Err(Error::invalid("union rings nested too deeply"));
                }
                let mut sub = |name: &str| -> Result<Ring> {
                    let bytes = self
                        .attrs
                        .remove(name)
                        .ok_or_else(|| Error::Invalid(format!("union ring record missing {name:?}")))?;
                    RingRecord::decode(&bytes)?.into_ring_at(depth + 1)
                };
                let old = sub(ATTR_OLD)?;
                let new = sub(ATTR_NEW)?;
                if new.version() != self.version {
                    return Err(Error::Invalid(format!(
                        "union version {} does not match new ring version {}",
                        self.version,
                        new.version()
                    )));
                }
                Ok(Ring::Union(UnionRing::new(Arc::new(old), Arc::new(new))))
            }
        }
    }
}

impl Ring {
    /// Encodes the ring for persistence or broadcast.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        RingRecord::from_ring(self)?.encode()
    }

    /// Decodes a ring produced by [`Ring::marshal`].
    pub fn unmarshal(bytes: &[u8]) -> Result<Ring> {
        RingRecord::decode(bytes)?.into_ring()
    }
}
