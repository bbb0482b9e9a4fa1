//! `ringctl` subcommands.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use corelib::{
    block_checksum, BlockKey, BlockType, PeerId, PeerInfo, Placement, Ring, RingMutation,
};
use rebalance::{ClusterState, Rebalancer};
use tracing::info;

use crate::config::RingConfig;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the configured ring.
    Describe,

    /// Show where a block is placed.
    Place {
        #[arg(long)]
        volume: u64,
        #[arg(long)]
        inode: u64,
        #[arg(long)]
        index: u64,
        /// Place the inode metadata block instead of a data block.
        #[arg(long)]
        inode_block: bool,
    },

    /// Write the configured ring in wire format.
    Encode {
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Decode a wire-format ring and print it.
    Decode { file: PathBuf },

    /// Apply a membership change to the configured ring and plan the rebalance.
    Simulate {
        /// Peer to add, `ID` or `ID:WEIGHT`. Repeatable.
        #[arg(long)]
        add: Vec<String>,
        /// Peer to remove. Repeatable.
        #[arg(long)]
        remove: Vec<String>,
        /// Replication factor of the resulting ring.
        #[arg(long)]
        replication: Option<usize>,
        /// Number of synthetic blocks to place.
        #[arg(long, default_value = "1000")]
        blocks: u64,
    },
}

impl Command {
    /// Runs the command and returns what it prints.
    pub fn execute(&self, config: Option<&RingConfig>) -> Result<String> {
        match self {
            Command::Describe => Ok(require(config)?.build()?.describe()),
            Command::Place {
                volume,
                inode,
                index,
                inode_block,
            } => {
                let block_type = if *inode_block {
                    BlockType::INode
                } else {
                    BlockType::Data
                };
                let key = BlockKey::new(*volume, *inode, *index, block_type);
                place(&require(config)?.build()?, &key)
            }
            Command::Encode { out } => {
                let ring = require(config)?.build()?;
                let bytes = ring.marshal()?;
                fs::write(out, &bytes)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                info!(path = %out.display(), bytes = bytes.len(), "encoded ring");
                Ok(format!(
                    "wrote {} ring version {} ({} bytes) to {}\n",
                    ring.ring_type(),
                    ring.version(),
                    bytes.len(),
                    out.display()
                ))
            }
            Command::Decode { file } => {
                let bytes =
                    fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
                let ring = Ring::unmarshal(&bytes)
                    .with_context(|| format!("{} is not a valid ring", file.display()))?;
                Ok(ring.describe())
            }
            Command::Simulate {
                add,
                remove,
                replication,
                blocks,
            } => {
                let config = require(config)?;
                let replication = replication.unwrap_or(config.replication);
                simulate(&config.build()?, add, remove, replication, *blocks)
            }
        }
    }
}

fn require(config: Option<&RingConfig>) -> Result<&RingConfig> {
    config.ok_or_else(|| anyhow!("no ring configuration given (use --config or RINGCTL_CONFIG)"))
}

fn mutation(ring: &Ring) -> Result<&dyn RingMutation> {
    ring.as_mutation()
        .ok_or_else(|| anyhow!("{} rings do not support membership changes", ring.ring_type()))
}

fn parse_peer(spec: &str) -> Result<PeerInfo> {
    match spec.split_once(':') {
        Some((id, weight)) => {
            let weight = weight
                .parse()
                .with_context(|| format!("bad weight in peer {spec:?}"))?;
            Ok(PeerInfo::new(id, weight))
        }
        None => Ok(PeerInfo::new(spec, 1)),
    }
}

fn place(ring: &Ring, key: &BlockKey) -> Result<String> {
    let perm = ring.get_peers(key)?;
    let names = |peers: &[PeerId]| {
        peers
            .iter()
            .map(PeerId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = String::new();
    writeln!(out, "block: {key}")?;
    writeln!(out, "checksum: {:016x}", block_checksum(key))?;
    writeln!(out, "live: {}", names(perm.live()))?;
    writeln!(out, "fallback: {}", names(&perm.peers[perm.replication..]))?;
    Ok(out)
}

fn simulate(
    old: &Ring,
    add: &[String],
    remove: &[String],
    replication: usize,
    blocks: u64,
) -> Result<String> {
    let mut new = old.clone();
    if !add.is_empty() {
        let peers = add.iter().map(|s| parse_peer(s)).collect::<Result<Vec<_>>>()?;
        new = mutation(&new)?.add_peers(&peers, replication)?;
    }
    if !remove.is_empty() {
        let ids: Vec<PeerId> = remove.iter().map(|s| PeerId::from(s.as_str())).collect();
        new = mutation(&new)?.remove_peers(&ids, replication)?;
    }
    if add.is_empty() && remove.is_empty() {
        new = mutation(&new)?.change_replication(replication)?;
    }

    let keys: Vec<BlockKey> = (0..blocks).map(|i| BlockKey::data(1, i / 64, i % 64)).collect();
    let state = ClusterState::from_ring(old, &keys)?;
    let plan = Rebalancer::new(old, &new).plan(&state)?;

    let mut inbound: BTreeMap<&PeerId, usize> = BTreeMap::new();
    for t in &plan.transfers {
        *inbound.entry(&t.to).or_default() += 1;
    }

    let mut out = new.describe();
    writeln!(out)?;
    writeln!(out, "blocks: {blocks}")?;
    writeln!(out, "resident copies: {}", state.resident_count())?;
    writeln!(out, "kept: {}", plan.stats.blocks_kept)?;
    writeln!(out, "moved: {}", plan.stats.blocks_moved)?;
    writeln!(out, "under-replicated: {}", plan.under_replicated.len())?;
    for (peer, count) in inbound {
        writeln!(out, "  -> {peer}: {count}")?;
    }
    Ok(out)
}
