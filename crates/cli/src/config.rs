//! Command-line flags and the JSON ring configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use corelib::{PeerInfo, Ring, RingType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::Command;

#[derive(Debug, Parser)]
#[command(name = "ringctl", version, about = "Inspect placement rings and simulate rebalances")]
pub struct CliConfig {
    /// Path to the JSON ring configuration.
    #[arg(short, long, global = true, env = "RINGCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Loads the ring configuration if one was given and runs the command.
    pub fn run(&self) -> Result<String> {
        let ring = self
            .config
            .as_deref()
            .map(RingConfig::load)
            .transpose()?;
        self.command.execute(ring.as_ref())
    }
}

/// One ring member in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: String,
    #[serde(default = "default_weight")]
    pub weight: u64,
}

/// Ring configuration, e.g.
///
/// ```json
/// { "type": "ketama", "version": 1, "replication": 2,
///   "peers": [{ "id": "peer-a", "weight": 4 }, { "id": "peer-b" }] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingConfig {
    #[serde(rename = "type")]
    pub ring_type: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_replication")]
    pub replication: usize,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

fn default_weight() -> u64 {
    1
}

fn default_version() -> u32 {
    1
}

fn default_replication() -> usize {
    1
}

impl RingConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read ring config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("failed to parse ring config {}", path.display()))?;
        debug!(path = %path.display(), ring_type = %config.ring_type, peers = config.peers.len(), "loaded ring config");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn ring_type(&self) -> Result<RingType> {
        Ok(self.ring_type.parse::<RingType>()?)
    }

    /// Builds the configured ring.
    pub fn build(&self) -> Result<Ring> {
        let peers = self
            .peers
            .iter()
            .map(|p| PeerInfo::new(p.id.as_str(), p.weight))
            .collect();
        let ring = Ring::create(self.ring_type()?, self.version, self.replication, peers)
            .context("invalid ring configuration")?;
        Ok(ring)
    }
}
