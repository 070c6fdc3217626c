//! Simulation configuration.
//!
//! Mirrors the shape of `apollo_consensus::config::ConsensusConfig`, without
//! that crate's `apollo_config` dump/registration machinery — that crate is
//! internal to the workspace it comes from, so a plain `serde` struct with a
//! `Default` impl stands in for it here (see DESIGN.md).

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level knobs for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of participating nodes.
    pub node_count: u64,
    /// Target chain length; a run stops once a majority of nodes reach it.
    pub generate_blocks: u64,
    /// Hard cap on driver ticks, regardless of whether quorum was reached.
    pub max_loop_iterations: u64,
    /// Maximum Euclidean coordinate used when placing nodes.
    pub max_distance: f64,
    /// Percentage of sent messages dropped in transit, `[0, 100]`.
    pub lost_messages_percentage: f64,
    /// Scales the distance-derived connection delay.
    pub delay_multiplier: f64,
    /// Seed for the transport's deterministic RNG.
    pub rng_seed: u64,
    #[serde(flatten)]
    pub node: NodeConfig,
}

/// Per-node timing knobs, also exposed standalone so tests can construct a
/// [`crate::node::NodeTimings`] without the rest of [`SimulationConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Idle ticks before a node nominates a blank block for a stalled slot.
    pub blank_block_timeout: u64,
    /// Idle ticks before a node asks peers for a chain update.
    pub chain_update_timeout: u64,
    /// Keep superseded (non-forged) candidates around after forging instead
    /// of pruning them, trading memory for post-hoc inspectability.
    pub keep_excessive_messages: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            node_count: 4,
            generate_blocks: 10,
            max_loop_iterations: 10_000,
            max_distance: 100.0,
            lost_messages_percentage: 5.0,
            delay_multiplier: 1.0,
            rng_seed: 0,
            node: NodeConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { blank_block_timeout: 20, chain_update_timeout: 50, keep_excessive_messages: false }
    }
}

impl SimulationConfig {
    /// Load from a TOML file, falling back to [`Default`] if `path` does not
    /// point at a readable file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn node_timings(&self) -> crate::node::NodeTimings {
        crate::node::NodeTimings {
            keep_excessive_messages: self.node.keep_excessive_messages,
            blank_block_timeout: self.node.blank_block_timeout,
            chain_update_timeout: self.node.chain_update_timeout,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
