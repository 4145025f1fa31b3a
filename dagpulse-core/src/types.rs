//! Domain entities shared by the store, the simulation loop, the API and the
//! push channel.
//!
//! All timestamps are milliseconds since the Unix epoch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network-wide gauges. One logical singleton, replaced wholesale on every
/// mutation tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Number of participants currently reporting
    pub miners_online: u32,
    /// Luck ratio in percent (100 = exactly as expected)
    pub current_luck: f64,
    /// Aggregate hashrate of the pool in H/s
    pub pool_hashrate: f64,
    /// Network-wide hashrate in H/s
    pub network_hashrate: f64,
    /// Height of the most recent block
    pub block_height: u64,
    /// Current difficulty gauge
    pub block_difficulty: f64,
    /// Hashing algorithm label
    pub algorithm: String,
    /// Payout interval in seconds
    pub payout_interval: u64,
    /// Reward paid per block
    pub block_reward: f64,
    /// Token price gauge
    pub price: f64,
    /// When this snapshot was produced
    pub timestamp: u64,
}

/// Partial stats update. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsUpdate {
    pub miners_online: Option<u32>,
    pub current_luck: Option<f64>,
    pub pool_hashrate: Option<f64>,
    pub network_hashrate: Option<f64>,
    pub block_height: Option<u64>,
    pub block_difficulty: Option<f64>,
    pub price: Option<f64>,
}

impl StatsUpdate {
    /// Builds an update carrying every mutable gauge of `snapshot`.
    pub fn from_snapshot(snapshot: &StatsSnapshot) -> Self {
        Self {
            miners_online: Some(snapshot.miners_online),
            current_luck: Some(snapshot.current_luck),
            pool_hashrate: Some(snapshot.pool_hashrate),
            network_hashrate: Some(snapshot.network_hashrate),
            block_height: Some(snapshot.block_height),
            block_difficulty: Some(snapshot.block_difficulty),
            price: Some(snapshot.price),
        }
    }

    /// Merges the present fields into `stats`. Does not touch the timestamp.
    pub fn merge_into(&self, stats: &mut StatsSnapshot) {
        if let Some(value) = self.miners_online {
            stats.miners_online = value;
        }
        if let Some(value) = self.current_luck {
            stats.current_luck = value;
        }
        if let Some(value) = self.pool_hashrate {
            stats.pool_hashrate = value;
        }
        if let Some(value) = self.network_hashrate {
            stats.network_hashrate = value;
        }
        if let Some(value) = self.block_height {
            stats.block_height = value;
        }
        if let Some(value) = self.block_difficulty {
            stats.block_difficulty = value;
        }
        if let Some(value) = self.price {
            stats.price = value;
        }
    }
}

/// Single hashrate sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub timestamp: u64,
    pub hashrate: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: u64, hashrate: f64) -> Self {
        Self {
            timestamp,
            hashrate,
        }
    }
}

/// Reporting state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubUnitStatus {
    Online,
    Offline,
    Idle,
}

/// Worker owned by exactly one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubUnit {
    pub id: String,
    pub name: String,
    pub hashrate: f64,
    pub shares: u64,
    pub last_seen: u64,
    pub status: SubUnitStatus,
}

/// Address-identified miner with aggregated counters and its workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub address: String,
    pub total_blocks: u64,
    pub total_rewards: u64,
    pub current_hashrate: f64,
    pub average_hashrate_24h: f64,
    pub current_luck: f64,
    /// Share of the network hashrate in percent
    pub network_contribution: f64,
    pub workers: Vec<SubUnit>,
    pub hashrate_history: Vec<TimeSeriesPoint>,
    pub last_active: u64,
}

/// Immutable block entry, ordered by height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub number: u64,
    pub hash: String,
    pub timestamp: u64,
    pub difficulty: f64,
    pub reward: f64,
    pub miner_address: String,
    pub confirmations: u32,
    pub size: u64,
    pub transactions: u32,
}

/// Block contents before the store assigns a height.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlock {
    pub hash: String,
    pub timestamp: u64,
    pub difficulty: f64,
    pub reward: f64,
    pub miner_address: String,
    pub confirmations: u32,
    pub size: u64,
    pub transactions: u32,
}

impl NewBlock {
    /// Attaches a height, producing the stored record.
    pub fn into_record(self, number: u64) -> BlockRecord {
        BlockRecord {
            number,
            hash: self.hash,
            timestamp: self.timestamp,
            difficulty: self.difficulty,
            reward: self.reward,
            miner_address: self.miner_address,
            confirmations: self.confirmations,
            size: self.size,
            transactions: self.transactions,
        }
    }
}

/// Tagged search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SearchResult {
    Miner(Participant),
    Block(BlockRecord),
}

/// Ordering key for participant listings. Always descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantSort {
    #[default]
    Hashrate,
    Blocks,
    Rewards,
}

impl FromStr for ParticipantSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hashrate" => Ok(Self::Hashrate),
            "blocks" => Ok(Self::Blocks),
            "rewards" => Ok(Self::Rewards),
            _ => Err(format!(
                "Invalid sort key: '{s}'. Valid options are: hashrate, blocks, rewards"
            )),
        }
    }
}

impl fmt::Display for ParticipantSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashrate => write!(f, "hashrate"),
            Self::Blocks => write!(f, "blocks"),
            Self::Rewards => write!(f, "rewards"),
        }
    }
}

/// Aggregates over the participant set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub miner_count: usize,
    pub total_hashrate: f64,
    pub average_hashrate: f64,
    pub average_luck: f64,
    pub total_blocks: u64,
}
