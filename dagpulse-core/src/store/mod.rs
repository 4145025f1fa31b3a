//! In-memory state store.
//!
//! Holds the stats singleton, participants, blocks and the network hashrate
//! series behind `parking_lot` locks. Every accessor returns owned copies so
//! readers never observe a half-applied mutation.

mod search;
mod time_series;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

pub use time_series::TimeSeriesBuffer;

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::types::{
    BlockRecord, NetworkSummary, NewBlock, Participant, ParticipantSort, SearchResult,
    StatsSnapshot, StatsUpdate, TimeSeriesPoint,
};

/// Errors raised when mutating the store.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Participant already exists: {address}")]
    DuplicateParticipant { address: String },

    #[error("Block height {number} is above the current tip {tip}")]
    BlockAboveTip { number: u64, tip: u64 },

    #[error("Block height {number} already exists")]
    DuplicateBlock { number: u64 },
}

/// Participant record plus its bounded history.
#[derive(Debug, Clone)]
struct ParticipantEntry {
    record: Participant,
    history: TimeSeriesBuffer,
}

impl ParticipantEntry {
    fn snapshot(&self) -> Participant {
        let mut participant = self.record.clone();
        participant.hashrate_history = self.history.to_vec();
        participant
    }
}

#[derive(Debug)]
struct BlockLedger {
    blocks: BTreeMap<u64, BlockRecord>,
    tip: u64,
}

/// Single-writer, multi-reader holder of all dashboard entities.
pub struct NetworkStore {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    stats: RwLock<StatsSnapshot>,
    participants: RwLock<HashMap<String, ParticipantEntry>>,
    ledger: RwLock<BlockLedger>,
    network_history: RwLock<TimeSeriesBuffer>,
}

impl std::fmt::Debug for NetworkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let participants = self.participants.read().len();
        // single guard: parking_lot read locks are not reentrant
        let ledger = self.ledger.read();
        f.debug_struct("NetworkStore")
            .field("participants", &participants)
            .field("blocks", &ledger.blocks.len())
            .field("tip", &ledger.tip)
            .finish()
    }
}

impl NetworkStore {
    /// Creates an empty store around `initial_stats` using the system clock.
    ///
    /// The block counter starts at `initial_stats.block_height`; the first
    /// appended block receives the next height.
    pub fn new(config: StoreConfig, initial_stats: StatsSnapshot) -> Self {
        Self::with_clock(config, initial_stats, Arc::new(SystemClock))
    }

    /// Creates an empty store with an injected clock.
    pub fn with_clock(
        config: StoreConfig,
        initial_stats: StatsSnapshot,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tip = initial_stats.block_height;
        let network_history = TimeSeriesBuffer::with_capacity(config.network_history_capacity);
        Self {
            config,
            clock,
            stats: RwLock::new(initial_stats),
            participants: RwLock::new(HashMap::new()),
            ledger: RwLock::new(BlockLedger {
                blocks: BTreeMap::new(),
                tip,
            }),
            network_history: RwLock::new(network_history),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current time according to the store's clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    // --- Stats ---

    /// Returns a copy of the current snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.read().clone()
    }

    /// Merges `update` into the snapshot and stamps the current time.
    ///
    /// The timestamp never moves backwards even if the clock does.
    pub fn update_stats(&self, update: &StatsUpdate) -> StatsSnapshot {
        let now = self.clock.now_millis();
        let mut stats = self.stats.write();
        update.merge_into(&mut stats);
        stats.timestamp = stats.timestamp.max(now);
        stats.clone()
    }

    // --- Participants ---

    /// Adds a participant. Its history is truncated to the configured capacity.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateParticipant` - Address already present
    pub fn insert_participant(&self, mut participant: Participant) -> Result<(), StoreError> {
        let mut participants = self.participants.write();
        if participants.contains_key(&participant.address) {
            return Err(StoreError::DuplicateParticipant {
                address: participant.address,
            });
        }

        let mut history = TimeSeriesBuffer::with_capacity(self.config.participant_history_capacity);
        for point in participant.hashrate_history.drain(..) {
            history.push(point);
        }

        participants.insert(
            participant.address.clone(),
            ParticipantEntry {
                record: participant,
                history,
            },
        );
        Ok(())
    }

    /// Looks up a participant by exact address.
    pub fn participant(&self, address: &str) -> Option<Participant> {
        self.participants
            .read()
            .get(address)
            .map(ParticipantEntry::snapshot)
    }

    /// Lists all participants, descending by `sort`. Ties break on address.
    pub fn list_participants(&self, sort: ParticipantSort) -> Vec<Participant> {
        let mut participants: Vec<Participant> = self
            .participants
            .read()
            .values()
            .map(ParticipantEntry::snapshot)
            .collect();

        participants.sort_by(|a, b| {
            let ordering = match sort {
                ParticipantSort::Hashrate => b.current_hashrate.total_cmp(&a.current_hashrate),
                ParticipantSort::Blocks => b.total_blocks.cmp(&a.total_blocks),
                ParticipantSort::Rewards => b.total_rewards.cmp(&a.total_rewards),
            };
            ordering.then_with(|| a.address.cmp(&b.address))
        });
        participants
    }

    /// Returns the first `limit` participants by `sort`.
    pub fn top_participants(&self, limit: usize, sort: ParticipantSort) -> Vec<Participant> {
        let mut participants = self.list_participants(sort);
        participants.truncate(limit);
        participants
    }

    /// Returns all participant addresses in ascending order.
    pub fn participant_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.participants.read().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn participant_count(&self) -> usize {
        self.participants.read().len()
    }

    /// Recomputes every participant's share of the network hashrate.
    pub fn recompute_contributions(&self) {
        let network_hashrate = self.stats.read().network_hashrate;
        let mut participants = self.participants.write();
        for entry in participants.values_mut() {
            entry.record.network_contribution = if network_hashrate > 0.0 {
                entry.record.current_hashrate / network_hashrate * 100.0
            } else {
                0.0
            };
        }
    }

    /// Appends a point to one participant's history.
    ///
    /// Returns false when the address is unknown.
    pub fn push_participant_point(&self, address: &str, point: TimeSeriesPoint) -> bool {
        match self.participants.write().get_mut(address) {
            Some(entry) => {
                entry.history.push(point);
                true
            }
            None => false,
        }
    }

    /// Samples every participant's current hashrate into its history.
    pub fn sample_participant_histories(&self, timestamp: u64) {
        let mut participants = self.participants.write();
        for entry in participants.values_mut() {
            let point = TimeSeriesPoint::new(timestamp, entry.record.current_hashrate);
            entry.history.push(point);
        }
    }

    // --- Blocks ---

    /// Looks up a block by height.
    pub fn block(&self, number: u64) -> Option<BlockRecord> {
        self.ledger.read().blocks.get(&number).cloned()
    }

    /// Lists all blocks, highest first.
    pub fn list_blocks(&self) -> Vec<BlockRecord> {
        self.ledger.read().blocks.values().rev().cloned().collect()
    }

    /// Returns the `limit` highest blocks, highest first.
    pub fn recent_blocks(&self, limit: usize) -> Vec<BlockRecord> {
        self.ledger
            .read()
            .blocks
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Height most recently assigned.
    pub fn tip(&self) -> u64 {
        self.ledger.read().tip
    }

    /// Assigns the next height to `block` and stores it.
    pub fn append_block(&self, block: NewBlock) -> BlockRecord {
        let mut ledger = self.ledger.write();
        ledger.tip += 1;
        let record = block.into_record(ledger.tip);
        ledger.blocks.insert(record.number, record.clone());
        record
    }

    /// Stores a historical block at or below the current tip.
    ///
    /// # Errors
    ///
    /// - `StoreError::BlockAboveTip` - Height would break append ordering
    /// - `StoreError::DuplicateBlock` - Height already present
    pub fn insert_seed_block(&self, block: BlockRecord) -> Result<(), StoreError> {
        let mut ledger = self.ledger.write();
        if block.number > ledger.tip {
            return Err(StoreError::BlockAboveTip {
                number: block.number,
                tip: ledger.tip,
            });
        }
        if ledger.blocks.contains_key(&block.number) {
            return Err(StoreError::DuplicateBlock {
                number: block.number,
            });
        }
        ledger.blocks.insert(block.number, block);
        Ok(())
    }

    // --- Network time series ---

    /// Appends a network hashrate point, evicting the oldest when full.
    pub fn push_time_series_point(&self, point: TimeSeriesPoint) {
        self.network_history.write().push(point);
    }

    /// Returns the newest `limit` network points, oldest first.
    pub fn time_series(&self, limit: usize) -> Vec<TimeSeriesPoint> {
        self.network_history.read().latest(limit)
    }

    pub fn time_series_len(&self) -> usize {
        self.network_history.read().len()
    }

    // --- Derived views ---

    /// Finds participants by address or a block by height.
    ///
    /// Tokens starting with `0x` match addresses: the exact address first,
    /// then case-insensitive substring matches. Numeric tokens match a block
    /// height exactly. Results are capped at the configured limit.
    pub fn search(&self, token: &str) -> Vec<SearchResult> {
        let participants = self.participants.read();
        let ledger = self.ledger.read();
        search::run(
            token,
            &participants,
            &ledger.blocks,
            self.config.search_result_limit,
        )
    }

    /// Aggregates over all participants.
    pub fn network_summary(&self) -> NetworkSummary {
        let participants = self.participants.read();
        let miner_count = participants.len();
        let total_hashrate: f64 = participants
            .values()
            .map(|entry| entry.record.current_hashrate)
            .sum();
        let total_luck: f64 = participants
            .values()
            .map(|entry| entry.record.current_luck)
            .sum();
        let total_blocks = participants
            .values()
            .map(|entry| entry.record.total_blocks)
            .sum();

        let (average_hashrate, average_luck) = if miner_count == 0 {
            (0.0, 0.0)
        } else {
            (
                total_hashrate / miner_count as f64,
                total_luck / miner_count as f64,
            )
        };

        NetworkSummary {
            miner_count,
            total_hashrate,
            average_hashrate,
            average_luck,
            total_blocks,
        }
    }
}
