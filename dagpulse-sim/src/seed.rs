//! Initial network state.
//!
//! Builds a plausible starting point so the dashboard has something to show
//! before the first tick: randomized stats, a set of participants with
//! workers and a day of hourly history, a run of historical blocks below the
//! starting height, and half an hour of network samples.

use std::sync::Arc;

use dagpulse_core::clock::Clock;
use dagpulse_core::config::StoreConfig;
use dagpulse_core::store::NetworkStore;
use dagpulse_core::types::{
    BlockRecord, Participant, StatsSnapshot, SubUnit, SubUnitStatus, TimeSeriesPoint,
};

use crate::SimulationError;
use crate::random::RandomSource;

const MINUTE_MILLIS: u64 = 60_000;
const HOUR_MILLIS: u64 = 3_600_000;
const BLOCK_SPACING_MILLIS: u64 = 120_000;
const PARTICIPANT_HISTORY_HOURS: u64 = 24;

pub(crate) const ALGORITHM: &str = "Scrypt";
pub(crate) const PAYOUT_INTERVAL_SECS: u64 = 3600;
pub(crate) const BLOCK_REWARD: f64 = 50.0;

/// Creates a store populated with seeded data.
///
/// # Errors
///
/// - `SimulationError::Store` - Two generated participants collided on address
pub fn seed_store(
    config: &StoreConfig,
    rng: &mut dyn RandomSource,
    clock: Arc<dyn Clock>,
) -> Result<NetworkStore, SimulationError> {
    let now = clock.now_millis();
    let stats = initial_stats(config.genesis_height, now, rng);
    let store = NetworkStore::with_clock(config.clone(), stats.clone(), clock);

    for _ in 0..config.seed_participants {
        store.insert_participant(seed_participant(now, rng))?;
    }
    store.recompute_contributions();

    let addresses = store.participant_addresses();
    for offset in 0..config.seed_blocks as u64 {
        let Some(number) = config.genesis_height.checked_sub(offset) else {
            break;
        };
        let Some(index) = rng.choose_index(addresses.len()) else {
            break;
        };
        store.insert_seed_block(BlockRecord {
            number,
            hash: block_hash(rng),
            timestamp: now.saturating_sub(offset * BLOCK_SPACING_MILLIS),
            difficulty: stats.block_difficulty * rng.range_f64(0.9, 1.1),
            reward: stats.block_reward,
            miner_address: addresses[index].clone(),
            confirmations: u32::try_from(offset + 1).unwrap_or(u32::MAX),
            size: rng.range_u64(100_000, 600_000),
            transactions: rng.range_u64(10, 210) as u32,
        })?;
    }

    let points = config.seed_history_points as u64;
    for i in 0..points {
        let timestamp = now.saturating_sub((points - i) * MINUTE_MILLIS);
        let hashrate = stats.pool_hashrate * rng.range_f64(0.8, 1.2);
        store.push_time_series_point(TimeSeriesPoint::new(timestamp, hashrate));
    }

    tracing::debug!(
        participants = store.participant_count(),
        blocks = store.list_blocks().len(),
        history = store.time_series_len(),
        "Seeded network state"
    );

    Ok(store)
}

fn initial_stats(height: u64, now: u64, rng: &mut dyn RandomSource) -> StatsSnapshot {
    StatsSnapshot {
        miners_online: rng.range_u64(150, 200) as u32,
        current_luck: rng.range_f64(95.0, 105.0),
        pool_hashrate: rng.range_f64(5e9, 7e9),
        network_hashrate: rng.range_f64(5e10, 6e10),
        block_height: height,
        block_difficulty: rng.range_f64(5e6, 7e6),
        algorithm: ALGORITHM.to_string(),
        payout_interval: PAYOUT_INTERVAL_SECS,
        block_reward: BLOCK_REWARD,
        price: rng.range_f64(0.0045, 0.0055),
        timestamp: now,
    }
}

fn seed_participant(now: u64, rng: &mut dyn RandomSource) -> Participant {
    let address = format!("0x{}", rng.hex_string(20));
    let worker_count = rng.range_u64(1, 6);
    let workers: Vec<SubUnit> = (1..=worker_count)
        .map(|index| seed_worker(index, now, rng))
        .collect();
    let total_hashrate: f64 = workers.iter().map(|worker| worker.hashrate).sum();

    let hashrate_history = (0..PARTICIPANT_HISTORY_HOURS)
        .map(|i| {
            TimeSeriesPoint::new(
                now.saturating_sub((PARTICIPANT_HISTORY_HOURS - i) * HOUR_MILLIS),
                total_hashrate * rng.range_f64(0.8, 1.2),
            )
        })
        .collect();

    Participant {
        address,
        total_blocks: rng.range_u64(0, 1000),
        total_rewards: rng.range_u64(0, 50_000),
        current_hashrate: total_hashrate,
        average_hashrate_24h: total_hashrate * rng.range_f64(0.9, 1.1),
        current_luck: rng.range_f64(95.0, 105.0),
        network_contribution: 0.0,
        workers,
        hashrate_history,
        last_active: now.saturating_sub(rng.range_u64(0, HOUR_MILLIS)),
    }
}

fn seed_worker(index: u64, now: u64, rng: &mut dyn RandomSource) -> SubUnit {
    let mut id_bytes = [0u8; 16];
    rng.fill_bytes(&mut id_bytes);
    let id = uuid::Builder::from_random_bytes(id_bytes).into_uuid();

    // 3:1:1 online, offline, idle
    let status = match rng.range_u64(0, 5) {
        0..=2 => SubUnitStatus::Online,
        3 => SubUnitStatus::Offline,
        _ => SubUnitStatus::Idle,
    };

    SubUnit {
        id: id.to_string(),
        name: format!("Worker-{index}"),
        hashrate: rng.range_f64(1e8, 6e8),
        shares: rng.range_u64(0, 10_000),
        last_seen: now.saturating_sub(rng.range_u64(0, HOUR_MILLIS)),
        status,
    }
}

/// `0x` followed by 64 hex digits.
pub(crate) fn block_hash(rng: &mut dyn RandomSource) -> String {
    format!("0x{}", rng.hex_string(32))
}
