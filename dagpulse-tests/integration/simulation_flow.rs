//! Store and simulator working together on scripted randomness.

use std::sync::Arc;
use std::time::Duration;

use dagpulse_core::broadcast::{BroadcastEnvelope, BroadcastHub};
use dagpulse_core::clock::ManualClock;
use dagpulse_core::config::{BlockSchedule, SimulationConfig, StoreConfig};
use dagpulse_core::store::NetworkStore;
use dagpulse_core::types::{Participant, ParticipantSort, StatsSnapshot};
use dagpulse_sim::{NetworkSimulator, ScriptedRandom};

const START: u64 = 1_700_000_000_000;

fn stats(network_hashrate: f64) -> StatsSnapshot {
    StatsSnapshot {
        miners_online: 175,
        current_luck: 100.0,
        pool_hashrate: 6e9,
        network_hashrate,
        block_height: 500,
        block_difficulty: 6e6,
        algorithm: "Scrypt".to_string(),
        payout_interval: 3600,
        block_reward: 50.0,
        price: 0.005,
        timestamp: START,
    }
}

fn participant(address: &str, hashrate: f64) -> Participant {
    Participant {
        address: address.to_string(),
        total_blocks: 0,
        total_rewards: 0,
        current_hashrate: hashrate,
        average_hashrate_24h: hashrate,
        current_luck: 100.0,
        network_contribution: 0.0,
        workers: Vec::new(),
        hashrate_history: Vec::new(),
        last_active: START,
    }
}

fn store_with_three(clock: Arc<ManualClock>, network_hashrate: f64) -> Arc<NetworkStore> {
    let store = NetworkStore::with_clock(StoreConfig::default(), stats(network_hashrate), clock);
    store.insert_participant(participant("0xa", 100.0)).unwrap();
    store.insert_participant(participant("0xb", 200.0)).unwrap();
    store.insert_participant(participant("0xc", 300.0)).unwrap();
    Arc::new(store)
}

fn quiet_config() -> SimulationConfig {
    SimulationConfig {
        sample_every_ticks: 1,
        block_schedule: BlockSchedule::EveryTicks(100),
        ..SimulationConfig::deterministic_testing()
    }
}

#[test]
fn test_top_participants_and_contributions() {
    let clock = Arc::new(ManualClock::starting_at(START));
    let store = store_with_three(clock, 1000.0);

    store.recompute_contributions();

    let top: Vec<String> = store
        .top_participants(2, ParticipantSort::Hashrate)
        .into_iter()
        .map(|p| p.address)
        .collect();
    assert_eq!(top, vec!["0xc", "0xb"]);

    let contribution = store.participant("0xc").unwrap().network_contribution;
    assert!((contribution - 30.0).abs() < 1e-9);
}

#[test]
fn test_scripted_tick_moves_only_walked_fields() {
    let clock = Arc::new(ManualClock::starting_at(START));
    let store = store_with_three(clock.clone(), 6e10);
    let hub = Arc::new(BroadcastHub::new(16));
    let mut subscription = hub.subscribe();
    let before = store.stats();

    // every gauge draws the midpoint except price, which draws the top
    let rng = ScriptedRandom::new(vec![0.5, 0.5, 0.5, 0.5, 0.5, 1.0]);
    let mut simulator = NetworkSimulator::new(store.clone(), hub, quiet_config(), Box::new(rng));

    clock.advance(Duration::from_secs(2));
    let report = simulator.tick().unwrap();
    let after = store.stats();

    assert_eq!(after.miners_online, before.miners_online);
    assert_eq!(after.current_luck, before.current_luck);
    assert_eq!(after.pool_hashrate, before.pool_hashrate);
    assert_eq!(after.network_hashrate, before.network_hashrate);
    assert_eq!(after.block_difficulty, before.block_difficulty);
    assert_eq!(after.block_height, before.block_height);
    assert!(after.price > before.price);
    assert!(after.timestamp > before.timestamp);
    assert!(report.block.is_none());

    let first = subscription.frames.try_recv().unwrap();
    match BroadcastEnvelope::from_json(&first).unwrap() {
        BroadcastEnvelope::StatsUpdate(pushed) => assert_eq!(pushed, after),
        other => panic!("expected stats first, got {}", other.kind()),
    }
    let second = subscription.frames.try_recv().unwrap();
    assert!(matches!(
        BroadcastEnvelope::from_json(&second).unwrap(),
        BroadcastEnvelope::TimeSeriesPoint(point) if point.timestamp == after.timestamp
    ));
}

#[test]
fn test_blocks_extend_the_ledger_in_order() {
    let clock = Arc::new(ManualClock::starting_at(START));
    let store = store_with_three(clock.clone(), 6e10);
    let hub = Arc::new(BroadcastHub::new(16));
    let config = SimulationConfig {
        block_schedule: BlockSchedule::EveryTicks(2),
        ..quiet_config()
    };
    let mut simulator =
        NetworkSimulator::new(store.clone(), hub, config, Box::new(ScriptedRandom::constant(0.5)));

    for _ in 0..6 {
        clock.advance(Duration::from_secs(2));
        simulator.tick().unwrap();
    }

    let blocks = store.list_blocks();
    let numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
    assert_eq!(numbers, vec![503, 502, 501]);
    assert_eq!(store.stats().block_height, 503);
    assert!(blocks.iter().all(|b| store.participant(&b.miner_address).is_some()));
    assert_eq!(store.time_series_len(), 6);
}
