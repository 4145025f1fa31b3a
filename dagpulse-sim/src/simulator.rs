//! One mutation step of the simulated network.

use std::sync::Arc;

use dagpulse_core::broadcast::{BroadcastEnvelope, BroadcastHub, PublishReport};
use dagpulse_core::config::{BlockSchedule, SimulationConfig};
use dagpulse_core::store::NetworkStore;
use dagpulse_core::types::{BlockRecord, NewBlock, StatsUpdate, TimeSeriesPoint};

use crate::SimulationError;
use crate::random::RandomSource;
use crate::seed::block_hash;
use crate::walk;

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// 1-based tick number
    pub tick: u64,
    /// Network sample taken on this tick, if any
    pub sampled: Option<TimeSeriesPoint>,
    /// Block appended on this tick, if any
    pub block: Option<BlockRecord>,
    /// Delivery totals over every envelope published this tick
    pub delivery: PublishReport,
}

/// Sole writer of stats and blocks.
///
/// Owns the random source and tick counter; the store and hub are shared
/// with the HTTP layer.
pub struct NetworkSimulator {
    store: Arc<NetworkStore>,
    hub: Arc<BroadcastHub>,
    config: SimulationConfig,
    rng: Box<dyn RandomSource>,
    ticks: u64,
}

impl std::fmt::Debug for NetworkSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSimulator")
            .field("ticks", &self.ticks)
            .field("config", &self.config)
            .finish()
    }
}

impl NetworkSimulator {
    pub fn new(
        store: Arc<NetworkStore>,
        hub: Arc<BroadcastHub>,
        config: SimulationConfig,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            hub,
            config,
            rng,
            ticks: 0,
        }
    }

    pub fn store(&self) -> &Arc<NetworkStore> {
        &self.store
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances the network by one tick.
    ///
    /// Always perturbs and publishes the stats. Samples the network series
    /// on every `sample_every_ticks`th tick and appends a block when the
    /// schedule says so and at least one participant exists.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Broadcast` - An envelope could not be serialized
    pub fn tick(&mut self) -> Result<TickReport, SimulationError> {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };

        let current = self.store.stats();
        let update = walk::next_update(&current, &self.config.walks, self.rng.as_mut());
        let snapshot = self.store.update_stats(&update);
        self.store.recompute_contributions();
        self.publish(&BroadcastEnvelope::StatsUpdate(snapshot.clone()), &mut report)?;

        if self.is_due(self.config.sample_every_ticks) {
            let point = TimeSeriesPoint::new(snapshot.timestamp, snapshot.pool_hashrate);
            self.store.push_time_series_point(point);
            self.store.sample_participant_histories(point.timestamp);
            self.publish(&BroadcastEnvelope::TimeSeriesPoint(point), &mut report)?;
            report.sampled = Some(point);
        }

        let block_due = match self.config.block_schedule {
            BlockSchedule::EveryTicks(every) => self.is_due(every),
            BlockSchedule::Probability(probability) => self.rng.chance(probability),
        };
        if block_due {
            if let Some(block) = self.generate_block() {
                self.publish(&BroadcastEnvelope::NewBlock(block.clone()), &mut report)?;
                report.block = Some(block);
            }
        }

        tracing::trace!(
            tick = report.tick,
            sampled = report.sampled.is_some(),
            block = report.block.as_ref().map(|b| b.number),
            delivered = report.delivery.delivered,
            "Tick complete"
        );

        Ok(report)
    }

    /// Mints a block for a uniformly chosen participant and raises the
    /// stats block height to it. Returns `None` when nobody can mine.
    fn generate_block(&mut self) -> Option<BlockRecord> {
        let addresses = self.store.participant_addresses();
        let Some(index) = self.rng.choose_index(addresses.len()) else {
            tracing::debug!("No participants, skipping block");
            return None;
        };

        let stats = self.store.stats();
        let block = NewBlock {
            hash: block_hash(self.rng.as_mut()),
            timestamp: self.store.now_millis(),
            difficulty: stats.block_difficulty,
            reward: stats.block_reward,
            miner_address: addresses[index].clone(),
            confirmations: 0,
            size: self.rng.range_u64(100_000, 600_000),
            transactions: self.rng.range_u64(10, 210) as u32,
        };

        let record = self.store.append_block(block);
        self.store.update_stats(&StatsUpdate {
            block_height: Some(record.number),
            ..StatsUpdate::default()
        });

        tracing::info!(
            number = record.number,
            miner = %record.miner_address,
            "New block"
        );
        Some(record)
    }

    fn is_due(&self, every: u64) -> bool {
        every > 0 && self.ticks % every == 0
    }

    fn publish(
        &self,
        envelope: &BroadcastEnvelope,
        report: &mut TickReport,
    ) -> Result<(), SimulationError> {
        let outcome = self.hub.publish(envelope)?;
        report.delivery.delivered += outcome.delivered;
        report.delivery.dropped += outcome.dropped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{DeterministicRng, ScriptedRandom};
    use dagpulse_core::clock::ManualClock;
    use dagpulse_core::config::StoreConfig;
    use dagpulse_core::types::{Participant, StatsSnapshot};
    use std::time::Duration;

    fn stats() -> StatsSnapshot {
        StatsSnapshot {
            miners_online: 175,
            current_luck: 100.0,
            pool_hashrate: 6e9,
            network_hashrate: 6e10,
            block_height: 500,
            block_difficulty: 6e6,
            algorithm: "Scrypt".to_string(),
            payout_interval: 3600,
            block_reward: 50.0,
            price: 0.005,
            timestamp: 1_000,
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
            last_active: 0,
        }
    }

    fn simulator(
        config: SimulationConfig,
        rng: Box<dyn RandomSource>,
    ) -> (NetworkSimulator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(1_000));
        let store = NetworkStore::with_clock(StoreConfig::default(), stats(), clock.clone());
        store.insert_participant(participant("0xaa", 3e9)).unwrap();
        store.insert_participant(participant("0xbb", 1e9)).unwrap();
        let hub = Arc::new(BroadcastHub::new(64));
        (
            NetworkSimulator::new(Arc::new(store), hub, config, rng),
            clock,
        )
    }

    fn config(sample_every: u64, schedule: BlockSchedule) -> SimulationConfig {
        SimulationConfig {
            sample_every_ticks: sample_every,
            block_schedule: schedule,
            ..SimulationConfig::deterministic_testing()
        }
    }

    #[test]
    fn test_tick_updates_stats_and_contributions() {
        let (mut sim, clock) = simulator(
            config(5, BlockSchedule::EveryTicks(15)),
            Box::new(ScriptedRandom::constant(0.75)),
        );
        clock.advance(Duration::from_secs(2));

        let report = sim.tick().unwrap();
        let stats = sim.store().stats();

        assert_eq!(report.tick, 1);
        assert!(report.sampled.is_none());
        assert!(report.block.is_none());
        assert_eq!(stats.timestamp, 3_000);
        assert_eq!(stats.current_luck, 100.5);
        assert_eq!(stats.miners_online, 177);
        assert_eq!(stats.block_height, 500);

        let expected = 3e9 / stats.network_hashrate * 100.0;
        let contribution = sim.store().participant("0xaa").unwrap().network_contribution;
        assert!((contribution - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_every_tick_publishes_stats() {
        let (mut sim, _clock) = simulator(
            config(5, BlockSchedule::EveryTicks(15)),
            Box::new(DeterministicRng::from_seed(1)),
        );
        let mut subscription = sim.hub().subscribe();

        let report = sim.tick().unwrap();

        assert_eq!(report.delivery.delivered, 1);
        let frame = subscription.frames.recv().await.unwrap();
        assert!(matches!(
            BroadcastEnvelope::from_json(&frame).unwrap(),
            BroadcastEnvelope::StatsUpdate(_)
        ));
    }

    #[test]
    fn test_sampling_cadence() {
        let (mut sim, _clock) = simulator(
            config(3, BlockSchedule::EveryTicks(100)),
            Box::new(DeterministicRng::from_seed(2)),
        );

        let sampled: Vec<bool> = (0..6).map(|_| sim.tick().unwrap().sampled.is_some()).collect();

        assert_eq!(sampled, vec![false, false, true, false, false, true]);
        assert_eq!(sim.store().time_series_len(), 2);
        assert_eq!(sim.store().participant("0xbb").unwrap().hashrate_history.len(), 2);
    }

    #[test]
    fn test_block_schedule_appends_and_raises_height() {
        let (mut sim, _clock) = simulator(
            config(100, BlockSchedule::EveryTicks(2)),
            Box::new(DeterministicRng::from_seed(3)),
        );

        let reports: Vec<TickReport> = (0..4).map(|_| sim.tick().unwrap()).collect();
        let numbers: Vec<u64> = reports
            .iter()
            .filter_map(|r| r.block.as_ref().map(|b| b.number))
            .collect();

        assert_eq!(numbers, vec![501, 502]);
        assert_eq!(sim.store().stats().block_height, 502);

        let block = sim.store().block(502).unwrap();
        assert_eq!(block.confirmations, 0);
        assert_eq!(block.hash.len(), 66);
        assert!(["0xaa", "0xbb"].contains(&block.miner_address.as_str()));
        assert!((10..210).contains(&block.transactions));
    }

    #[test]
    fn test_probabilistic_schedule() {
        let (mut always, _) = simulator(
            config(100, BlockSchedule::Probability(1.0)),
            Box::new(DeterministicRng::from_seed(4)),
        );
        let (mut never, _) = simulator(
            config(100, BlockSchedule::Probability(0.0)),
            Box::new(DeterministicRng::from_seed(4)),
        );

        for _ in 0..3 {
            assert!(always.tick().unwrap().block.is_some());
            assert!(never.tick().unwrap().block.is_none());
        }
        assert_eq!(always.store().tip(), 503);
        assert_eq!(never.store().tip(), 500);
    }

    #[test]
    fn test_no_participants_skips_block() {
        let clock = Arc::new(ManualClock::starting_at(0));
        let store = Arc::new(NetworkStore::with_clock(StoreConfig::default(), stats(), clock));
        let mut sim = NetworkSimulator::new(
            store,
            Arc::new(BroadcastHub::new(4)),
            config(1, BlockSchedule::EveryTicks(1)),
            Box::new(DeterministicRng::from_seed(5)),
        );

        let report = sim.tick().unwrap();

        assert!(report.block.is_none());
        assert!(report.sampled.is_some());
        assert_eq!(sim.store().tip(), 500);
    }
}
