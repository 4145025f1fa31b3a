//! Bounded random walk over the stats snapshot.

use dagpulse_core::config::{FieldWalk, WalkConfig};
use dagpulse_core::types::{StatsSnapshot, StatsUpdate};

use crate::random::RandomSource;

/// Draws the next value of the mutated fields.
///
/// Each field moves by `(r - 0.5) * step` and is clamped into its range.
/// The network hashrate also follows a fraction of the pool hashrate delta.
/// Block height is left alone; it only moves when a block is appended.
pub fn next_update(
    current: &StatsSnapshot,
    walks: &WalkConfig,
    rng: &mut dyn RandomSource,
) -> StatsUpdate {
    let miners_delta = delta(&walks.miners_online, rng).floor();
    let miners_online = walks
        .miners_online
        .clamp(f64::from(current.miners_online) + miners_delta) as u32;

    let current_luck = step(current.current_luck, &walks.current_luck, rng);

    let pool_delta = delta(&walks.pool_hashrate, rng);
    let pool_hashrate = walks.pool_hashrate.clamp(current.pool_hashrate + pool_delta);

    let network_delta =
        delta(&walks.network_hashrate, rng) + walks.network_pool_correlation * pool_delta;
    let network_hashrate = walks
        .network_hashrate
        .clamp(current.network_hashrate + network_delta);

    let block_difficulty = step(current.block_difficulty, &walks.block_difficulty, rng);
    let price = step(current.price, &walks.price, rng);

    StatsUpdate {
        miners_online: Some(miners_online),
        current_luck: Some(current_luck),
        pool_hashrate: Some(pool_hashrate),
        network_hashrate: Some(network_hashrate),
        block_height: None,
        block_difficulty: Some(block_difficulty),
        price: Some(price),
    }
}

fn delta(walk: &FieldWalk, rng: &mut dyn RandomSource) -> f64 {
    (rng.next_f64() - 0.5) * walk.step
}

fn step(value: f64, walk: &FieldWalk, rng: &mut dyn RandomSource) -> f64 {
    walk.clamp(value + delta(walk, rng))
}
