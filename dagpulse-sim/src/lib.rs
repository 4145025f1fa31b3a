//! DAGPulse Simulation - Seeded network activity for the dashboard.
//!
//! There is no real chain behind DAGPulse. This crate fabricates one: it
//! seeds a [`NetworkStore`] with plausible participants, blocks and history,
//! then drives it with a bounded random walk, periodic sampling and block
//! generation, publishing every change through the [`BroadcastHub`].
//!
//! # Determinism
//!
//! All randomness flows through [`RandomSource`]. A [`DeterministicRng`]
//! built from a fixed seed reproduces the same seed state and the same
//! sequence of ticks; tests use [`ScriptedRandom`] to pin exact values.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dagpulse_core::broadcast::BroadcastHub;
//! use dagpulse_core::config::DagPulseConfig;
//! use dagpulse_sim::{build_simulation, spawn_simulation};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DagPulseConfig::for_testing();
//! let hub = Arc::new(BroadcastHub::new(config.broadcast.subscriber_queue_capacity));
//! let simulator = build_simulation(&config, hub)?;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let task = spawn_simulation(simulator, shutdown_rx);
//! shutdown_tx.send(true)?;
//! task.await?;
//! # Ok(())
//! # }
//! ```

pub mod random;
pub mod runner;
pub mod seed;
pub mod simulator;
pub mod walk;

use std::sync::Arc;

use dagpulse_core::broadcast::{BroadcastError, BroadcastHub};
use dagpulse_core::clock::{Clock, SystemClock};
use dagpulse_core::config::DagPulseConfig;
use dagpulse_core::store::{NetworkStore, StoreError};

pub use random::{DeterministicRng, RandomSource, ScriptedRandom};
pub use runner::{run_simulation, spawn_simulation};
pub use seed::seed_store;
pub use simulator::{NetworkSimulator, TickReport};

/// Errors raised while seeding or ticking the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// An envelope could not be published.
    #[error("Broadcast failed: {0}")]
    Broadcast(#[from] BroadcastError),

    /// Seed data was rejected by the store.
    #[error("Store rejected seed data: {0}")]
    Store(#[from] StoreError),
}

/// Seeds a store from `config` and wraps it in a simulator publishing to `hub`.
///
/// Uses `config.simulation.deterministic_seed` when set, a fresh seed
/// otherwise. The chosen seed is logged so a run can be replayed.
///
/// # Errors
///
/// - `SimulationError::Store` - Seed data collided
pub fn build_simulation(
    config: &DagPulseConfig,
    hub: Arc<BroadcastHub>,
) -> Result<NetworkSimulator, SimulationError> {
    build_simulation_with_clock(config, hub, Arc::new(SystemClock))
}

/// Like [`build_simulation`] with an injected clock.
///
/// # Errors
///
/// - `SimulationError::Store` - Seed data collided
pub fn build_simulation_with_clock(
    config: &DagPulseConfig,
    hub: Arc<BroadcastHub>,
    clock: Arc<dyn Clock>,
) -> Result<NetworkSimulator, SimulationError> {
    let mut rng = match config.simulation.deterministic_seed {
        Some(seed) => DeterministicRng::from_seed(seed),
        None => DeterministicRng::from_entropy(),
    };
    tracing::info!(seed = rng.seed(), "Seeding network state");

    let store: NetworkStore = seed_store(&config.store, &mut rng, clock)?;

    Ok(NetworkSimulator::new(
        Arc::new(store),
        hub,
        config.simulation.clone(),
        Box::new(rng),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagpulse_core::clock::ManualClock;

    #[test]
    fn test_fixed_seed_builds_identical_simulations() {
        let config = DagPulseConfig::for_testing();
        let build = || {
            build_simulation_with_clock(
                &config,
                Arc::new(BroadcastHub::new(4)),
                Arc::new(ManualClock::starting_at(5_000_000)),
            )
            .unwrap()
        };

        let mut a = build();
        let mut b = build();

        assert_eq!(a.store().stats(), b.store().stats());
        for _ in 0..5 {
            assert_eq!(a.tick().unwrap().block, b.tick().unwrap().block);
        }
        assert_eq!(a.store().stats(), b.store().stats());
    }
}
