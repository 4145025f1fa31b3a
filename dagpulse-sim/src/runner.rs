//! Async driver for the simulator.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::simulator::NetworkSimulator;

/// Spawns the simulation loop on the current runtime.
///
/// The task resolves to the simulator once `shutdown` flips to `true` or its
/// sender is dropped.
pub fn spawn_simulation(
    simulator: NetworkSimulator,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<NetworkSimulator> {
    tokio::spawn(run_simulation(simulator, shutdown))
}

/// Ticks `simulator` at its configured interval until shut down.
///
/// Ticks never overlap: a late tick is skipped rather than bunched up.
/// A failing or panicking tick is logged and the loop keeps going.
pub async fn run_simulation(
    mut simulator: NetworkSimulator,
    mut shutdown: watch::Receiver<bool>,
) -> NetworkSimulator {
    let period = simulator.config().tick_interval.max(Duration::from_millis(1));
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(tick_ms = period.as_millis() as u64, "Simulation started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = interval.tick() => {
                let tick = simulator.ticks() + 1;
                run_guarded(tick, || simulator.tick());
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!(ticks = simulator.ticks(), "Simulation stopped");
    simulator
}

/// Runs one step, logging instead of propagating failures and panics.
/// Returns the step's value when it succeeded.
fn run_guarded<T, E, F>(tick: u64, step: F) -> Option<T>
where
    E: std::fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    match catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(tick, error = %e, "Tick failed");
            None
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(tick, %message, "Tick panicked");
            None
        }
    }
}
