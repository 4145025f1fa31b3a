//! Centralized configuration for DAGPulse.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all DAGPulse components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct DagPulseConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub simulation: SimulationConfig,
    pub broadcast: BroadcastConfig,
    pub forecast: ForecastConfig,
    pub client: ClientConfig,
}

/// HTTP and WebSocket listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// Returns `host:port` suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// In-memory store sizing and seeding parameters.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the network hashrate buffer
    pub network_history_capacity: usize,
    /// Capacity of each participant's hashrate buffer
    pub participant_history_capacity: usize,
    /// Maximum number of search results returned
    pub search_result_limit: usize,
    /// Number of participants created at startup
    pub seed_participants: usize,
    /// Number of historical blocks created at startup
    pub seed_blocks: usize,
    /// Number of network hashrate points created at startup
    pub seed_history_points: usize,
    /// Height of the newest seeded block
    pub genesis_height: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            network_history_capacity: 100,
            participant_history_capacity: 100,
            search_result_limit: 10,
            seed_participants: 20,
            seed_blocks: 50,
            seed_history_points: 30,
            genesis_height: 100_000,
        }
    }
}

/// Bounded random walk for one gauge.
///
/// Each step moves the gauge by `(r - 0.5) * step` with `r` in `[0, 1)`,
/// then clamps to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWalk {
    pub step: f64,
    pub min: f64,
    pub max: f64,
}

impl FieldWalk {
    pub const fn new(step: f64, min: f64, max: f64) -> Self {
        Self { step, min, max }
    }

    /// Clamps `value` into this walk's range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Returns true when `value` lies within the range.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Perturbation rules for every mutated gauge.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    pub miners_online: FieldWalk,
    pub current_luck: FieldWalk,
    pub pool_hashrate: FieldWalk,
    pub network_hashrate: FieldWalk,
    pub block_difficulty: FieldWalk,
    pub price: FieldWalk,
    /// Fraction of the pool hashrate delta also applied to network hashrate
    pub network_pool_correlation: f64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            miners_online: FieldWalk::new(10.0, 100.0, 500.0),
            current_luck: FieldWalk::new(2.0, 80.0, 120.0),
            pool_hashrate: FieldWalk::new(5e8, 3e9, 2e10),
            network_hashrate: FieldWalk::new(2e9, 4e10, 2e11),
            block_difficulty: FieldWalk::new(1e5, 4e6, 2e7),
            price: FieldWalk::new(2e-4, 0.003, 0.02),
            network_pool_correlation: 0.5,
        }
    }
}

/// When the simulation produces a new block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockSchedule {
    /// Deterministically on every Nth tick
    EveryTicks(u64),
    /// Independently on each tick with the given probability
    Probability(f64),
}

/// Mutation loop configuration.
///
/// Controls the tick cadence, sampling and block generation, and the
/// seed for reproducible runs.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Interval between mutation ticks
    pub tick_interval: Duration,
    /// Sample the network time series every Nth tick
    pub sample_every_ticks: u64,
    /// Block generation schedule
    pub block_schedule: BlockSchedule,
    /// Deterministic seed for reproducible simulations
    pub deterministic_seed: Option<u64>,
    /// Random walk parameters
    pub walks: WalkConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            sample_every_ticks: 5,
            block_schedule: BlockSchedule::EveryTicks(15), // 30s at the default tick
            deterministic_seed: None,
            walks: WalkConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration for deterministic testing.
    pub fn deterministic_testing() -> Self {
        Self {
            tick_interval: Duration::from_millis(10),
            sample_every_ticks: 1,
            block_schedule: BlockSchedule::EveryTicks(3),
            deterministic_seed: Some(42), // Fixed seed for reproducible tests
            walks: WalkConfig::default(),
        }
    }
}

/// Push channel configuration.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Queued frames per subscriber before it is considered stalled
    pub subscriber_queue_capacity: usize,
    /// Time-series points replayed to a new subscriber
    pub catch_up_points: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 256,
            catch_up_points: 30,
        }
    }
}

/// Forecaster parameters.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Number of ticks projected ahead
    pub horizon_steps: u32,
    /// Number of most recent points fitted
    pub window: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_steps: 5,
            window: 30,
        }
    }
}

/// Subscriber-side configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Local hashrate buffer length
    pub history_capacity: usize,
    /// Notifications kept in the log
    pub notification_capacity: usize,
    /// Price ratio over the previous snapshot that counts as a milestone
    pub price_milestone_ratio: f64,
    /// First reconnect delay
    pub reconnect_initial: Duration,
    /// Upper bound for reconnect delay
    pub reconnect_max: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            history_capacity: 30,
            notification_capacity: 50,
            price_milestone_ratio: 1.05,
            reconnect_initial: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

impl DagPulseConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("DAGPULSE_HOST") {
            if !host.is_empty() {
                config.server.host = host;
            }
        }

        if let Ok(port) = std::env::var("DAGPULSE_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.server.port = port;
            }
        }

        if let Ok(tick) = std::env::var("DAGPULSE_TICK_MS") {
            if let Ok(millis) = tick.parse::<u64>() {
                if millis > 0 {
                    config.simulation.tick_interval = Duration::from_millis(millis);
                }
            }
        }

        if let Ok(seed) = std::env::var("DAGPULSE_SEED") {
            if let Ok(seed_value) = seed.parse::<u64>() {
                config.simulation.deterministic_seed = Some(seed_value);
            }
        }

        if let Ok(every) = std::env::var("DAGPULSE_BLOCK_EVERY_TICKS") {
            if let Ok(ticks) = every.parse::<u64>() {
                if ticks > 0 {
                    config.simulation.block_schedule = BlockSchedule::EveryTicks(ticks);
                }
            }
        }

        if let Ok(every) = std::env::var("DAGPULSE_SAMPLE_EVERY_TICKS") {
            if let Ok(ticks) = every.parse::<u64>() {
                if ticks > 0 {
                    config.simulation.sample_every_ticks = ticks;
                }
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            simulation: SimulationConfig::deterministic_testing(),
            ..Default::default()
        }
    }
}
