//! CLI command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Subcommand;
use dagpulse_client::Subscriber;
use dagpulse_core::broadcast::BroadcastHub;
use dagpulse_core::clock::{Clock, ManualClock, SystemClock};
use dagpulse_core::config::{BlockSchedule, DagPulseConfig};
use dagpulse_core::forecast::{Forecast, Forecaster};
use dagpulse_sim::build_simulation_with_clock;
use dagpulse_web::run_server;
use tokio::sync::watch;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the API and push server
    Server {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
        /// Seed for a reproducible network
        #[arg(long)]
        seed: Option<u64>,
        /// Milliseconds between simulation ticks
        #[arg(long)]
        tick_ms: Option<u64>,
    },
    /// Run the simulation offline and print what happened
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Append a block every N ticks instead of the configured schedule
        #[arg(long)]
        block_every: Option<u64>,
    },
    /// Follow a running server's push channel
    Watch {
        /// WebSocket endpoint
        #[arg(long, default_value = "ws://127.0.0.1:5000/ws")]
        url: String,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Server {
            host,
            port,
            seed,
            tick_ms,
        } => start_server(host, port, seed, tick_ms).await,
        Commands::Simulate {
            ticks,
            seed,
            block_every,
        } => simulate(ticks, seed, block_every).await,
        Commands::Watch { url } => watch_endpoint(url).await,
    }
}

/// Start the server with CLI overrides on top of the environment.
///
/// # Errors
/// - `ServerError::Io` - Address could not be bound
/// - `ServerError::Simulation` - Network could not be seeded
pub async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    seed: Option<u64>,
    tick_ms: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = DagPulseConfig::from_env();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if seed.is_some() {
        config.simulation.deterministic_seed = seed;
    }
    if let Some(millis) = tick_ms.filter(|millis| *millis > 0) {
        config.simulation.tick_interval = Duration::from_millis(millis);
    }

    run_server(config).await.context("Server failed")
}

/// Run `ticks` simulation steps on virtual time and summarize.
///
/// # Errors
/// - `SimulationError::Store` - Seeding failed
/// - `SimulationError::Broadcast` - A tick failed to publish
pub async fn simulate(
    ticks: u64,
    seed: Option<u64>,
    block_every: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = DagPulseConfig::from_env();
    if seed.is_some() {
        config.simulation.deterministic_seed = seed;
    }
    if let Some(every) = block_every.filter(|every| *every > 0) {
        config.simulation.block_schedule = BlockSchedule::EveryTicks(every);
    }

    let clock = Arc::new(ManualClock::starting_at(SystemClock.now_millis()));
    let hub = Arc::new(BroadcastHub::new(config.broadcast.subscriber_queue_capacity));
    let mut simulator = build_simulation_with_clock(&config, hub, clock.clone())?;

    println!("Running {ticks} ticks...");
    for _ in 0..ticks {
        clock.advance(config.simulation.tick_interval);
        let report = simulator.tick()?;
        if let Some(block) = report.block {
            println!(
                "  tick {:>4}: block #{} by {}",
                report.tick, block.number, block.miner_address
            );
        }
    }

    let store = simulator.store();
    let stats = store.stats();
    let summary = store.network_summary();

    println!();
    println!("Network after {ticks} ticks:");
    println!("  Block height:     {}", stats.block_height);
    println!("  Miners online:    {}", stats.miners_online);
    println!("  Pool hashrate:    {:.3e} H/s", stats.pool_hashrate);
    println!("  Network hashrate: {:.3e} H/s", stats.network_hashrate);
    println!("  Luck:             {:.2}%", stats.current_luck);
    println!("  Price:            ${:.5}", stats.price);
    println!("  Participants:     {}", summary.miner_count);

    let points = store.time_series(config.forecast.window);
    print_forecast(Forecaster::new(config.forecast.horizon_steps).project(&points).ok());

    Ok(())
}

/// Follow a push endpoint until Ctrl-C, then summarize.
///
/// # Errors
/// Never fails once started; connection problems are retried.
pub async fn watch_endpoint(url: String) -> anyhow::Result<()> {
    let config = DagPulseConfig::from_env();
    let mut subscriber = Subscriber::new(url, &config.client, &config.forecast);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ctrl_c = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        let _ = shutdown_tx.send(true);
    });

    println!("Watching {} (Ctrl-C to stop)", subscriber.url());
    subscriber.run(shutdown_rx).await;
    ctrl_c.abort();

    let view = subscriber.view();
    println!();
    match view.stats() {
        Some(stats) => println!(
            "Last snapshot: height {}, {} miners online, price ${:.5}",
            stats.block_height, stats.miners_online, stats.price
        ),
        None => println!("No snapshot received"),
    }
    if let Some(block) = view.latest_block() {
        println!("Latest block: #{} {}", block.number, block.hash);
    }

    let notifications = subscriber.notifications();
    println!(
        "Notifications: {} ({} unread)",
        notifications.len(),
        notifications.unread_count()
    );
    for notification in notifications.iter().take(10) {
        println!("  {} - {}", notification.title, notification.message);
    }

    print_forecast(view.forecast().ok());
    Ok(())
}

fn print_forecast(forecast: Option<Forecast>) {
    match forecast {
        Some(forecast) => println!(
            "Forecast: {:.3e} H/s ({:?}, {}% confidence)",
            forecast.predicted, forecast.trend, forecast.confidence
        ),
        None => println!("Forecast: insufficient data"),
    }
}
