//! JSON API and push server for DAGPulse
//!
//! Wires the seeded store, the broadcast hub and the simulation loop behind
//! one axum router, and owns their shutdown order.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use dagpulse_core::broadcast::BroadcastHub;
use dagpulse_core::config::DagPulseConfig;
use dagpulse_core::store::NetworkStore;
use dagpulse_sim::{NetworkSimulator, build_simulation, spawn_simulation};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::handlers::{
    api_block, api_blocks, api_forecast, api_hashrate, api_miner, api_miner_risk, api_miners,
    api_network_summary, api_recent_blocks, api_search, api_stats, api_top_miners, ws_handler,
};

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<NetworkStore>,
    pub hub: Arc<BroadcastHub>,
    pub config: Arc<DagPulseConfig>,
}

impl AppState {
    pub fn new(store: Arc<NetworkStore>, hub: Arc<BroadcastHub>, config: DagPulseConfig) -> Self {
        Self {
            store,
            hub,
            config: Arc::new(config),
        }
    }
}

/// Builds the router for every API route and the WebSocket endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/stats", get(api_stats))
        .route("/api/miners", get(api_miners))
        .route("/api/miners/top", get(api_top_miners))
        .route("/api/miners/{address}", get(api_miner))
        .route("/api/miners/{address}/risk", get(api_miner_risk))
        .route("/api/blocks", get(api_blocks))
        .route("/api/blocks/recent", get(api_recent_blocks))
        .route("/api/blocks/{number}", get(api_block))
        .route("/api/hashrate", get(api_hashrate))
        .route("/api/search", get(api_search))
        .route("/api/forecast", get(api_forecast))
        .route("/api/network/summary", get(api_network_summary))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves `state` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// - `ServerError::Io` - Accept loop failed
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let hub = Arc::clone(&state.hub);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            // upgraded sockets outlive the HTTP connection; end their streams
            hub.close_all();
        })
        .await?;
    Ok(())
}

/// Server and simulation running in the background.
pub struct RunningServer {
    local_addr: SocketAddr,
    state: AppState,
    shutdown: watch::Sender<bool>,
    server: JoinHandle<Result<(), ServerError>>,
    simulation: JoinHandle<NetworkSimulator>,
}

impl RunningServer {
    /// Address actually bound, useful when the configured port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Stops accepting, closes subscribers and stops the simulation.
    ///
    /// # Errors
    ///
    /// - `ServerError::Io` - Server loop failed before shutdown
    /// - `ServerError::Task` - A background task panicked
    pub async fn shutdown(self) -> Result<(), ServerError> {
        // receivers may already be gone if a task exited early
        let _ = self.shutdown.send(true);

        let served = self.server.await?;
        let simulator = self.simulation.await?;
        tracing::info!(ticks = simulator.ticks(), "DAGPulse server stopped");
        served
    }
}

/// Seeds the network, starts the simulation and binds the server.
///
/// # Errors
///
/// - `ServerError::Simulation` - Seeding failed
/// - `ServerError::Io` - Could not bind the configured address
pub async fn spawn_server(config: DagPulseConfig) -> Result<RunningServer, ServerError> {
    let hub = Arc::new(BroadcastHub::new(config.broadcast.subscriber_queue_capacity));
    let simulator = build_simulation(&config, Arc::clone(&hub))?;
    let store = Arc::clone(simulator.store());

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    let local_addr = listener.local_addr()?;

    let state = AppState::new(store, hub, config);
    let (shutdown, shutdown_rx) = watch::channel(false);

    let simulation = spawn_simulation(simulator, shutdown_rx.clone());

    let mut server_rx = shutdown_rx;
    let server = tokio::spawn(serve(listener, state.clone(), async move {
        let _ = server_rx.wait_for(|stop| *stop).await;
    }));

    tracing::info!(address = %local_addr, "DAGPulse server listening");

    Ok(RunningServer {
        local_addr,
        state,
        shutdown,
        server,
        simulation,
    })
}

/// Runs the server until Ctrl-C.
///
/// # Errors
///
/// - `ServerError::Simulation` - Seeding failed
/// - `ServerError::Io` - Could not bind or serve
/// - `ServerError::Task` - A background task panicked
pub async fn run_server(config: DagPulseConfig) -> Result<(), ServerError> {
    let running = spawn_server(config).await?;
    println!("DAGPulse dashboard API running on http://{}", running.local_addr());

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown requested");

    running.shutdown().await
}
