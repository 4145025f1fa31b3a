//! Integration tests for DAGPulse
//!
//! These tests drive the store, the simulator and the HTTP router together
//! without binding a socket.

#[path = "integration/simulation_flow.rs"]
mod simulation_flow;

#[path = "integration/http_api.rs"]
mod http_api;
