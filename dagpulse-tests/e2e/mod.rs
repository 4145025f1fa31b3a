//! End-to-end tests for DAGPulse
//!
//! These tests bind a real listener, run the simulation on its timer and
//! talk to the server over WebSocket the way a dashboard would.

mod live_dashboard;
