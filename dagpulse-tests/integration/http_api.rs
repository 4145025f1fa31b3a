//! JSON API over a seeded network, exercised through the router.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use dagpulse_core::broadcast::BroadcastHub;
use dagpulse_core::config::DagPulseConfig;
use dagpulse_sim::{NetworkSimulator, build_simulation};
use dagpulse_web::{AppState, build_router};
use serde_json::Value;
use tower::ServiceExt;

fn seeded() -> (Router, NetworkSimulator) {
    let config = DagPulseConfig::for_testing();
    let hub = Arc::new(BroadcastHub::new(config.broadcast.subscriber_queue_capacity));
    let simulator = build_simulation(&config, hub.clone()).unwrap();
    let state = AppState::new(simulator.store().clone(), hub, config);
    (build_router(state), simulator)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_seeded_network_is_served() {
    let (router, _simulator) = seeded();

    let (status, stats) = get(&router, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["algorithm"], "Scrypt");
    assert_eq!(stats["blockHeight"], 100_000);

    let (_, miners) = get(&router, "/api/miners").await;
    assert_eq!(miners.as_array().map(Vec::len), Some(20));

    let (_, blocks) = get(&router, "/api/blocks").await;
    assert_eq!(blocks.as_array().map(Vec::len), Some(50));
    assert_eq!(blocks[0]["number"], 100_000);

    let (_, hashrate) = get(&router, "/api/hashrate").await;
    assert_eq!(hashrate.as_array().map(Vec::len), Some(30));
}

#[tokio::test]
async fn test_ticks_show_up_in_later_reads() {
    let (router, mut simulator) = seeded();

    for _ in 0..3 {
        simulator.tick().unwrap();
    }

    let (_, recent) = get(&router, "/api/blocks/recent?limit=1").await;
    assert_eq!(recent[0]["number"], 100_001);

    let (status, block) = get(&router, "/api/blocks/100001").await;
    assert_eq!(status, StatusCode::OK);
    let miner = block["minerAddress"].as_str().unwrap().to_string();

    let (status, found) = get(&router, &format!("/api/miners/{miner}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["address"], miner.as_str());

    let (_, stats) = get(&router, "/api/stats").await;
    assert_eq!(stats["blockHeight"], 100_001);
}

#[tokio::test]
async fn test_search_finds_blocks_and_miners() {
    let (router, simulator) = seeded();
    let address = simulator.store().participant_addresses().remove(0);

    let (status, hits) = get(&router, "/api/search?q=99990").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        hits.as_array()
            .unwrap()
            .iter()
            .any(|hit| hit["type"] == "block" && hit["data"]["number"] == 99_990)
    );

    let (_, hits) = get(&router, &format!("/api/search?q={address}")).await;
    assert_eq!(hits[0]["type"], "miner");
    assert_eq!(hits[0]["data"]["address"], address.as_str());
}

#[tokio::test]
async fn test_forecast_and_summary_over_seeded_history() {
    let (router, _simulator) = seeded();

    let (status, forecast) = get(&router, "/api/forecast").await;
    assert_eq!(status, StatusCode::OK);
    assert!(forecast["predicted"].as_f64().unwrap() >= 0.0);
    let trend = forecast["trend"].as_str().unwrap();
    assert!(["up", "down", "stable"].contains(&trend));

    let (_, summary) = get(&router, "/api/network/summary").await;
    assert_eq!(summary["minerCount"], 20);
}

#[tokio::test]
async fn test_bad_input_is_rejected() {
    let (router, _simulator) = seeded();

    let (status, body) = get(&router, "/api/miners?sort=luck").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = get(&router, "/api/blocks/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&router, "/api/blocks/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&router, "/api/miners/0xnobody/risk").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
