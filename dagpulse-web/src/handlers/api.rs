//! JSON API handlers
//!
//! Every handler validates its input before touching the store, so a
//! malformed request is a 400 even when nothing would have matched.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use dagpulse_core::forecast::{Forecast, Forecaster};
use dagpulse_core::query::{
    parse_address, parse_block_number, parse_limit, parse_search_token, parse_sort,
};
use dagpulse_core::risk::{self, RiskAssessment};
use dagpulse_core::types::{
    BlockRecord, NetworkSummary, Participant, ParticipantSort, SearchResult, StatsSnapshot,
    TimeSeriesPoint,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::AppState;

const DEFAULT_TOP_LIMIT: usize = 10;
const DEFAULT_RECENT_LIMIT: usize = 10;
const DEFAULT_HASHRATE_LIMIT: usize = 30;

#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn api_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.store.stats())
}

pub async fn api_miners(
    State(state): State<AppState>,
    Query(params): Query<SortQuery>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    let sort = parse_sort(params.sort.as_deref())?;
    Ok(Json(state.store.list_participants(sort)))
}

pub async fn api_top_miners(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    let limit = parse_limit(params.limit.as_deref(), DEFAULT_TOP_LIMIT)?;
    Ok(Json(
        state
            .store
            .top_participants(limit, ParticipantSort::Hashrate),
    ))
}

pub async fn api_miner(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Participant>, ApiError> {
    let address = parse_address(&address)?;
    state
        .store
        .participant(address)
        .map(Json)
        .ok_or(ApiError::NotFound { resource: "Miner" })
}

pub async fn api_miner_risk(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<RiskAssessment>, ApiError> {
    let address = parse_address(&address)?;
    let participant = state
        .store
        .participant(address)
        .ok_or(ApiError::NotFound { resource: "Miner" })?;
    Ok(Json(risk::assess(&participant, state.store.now_millis())))
}

pub async fn api_blocks(State(state): State<AppState>) -> Json<Vec<BlockRecord>> {
    Json(state.store.list_blocks())
}

pub async fn api_recent_blocks(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<BlockRecord>>, ApiError> {
    let limit = parse_limit(params.limit.as_deref(), DEFAULT_RECENT_LIMIT)?;
    Ok(Json(state.store.recent_blocks(limit)))
}

pub async fn api_block(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<BlockRecord>, ApiError> {
    let number = parse_block_number(&number)?;
    state
        .store
        .block(number)
        .map(Json)
        .ok_or(ApiError::NotFound { resource: "Block" })
}

pub async fn api_hashrate(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<TimeSeriesPoint>>, ApiError> {
    let limit = parse_limit(params.limit.as_deref(), DEFAULT_HASHRATE_LIMIT)?;
    Ok(Json(state.store.time_series(limit)))
}

pub async fn api_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let token = parse_search_token(params.q.as_deref().unwrap_or_default())?;
    Ok(Json(state.store.search(token)))
}

/// Projects the network hashrate over the newest points of the series.
pub async fn api_forecast(State(state): State<AppState>) -> Result<Json<Forecast>, ApiError> {
    let forecast = &state.config.forecast;
    let points = state.store.time_series(forecast.window);
    let projection = Forecaster::new(forecast.horizon_steps).project(&points)?;
    Ok(Json(projection))
}

pub async fn api_network_summary(State(state): State<AppState>) -> Json<NetworkSummary> {
    Json(state.store.network_summary())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use dagpulse_core::broadcast::BroadcastHub;
    use dagpulse_core::clock::ManualClock;
    use dagpulse_core::config::DagPulseConfig;
    use dagpulse_core::store::NetworkStore;
    use dagpulse_core::types::{NewBlock, SubUnit, SubUnitStatus};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::server::build_router;

    const NOW: u64 = 50 * 3_600_000;

    fn stats() -> StatsSnapshot {
        StatsSnapshot {
            miners_online: 150,
            current_luck: 100.0,
            pool_hashrate: 600.0,
            network_hashrate: 1_000.0,
            block_height: 10,
            block_difficulty: 5e6,
            algorithm: "Scrypt".to_string(),
            payout_interval: 3600,
            block_reward: 50.0,
            price: 0.005,
            timestamp: NOW,
        }
    }

    fn participant(address: &str, hashrate: f64, blocks: u64) -> Participant {
        Participant {
            address: address.to_string(),
            total_blocks: blocks,
            total_rewards: blocks * 50,
            current_hashrate: hashrate,
            average_hashrate_24h: hashrate,
            current_luck: 100.0,
            network_contribution: 0.0,
            workers: vec![SubUnit {
                id: format!("{address}-1"),
                name: "Worker-1".to_string(),
                hashrate,
                shares: 1,
                last_seen: NOW,
                status: SubUnitStatus::Online,
            }],
            hashrate_history: Vec::new(),
            last_active: NOW,
        }
    }

    fn state() -> AppState {
        let store = NetworkStore::with_clock(
            DagPulseConfig::for_testing().store,
            stats(),
            Arc::new(ManualClock::starting_at(NOW)),
        );
        store.insert_participant(participant("0xaaa1", 100.0, 7)).unwrap();
        store.insert_participant(participant("0xbbb2", 300.0, 1)).unwrap();
        store.insert_participant(participant("0xccc3", 200.0, 3)).unwrap();
        store.recompute_contributions();
        store.append_block(NewBlock {
            hash: format!("0x{}", "ab".repeat(32)),
            timestamp: NOW,
            difficulty: 5e6,
            reward: 50.0,
            miner_address: "0xaaa1".to_string(),
            confirmations: 0,
            size: 1_000,
            transactions: 12,
        });

        AppState::new(
            Arc::new(store),
            Arc::new(BroadcastHub::new(8)),
            DagPulseConfig::for_testing(),
        )
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        let response = build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn addresses(body: &Value) -> Vec<&str> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|miner| miner["address"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_stats_are_camel_case() {
        let (status, body) = get(state(), "/api/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["minersOnline"], 150);
        assert_eq!(body["algorithm"], "Scrypt");
    }

    #[tokio::test]
    async fn test_miners_sorted_by_requested_key() {
        let (_, by_hashrate) = get(state(), "/api/miners").await;
        let (_, by_blocks) = get(state(), "/api/miners?sort=blocks").await;
        let (status, invalid) = get(state(), "/api/miners?sort=luck").await;

        assert_eq!(addresses(&by_hashrate), vec!["0xbbb2", "0xccc3", "0xaaa1"]);
        assert_eq!(addresses(&by_blocks), vec!["0xaaa1", "0xccc3", "0xbbb2"]);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(invalid["error"].as_str().unwrap().contains("sort"));
    }

    #[tokio::test]
    async fn test_top_miners_respects_limit() {
        let (status, body) = get(state(), "/api/miners/top?limit=2").await;
        let (bad_status, _) = get(state(), "/api/miners/top?limit=many").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(addresses(&body), vec!["0xbbb2", "0xccc3"]);
        assert_eq!(bad_status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_miner_lookup_status_codes() {
        let (found, body) = get(state(), "/api/miners/0xccc3").await;
        let (missing, error) = get(state(), "/api/miners/0xdead").await;
        let long = format!("/api/miners/{}", "a".repeat(101));
        let (invalid, _) = get(state(), &long).await;

        assert_eq!(found, StatusCode::OK);
        assert_eq!(body["currentHashrate"], 200.0);
        assert_eq!(missing, StatusCode::NOT_FOUND);
        assert_eq!(error["error"], "Miner not found");
        assert_eq!(invalid, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_miner_risk() {
        let (status, body) = get(state(), "/api/miners/0xaaa1/risk").await;
        let (missing, _) = get(state(), "/api/miners/0xnone/risk").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["minerAddress"], "0xaaa1");
        assert_eq!(body["riskLevel"], "low");
        assert_eq!(missing, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_block_lookup_status_codes() {
        let (found, body) = get(state(), "/api/blocks/11").await;
        let (missing, _) = get(state(), "/api/blocks/12").await;
        let (invalid, error) = get(state(), "/api/blocks/abc").await;

        assert_eq!(found, StatusCode::OK);
        assert_eq!(body["number"], 11);
        assert_eq!(body["minerAddress"], "0xaaa1");
        assert_eq!(missing, StatusCode::NOT_FOUND);
        assert_eq!(invalid, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("Invalid block number"));
    }

    #[tokio::test]
    async fn test_recent_blocks_and_list() {
        let (_, recent) = get(state(), "/api/blocks/recent?limit=5").await;
        let (_, all) = get(state(), "/api/blocks").await;

        assert_eq!(recent.as_array().unwrap().len(), 1);
        assert_eq!(all[0]["number"], 11);
    }

    #[tokio::test]
    async fn test_search_routes() {
        let (status, exact) = get(state(), "/api/search?q=0xaaa1").await;
        let (_, block) = get(state(), "/api/search?q=11").await;
        let (_, none) = get(state(), "/api/search?q=zzz").await;
        let (missing_q, _) = get(state(), "/api/search").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(exact[0]["type"], "miner");
        assert_eq!(exact[0]["data"]["address"], "0xaaa1");
        assert_eq!(block[0]["type"], "block");
        assert_eq!(block.as_array().unwrap().len(), 1);
        assert!(none.as_array().unwrap().is_empty());
        assert_eq!(missing_q, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_forecast_needs_two_points() {
        let state = state();
        let (status, body) = get(state.clone(), "/api/forecast").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("Insufficient data"));

        for (i, hashrate) in [100.0, 110.0, 120.0].into_iter().enumerate() {
            state
                .store
                .push_time_series_point(TimeSeriesPoint::new(i as u64, hashrate));
        }
        let (status, body) = get(state, "/api/forecast").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trend"], "up");
        assert_eq!(body["current"], 120.0);
        assert!((body["predicted"].as_f64().unwrap() - 170.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_hashrate_and_summary() {
        let state = state();
        for ts in 0..5 {
            state
                .store
                .push_time_series_point(TimeSeriesPoint::new(ts, ts as f64));
        }

        let (_, points) = get(state.clone(), "/api/hashrate?limit=2").await;
        let (_, summary) = get(state, "/api/network/summary").await;

        assert_eq!(points[0]["timestamp"], 3);
        assert_eq!(points[1]["timestamp"], 4);
        assert_eq!(summary["minerCount"], 3);
        assert_eq!(summary["totalHashrate"], 600.0);
        assert_eq!(summary["totalBlocks"], 11);
    }
}
