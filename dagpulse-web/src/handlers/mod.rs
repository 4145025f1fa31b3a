//! HTTP request handlers organized by functionality

pub mod api;
pub mod ws;

// Re-export handler functions
pub use api::{
    LimitQuery, SearchQuery, SortQuery, api_block, api_blocks, api_forecast, api_hashrate,
    api_miner, api_miner_risk, api_miners, api_network_summary, api_recent_blocks, api_search,
    api_stats, api_top_miners,
};
pub use ws::ws_handler;
