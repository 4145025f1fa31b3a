//! Local fold over the push stream.

use dagpulse_core::broadcast::BroadcastEnvelope;
use dagpulse_core::config::{ClientConfig, ForecastConfig};
use dagpulse_core::forecast::{Forecast, ForecastError, Forecaster};
use dagpulse_core::store::TimeSeriesBuffer;
use dagpulse_core::types::{BlockRecord, StatsSnapshot, TimeSeriesPoint};

use crate::ClientError;

/// Noteworthy transitions derived while folding.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewSignal {
    /// Stats reported a higher block height than the previous snapshot
    NewBlockFound { height: u64, reward: f64 },
    /// Price rose above the previous snapshot by the milestone ratio
    PriceMilestone { previous: f64, price: f64 },
}

/// What a subscriber knows about the network.
///
/// Survives reconnects: a fresh catch-up burst is folded into the existing
/// state rather than replacing it.
#[derive(Debug, Clone)]
pub struct ViewState {
    stats: Option<StatsSnapshot>,
    latest_block: Option<BlockRecord>,
    history: TimeSeriesBuffer,
    price_milestone_ratio: f64,
    forecaster: Forecaster,
}

impl ViewState {
    pub fn new(client: &ClientConfig, forecast: &ForecastConfig) -> Self {
        Self {
            stats: None,
            latest_block: None,
            history: TimeSeriesBuffer::with_capacity(client.history_capacity),
            price_milestone_ratio: client.price_milestone_ratio,
            forecaster: Forecaster::new(forecast.horizon_steps),
        }
    }

    /// Folds one envelope and reports any transitions it caused.
    pub fn apply(&mut self, envelope: BroadcastEnvelope) -> Vec<ViewSignal> {
        match envelope {
            BroadcastEnvelope::StatsUpdate(stats) => self.apply_stats(stats),
            BroadcastEnvelope::NewBlock(block) => {
                self.latest_block = Some(block);
                Vec::new()
            }
            BroadcastEnvelope::TimeSeriesPoint(point) => {
                self.apply_point(point);
                Vec::new()
            }
        }
    }

    /// Decodes a text frame and folds it.
    ///
    /// # Errors
    ///
    /// - `ClientError::Decode` - Frame is not a known envelope; state is untouched
    pub fn apply_frame(&mut self, frame: &str) -> Result<Vec<ViewSignal>, ClientError> {
        let envelope =
            BroadcastEnvelope::from_json(frame).map_err(|source| ClientError::Decode { source })?;
        Ok(self.apply(envelope))
    }

    fn apply_stats(&mut self, stats: StatsSnapshot) -> Vec<ViewSignal> {
        let mut signals = Vec::new();

        if let Some(previous) = &self.stats {
            if stats.block_height > previous.block_height {
                signals.push(ViewSignal::NewBlockFound {
                    height: stats.block_height,
                    reward: stats.block_reward,
                });
            }
            if stats.price > previous.price * self.price_milestone_ratio {
                signals.push(ViewSignal::PriceMilestone {
                    previous: previous.price,
                    price: stats.price,
                });
            }
        }

        self.stats = Some(stats);
        signals
    }

    fn apply_point(&mut self, point: TimeSeriesPoint) {
        // replayed catch-up points are not newer than what we hold
        if let Some(last) = self.history.last() {
            if point.timestamp <= last.timestamp {
                return;
            }
        }
        self.history.push(point);
    }

    pub fn stats(&self) -> Option<&StatsSnapshot> {
        self.stats.as_ref()
    }

    pub fn latest_block(&self) -> Option<&BlockRecord> {
        self.latest_block.as_ref()
    }

    /// Buffered points, oldest first.
    pub fn history(&self) -> Vec<TimeSeriesPoint> {
        self.history.to_vec()
    }

    /// Projects the buffered hashrate.
    ///
    /// # Errors
    ///
    /// - `ForecastError::InsufficientData` - Fewer than two buffered points
    pub fn forecast(&self) -> Result<Forecast, ForecastError> {
        self.forecaster.project(&self.history.to_vec())
    }
}
