//! One-step-ahead hashrate projection by ordinary least squares.
//!
//! The point index `i = 1..n` is the independent variable, so the horizon is
//! measured in samples rather than wall-clock time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TimeSeriesPoint;

/// Minimum number of samples needed to fit a line.
pub const MIN_FORECAST_POINTS: usize = 2;

const CONFIDENCE_FLOOR: f64 = 50.0;
const CONFIDENCE_CEILING: f64 = 100.0;

/// Forecasting failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForecastError {
    #[error("Insufficient data for forecast: {available} points, need at least {required}")]
    InsufficientData { available: usize, required: usize },
}

/// Direction of the fitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    /// Labels a slope by its sign.
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Trend::Up
        } else if slope < 0.0 {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

/// Result of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Projected value, never negative
    pub predicted: f64,
    /// Heuristic confidence percentage in `[50, 100]`
    pub confidence: u8,
    pub trend: Trend,
    /// Most recent observed value
    pub current: f64,
    /// Fitted slope per sample
    pub slope: f64,
}

/// Least-squares projector with a fixed horizon.
#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    horizon_steps: u32,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self { horizon_steps: 5 }
    }
}

impl Forecaster {
    pub fn new(horizon_steps: u32) -> Self {
        Self { horizon_steps }
    }

    pub fn horizon_steps(&self) -> u32 {
        self.horizon_steps
    }

    /// Projects `horizon_steps` samples past the last point.
    ///
    /// # Errors
    ///
    /// - `ForecastError::InsufficientData` - Fewer than two points
    pub fn project(&self, points: &[TimeSeriesPoint]) -> Result<Forecast, ForecastError> {
        let values: Vec<f64> = points.iter().map(|point| point.hashrate).collect();
        self.project_values(&values)
    }

    /// Same as [`Forecaster::project`] over raw values, oldest first.
    ///
    /// # Errors
    ///
    /// - `ForecastError::InsufficientData` - Fewer than two values
    pub fn project_values(&self, values: &[f64]) -> Result<Forecast, ForecastError> {
        let (slope, current) = match (fit_slope(values), values.last()) {
            (Some(slope), Some(&current)) => (slope, current),
            _ => {
                return Err(ForecastError::InsufficientData {
                    available: values.len(),
                    required: MIN_FORECAST_POINTS,
                });
            }
        };

        let predicted = (current + slope * f64::from(self.horizon_steps)).max(0.0);

        Ok(Forecast {
            predicted,
            confidence: confidence(predicted, current).round() as u8,
            trend: Trend::from_slope(slope),
            current,
            slope,
        })
    }
}

/// Closed-form OLS slope over `(i, values[i-1])` for `i = 1..n`.
///
/// Returns `None` for fewer than two values.
pub fn fit_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < MIN_FORECAST_POINTS {
        return None;
    }

    let n_f = n as f64;
    let sum_x = n_f * (n_f + 1.0) / 2.0;
    let sum_x2 = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 6.0;
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values
        .iter()
        .enumerate()
        .map(|(index, value)| (index + 1) as f64 * value)
        .sum();

    let denominator = n_f * sum_x2 - sum_x * sum_x;
    Some((n_f * sum_xy - sum_x * sum_y) / denominator)
}

/// A zero current value pins confidence to the floor.
fn confidence(predicted: f64, current: f64) -> f64 {
    if current == 0.0 {
        return CONFIDENCE_FLOOR;
    }
    let variance = (predicted - current).abs() / current;
    (CONFIDENCE_CEILING - variance * 100.0).clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(a: f64, b: f64, n: usize) -> Vec<f64> {
        (1..=n).map(|i| a + b * i as f64).collect()
    }

    #[test]
    fn test_linear_input_recovers_slope_and_projection() {
        let forecaster = Forecaster::default();
        for (a, b, n) in [(10.0, 2.5, 30), (1_000.0, -3.0, 12), (5e9, 1e7, 7), (0.5, 0.0, 2)] {
            let values = linear(a, b, n);

            let forecast = forecaster.project_values(&values).unwrap();

            assert!((forecast.slope - b).abs() < 1e-6 * b.abs().max(1.0));
            let expected = (a + b * (n as f64 + 5.0)).max(0.0);
            assert!(
                (forecast.predicted - expected).abs() < 1e-6 * expected.abs().max(1.0),
                "predicted {} expected {}",
                forecast.predicted,
                expected
            );
        }
    }

    #[test]
    fn test_trend_follows_slope_sign() {
        let forecaster = Forecaster::default();
        assert_eq!(
            forecaster.project_values(&[1.0, 2.0, 3.0]).unwrap().trend,
            Trend::Up
        );
        assert_eq!(
            forecaster.project_values(&[3.0, 2.0, 1.0]).unwrap().trend,
            Trend::Down
        );
        assert_eq!(
            forecaster.project_values(&[5.0, 5.0, 5.0, 5.0]).unwrap().trend,
            Trend::Stable
        );
    }

    #[test]
    fn test_insufficient_data() {
        let forecaster = Forecaster::default();
        assert_eq!(
            forecaster.project_values(&[]),
            Err(ForecastError::InsufficientData {
                available: 0,
                required: 2
            })
        );
        assert_eq!(
            forecaster.project(&[TimeSeriesPoint::new(1, 10.0)]),
            Err(ForecastError::InsufficientData {
                available: 1,
                required: 2
            })
        );
    }

    #[test]
    fn test_prediction_never_negative() {
        let forecast = Forecaster::default()
            .project_values(&[100.0, 50.0, 10.0])
            .unwrap();
        assert_eq!(forecast.predicted, 0.0);
        assert_eq!(forecast.trend, Trend::Down);
    }

    #[test]
    fn test_confidence_bounds() {
        let forecaster = Forecaster::default();

        let flat = forecaster.project_values(&[10.0, 10.0]).unwrap();
        assert_eq!(flat.confidence, 100);

        // slope 1 over last value 100: 5% variance
        let gentle = forecaster.project_values(&[99.0, 100.0]).unwrap();
        assert_eq!(gentle.confidence, 95);

        let steep = forecaster.project_values(&[1.0, 100.0]).unwrap();
        assert_eq!(steep.confidence, 50);
    }

    #[test]
    fn test_zero_last_value_uses_confidence_floor() {
        let forecast = Forecaster::default().project_values(&[4.0, 0.0]).unwrap();
        assert_eq!(forecast.current, 0.0);
        assert_eq!(forecast.confidence, 50);
    }

    #[test]
    fn test_confidence_serializes_as_integer() {
        let forecast = Forecaster::default().project_values(&[99.0, 100.0]).unwrap();

        let json = serde_json::to_value(forecast).unwrap();

        assert_eq!(json["confidence"], serde_json::json!(95));
        assert!(json["confidence"].is_u64());
        assert_eq!(json["trend"], "up");
    }

    #[test]
    fn test_custom_horizon() {
        let forecast = Forecaster::new(1).project_values(&linear(0.0, 2.0, 4)).unwrap();
        assert!((forecast.predicted - 10.0).abs() < 1e-9);
    }
}
