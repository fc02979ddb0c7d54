// Simple Moving Average (SMA)
use super::{ensure_candles, IndicatorCalculator};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

/// Mean of every full trailing window of `period` values. No partial windows:
/// the output is `period - 1` shorter than the input, and empty when the input
/// is shorter than `period` or `period` is zero.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|window| window.iter().sum::<f64>() / period as f64)
        .collect()
}

/// SMA of closing prices, used for the trend lines reported next to the oscillators.
pub struct Sma {
    name: String,
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            name: format!("SMA({})", period),
            period,
        }
    }
}

impl IndicatorCalculator for Sma {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn min_candles(&self) -> usize {
        self.period.max(1)
    }

    fn calculate(&self, data: &[Candle]) -> Result<f64, EngineError> {
        ensure_candles(data, self.min_candles())?;
        let closes: Vec<f64> = data[data.len() - self.period..].iter().map(|c| c.close).collect();
        sma(&closes, self.period)
            .last()
            .copied()
            .ok_or(EngineError::InsufficientData {
                required: self.min_candles(),
                available: data.len(),
            })
    }
}
