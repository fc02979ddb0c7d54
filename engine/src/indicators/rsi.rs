// Relative Strength Index (RSI) with Wilder smoothing
use super::{ensure_candles, IndicatorCalculator};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiReading {
    pub value: f64,
    pub avg_gain: f64,
    pub avg_loss: f64,
}

pub struct Rsi {
    name: String,
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            name: format!("RSI({})", period),
            period,
        }
    }

    pub fn required_candles(period: usize) -> usize {
        period + 1
    }

    /// One reading per candle from index `period` onwards.
    pub fn series(&self, data: &[Candle]) -> Result<Vec<RsiReading>, EngineError> {
        if self.period == 0 {
            return Err(EngineError::ConfigError("RSI period must be positive".to_string()));
        }
        ensure_candles(data, self.min_candles())?;

        let changes: Vec<f64> = data.windows(2).map(|w| w[1].close - w[0].close).collect();
        let period = self.period as f64;

        // Seed with plain averages over the first `period` changes.
        let (gains, losses) = changes[..self.period]
            .iter()
            .fold((0.0, 0.0), |(g, l), change| {
                if *change > 0.0 {
                    (g + change, l)
                } else {
                    (g, l - change) // losses are positive values
                }
            });
        let mut avg_gain = gains / period;
        let mut avg_loss = losses / period;

        let mut results = Vec::with_capacity(changes.len() - self.period + 1);
        results.push(reading(avg_gain, avg_loss));

        for change in &changes[self.period..] {
            let (current_gain, current_loss) = if *change > 0.0 {
                (*change, 0.0)
            } else {
                (0.0, -change)
            };
            avg_gain = (avg_gain * (period - 1.0) + current_gain) / period;
            avg_loss = (avg_loss * (period - 1.0) + current_loss) / period;
            results.push(reading(avg_gain, avg_loss));
        }
        Ok(results)
    }
}

fn reading(avg_gain: f64, avg_loss: f64) -> RsiReading {
    // No losses over the window: treated as a pure uptrend, including a flat one.
    let value = if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };
    RsiReading { value, avg_gain, avg_loss }
}

impl IndicatorCalculator for Rsi {
    type Output = RsiReading;

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn min_candles(&self) -> usize {
        Self::required_candles(self.period)
    }

    fn calculate(&self, data: &[Candle]) -> Result<RsiReading, EngineError> {
        let latest = self
            .series(data)?
            .pop()
            .ok_or(EngineError::InsufficientData {
                required: self.min_candles(),
                available: data.len(),
            })?;
        if !latest.value.is_finite() {
            tracing::warn!(indicator = %self.name, avg_gain = latest.avg_gain, avg_loss = latest.avg_loss, "Non-finite RSI output");
            return Err(EngineError::NumericDegeneracy(format!(
                "{} produced {} (avg_gain={}, avg_loss={})",
                self.name, latest.value, latest.avg_gain, latest.avg_loss
            )));
        }
        Ok(latest)
    }
}
