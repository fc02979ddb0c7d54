// Technical indicators module
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod wavetrend;

pub use ema::ema;
pub use rsi::{Rsi, RsiReading};
pub use sma::{sma, Sma};
pub use wavetrend::{WaveTrend, WaveTrendReading, WaveTrendSeries};

use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

// Common trait for the candle-driven indicators
pub trait IndicatorCalculator: Send + Sync {
    type Output;

    fn name(&self) -> &str;
    fn parameters(&self) -> Value; // Parameters used for this indicator instance
    fn min_candles(&self) -> usize;
    /// Latest value over `data`, or `InsufficientData` when `data` is shorter
    /// than `min_candles()`.
    fn calculate(&self, data: &[Candle]) -> Result<Self::Output, EngineError>;
}

pub(crate) fn ensure_candles(data: &[Candle], required: usize) -> Result<(), EngineError> {
    if data.len() < required {
        return Err(EngineError::InsufficientData {
            required,
            available: data.len(),
        });
    }
    Ok(())
}
