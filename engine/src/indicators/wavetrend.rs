//! WaveTrend oscillator.
//!
//! ```text
//! ap  = hlc3
//! esa = ema(ap, n1)
//! d   = ema(|ap - esa|, n1)
//! ci  = (ap - esa) / (0.015 * d)
//! wt1 = ema(ci, n2)
//! wt2 = sma(wt1, 4)
//! ```
//!
//! Every series is aligned on the candle it ends at: `esa` starts at candle
//! `n1 - 1`, `d` and `ci` at `2 * (n1 - 1)`, `wt1` at `2 * (n1 - 1) + n2 - 1`
//! and `wt2` three candles later.
use super::{ema, ensure_candles, sma, IndicatorCalculator};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

pub const SIGNAL_LENGTH: usize = 4;
const CI_SCALE: f64 = 0.015;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveTrendReading {
    pub wt1: f64,
    pub wt2: f64,
    /// `(wt1, wt2)` one candle earlier, when the window is long enough to have it.
    pub previous: Option<(f64, f64)>,
}

/// Full oscillator history over a window. `wt1` and `wt2` are end-aligned:
/// `wt2[i]` belongs to the same candle as `wt1[i + SIGNAL_LENGTH - 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveTrendSeries {
    pub wt1: Vec<f64>,
    pub wt2: Vec<f64>,
}

pub struct WaveTrend {
    name: String,
    channel_length: usize,
    average_length: usize,
}

impl WaveTrend {
    pub fn new(channel_length: usize, average_length: usize) -> Self {
        Self {
            name: format!("WT({},{})", channel_length, average_length),
            channel_length,
            average_length,
        }
    }

    /// Candles needed before the first `wt2` value exists.
    ///
    /// `esa` and `d` are chained EMAs that each consume `n1 - 1` seed candles,
    /// and `ci` only starts where both are defined. Then `wt1` adds `n2 - 1`
    /// and the signal line `SIGNAL_LENGTH`. The looser `max(n1, n2) + 13` bound
    /// would let the first values come from a zero-padded `d`.
    pub fn required_candles(channel_length: usize, average_length: usize) -> usize {
        2 * channel_length.saturating_sub(1) + average_length.saturating_sub(1) + SIGNAL_LENGTH
    }

    pub fn series(&self, data: &[Candle]) -> Result<WaveTrendSeries, EngineError> {
        ensure_candles(data, self.min_candles())?;
        let n1 = self.channel_length;
        let n2 = self.average_length;
        let not_ready = |stage: &str| {
            tracing::debug!(indicator = %self.name, stage, candles = data.len(), "WaveTrend stage produced no values");
            EngineError::InsufficientData {
                required: self.min_candles(),
                available: data.len(),
            }
        };

        let ap: Vec<f64> = data.iter().map(Candle::hlc3).collect();

        let esa = ema(&ap, n1);
        if esa.is_empty() {
            return Err(not_ready("esa"));
        }

        // esa[j] belongs to ap[j + n1 - 1].
        let deviation: Vec<f64> = ap[n1 - 1..]
            .iter()
            .zip(&esa)
            .map(|(price, avg)| (price - avg).abs())
            .collect();
        let d = ema(&deviation, n1);
        if d.is_empty() {
            return Err(not_ready("d"));
        }

        // d[k] belongs to deviation[k + n1 - 1], i.e. ap[k + 2 * (n1 - 1)].
        let ci: Vec<f64> = ap[2 * (n1 - 1)..]
            .iter()
            .zip(&esa[n1 - 1..])
            .zip(&d)
            .map(|((price, avg), dev)| {
                if *dev == 0.0 || !dev.is_finite() {
                    0.0
                } else {
                    (price - avg) / (CI_SCALE * dev)
                }
            })
            .collect();

        let wt1 = ema(&ci, n2);
        if wt1.is_empty() {
            return Err(not_ready("wt1"));
        }
        let wt2 = sma(&wt1, SIGNAL_LENGTH);
        if wt2.is_empty() {
            return Err(not_ready("wt2"));
        }

        Ok(WaveTrendSeries { wt1, wt2 })
    }
}

impl IndicatorCalculator for WaveTrend {
    type Output = WaveTrendReading;

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "channel_length": self.channel_length,
            "average_length": self.average_length,
        })
    }

    fn min_candles(&self) -> usize {
        Self::required_candles(self.channel_length, self.average_length)
    }

    fn calculate(&self, data: &[Candle]) -> Result<WaveTrendReading, EngineError> {
        let WaveTrendSeries { wt1, wt2 } = self.series(data)?;

        let latest = (wt1[wt1.len() - 1], wt2[wt2.len() - 1]);
        if !latest.0.is_finite() || !latest.1.is_finite() {
            tracing::warn!(indicator = %self.name, wt1 = latest.0, wt2 = latest.1, "Non-finite WaveTrend output");
            return Err(EngineError::NumericDegeneracy(format!(
                "{} produced wt1={}, wt2={}",
                self.name, latest.0, latest.1
            )));
        }

        let previous = if wt2.len() >= 2 {
            Some((wt1[wt1.len() - 2], wt2[wt2.len() - 2])).filter(|(a, b)| a.is_finite() && b.is_finite())
        } else {
            None
        };

        Ok(WaveTrendReading {
            wt1: latest.0,
            wt2: latest.1,
            previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle::new(high, low, close)
    }

    fn oscillating(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let mid = 100.0 + (i as f64 * 0.35).sin() * 5.0 + i as f64 * 0.05;
                candle(mid + 1.0, mid - 1.0, mid + 0.25)
            })
            .collect()
    }

    #[test]
    fn test_required_candles_for_defaults() {
        assert_eq!(WaveTrend::required_candles(10, 21), 42);
        assert!(WaveTrend::required_candles(10, 21) >= 10usize.max(21) + 13);
    }

    #[test]
    fn test_not_ready_below_lookback() {
        let wt = WaveTrend::new(10, 21);
        for len in [0, 1, 20, 41] {
            let err = wt.calculate(&oscillating(len)).unwrap_err();
            assert!(
                matches!(err, EngineError::InsufficientData { required: 42, available } if available == len),
                "expected not-ready for {} candles, got {:?}",
                len,
                err
            );
        }
    }

    #[test]
    fn test_ready_at_lookback() {
        let wt = WaveTrend::new(10, 21);
        let reading = wt.calculate(&oscillating(42)).unwrap();
        assert!(reading.wt1.is_finite() && reading.wt2.is_finite());
        assert!(reading.previous.is_none());

        let reading = wt.calculate(&oscillating(43)).unwrap();
        assert!(reading.previous.is_some());
    }

    #[test]
    fn test_constant_prices_yield_zero() {
        let candles = vec![candle(101.0, 99.0, 100.0); 60];
        let reading = WaveTrend::new(10, 21).calculate(&candles).unwrap();
        assert_eq!(reading.wt1, 0.0);
        assert_eq!(reading.wt2, 0.0);
        assert_eq!(reading.previous, Some((0.0, 0.0)));
    }

    #[test]
    fn test_series_lengths_and_signal_line() {
        let candles = oscillating(60);
        let series = WaveTrend::new(10, 21).series(&candles).unwrap();
        // 60 - 2*9 - 20 = 22 wt1 values, 19 wt2 values.
        assert_eq!(series.wt1.len(), 22);
        assert_eq!(series.wt2.len(), 19);
        let last4: f64 = series.wt1[series.wt1.len() - 4..].iter().sum::<f64>() / 4.0;
        assert!((series.wt2[series.wt2.len() - 1] - last4).abs() < 1e-9);
    }

    #[test]
    fn test_rally_pushes_wt1_positive() {
        let mut candles = vec![candle(101.0, 99.0, 100.0); 40];
        for i in 1..=10 {
            let p = 100.0 + i as f64 * 2.0;
            candles.push(candle(p + 1.0, p - 1.0, p));
        }
        let reading = WaveTrend::new(10, 21).calculate(&candles).unwrap();
        assert!(reading.wt1 > 0.0, "wt1 = {}", reading.wt1);
        // The signal line lags a rising wt1.
        assert!(reading.wt1 > reading.wt2);
    }

    #[test]
    fn test_calculation_is_deterministic() {
        let candles = oscillating(80);
        let wt = WaveTrend::new(10, 21);
        assert_eq!(wt.calculate(&candles).unwrap(), wt.calculate(&candles).unwrap());
    }

    #[test]
    fn test_zero_lengths_are_not_ready() {
        let err = WaveTrend::new(0, 21).calculate(&oscillating(60)).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_parameters() {
        let wt = WaveTrend::new(9, 12);
        assert_eq!(wt.name(), "WT(9,12)");
        assert_eq!(wt.parameters()["channel_length"], 9);
        assert_eq!(wt.parameters()["average_length"], 12);
    }
}
