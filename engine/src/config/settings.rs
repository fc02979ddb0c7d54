// Engine settings, loaded from a JSON file or taken from defaults
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::EngineError;
use crate::indicators::{Rsi, WaveTrend};
use crate::signals::TRANSITION_BAND;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTrendSettings {
    pub channel_length: usize,
    pub average_length: usize,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub extreme_buy_threshold: f64,
    pub extreme_sell_threshold: f64,
    /// Level that raises the snapshot's `overbought` flag.
    pub overbought: f64,
    /// Level that raises the snapshot's `oversold` flag.
    pub oversold: f64,
    /// A cross-under only becomes a sell above this level.
    pub cross_overbought: f64,
    /// A cross-over only becomes a buy below this level.
    pub cross_oversold: f64,
}

impl Default for WaveTrendSettings {
    fn default() -> Self {
        WaveTrendSettings {
            channel_length: 10,
            average_length: 21,
            buy_threshold: -53.0,
            sell_threshold: 53.0,
            extreme_buy_threshold: -80.0,
            extreme_sell_threshold: 80.0,
            overbought: 60.0,
            oversold: -60.0,
            cross_overbought: 53.0,
            cross_oversold: -53.0,
        }
    }
}

impl WaveTrendSettings {
    pub fn min_candles(&self) -> usize {
        WaveTrend::required_candles(self.channel_length, self.average_length)
    }

    /// Upper edge of the near-buy band.
    pub fn near_buy_level(&self) -> f64 {
        self.buy_threshold + self.buy_threshold.abs() * TRANSITION_BAND
    }

    /// Lower edge of the near-sell band.
    pub fn near_sell_level(&self) -> f64 {
        self.sell_threshold - self.sell_threshold.abs() * TRANSITION_BAND
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.channel_length == 0 || self.average_length == 0 {
            return Err(EngineError::ConfigError(format!(
                "WaveTrend lengths must be positive (channel_length={}, average_length={})",
                self.channel_length, self.average_length
            )));
        }
        let levels = [
            ("buy_threshold", self.buy_threshold),
            ("sell_threshold", self.sell_threshold),
            ("extreme_buy_threshold", self.extreme_buy_threshold),
            ("extreme_sell_threshold", self.extreme_sell_threshold),
            ("overbought", self.overbought),
            ("oversold", self.oversold),
            ("cross_overbought", self.cross_overbought),
            ("cross_oversold", self.cross_oversold),
        ];
        if let Some((name, value)) = levels.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EngineError::ConfigError(format!("{} must be finite, got {}", name, value)));
        }
        if self.buy_threshold >= self.sell_threshold {
            return Err(EngineError::ConfigError(format!(
                "buy_threshold ({}) must be below sell_threshold ({})",
                self.buy_threshold, self.sell_threshold
            )));
        }
        if self.near_buy_level() >= self.near_sell_level() {
            return Err(EngineError::ConfigError(format!(
                "near-buy band (up to {}) overlaps near-sell band (from {}); widen the gap between buy_threshold ({}) and sell_threshold ({})",
                self.near_buy_level(),
                self.near_sell_level(),
                self.buy_threshold,
                self.sell_threshold
            )));
        }
        if self.extreme_buy_threshold > self.buy_threshold {
            return Err(EngineError::ConfigError(format!(
                "extreme_buy_threshold ({}) must not be above buy_threshold ({})",
                self.extreme_buy_threshold, self.buy_threshold
            )));
        }
        if self.extreme_sell_threshold < self.sell_threshold {
            return Err(EngineError::ConfigError(format!(
                "extreme_sell_threshold ({}) must not be below sell_threshold ({})",
                self.extreme_sell_threshold, self.sell_threshold
            )));
        }
        if self.oversold >= self.overbought {
            return Err(EngineError::ConfigError(format!(
                "oversold ({}) must be below overbought ({})",
                self.oversold, self.overbought
            )));
        }
        if self.cross_oversold >= self.cross_overbought {
            return Err(EngineError::ConfigError(format!(
                "cross_oversold ({}) must be below cross_overbought ({})",
                self.cross_oversold, self.cross_overbought
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiSettings {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RsiSettings {
    fn default() -> Self {
        RsiSettings {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

impl RsiSettings {
    pub fn min_candles(&self) -> usize {
        Rsi::required_candles(self.period)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.period == 0 {
            return Err(EngineError::ConfigError("RSI period must be positive".to_string()));
        }
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(self.oversold) || !in_range(self.overbought) || self.oversold >= self.overbought {
            return Err(EngineError::ConfigError(format!(
                "RSI levels must satisfy 0 <= oversold < overbought <= 100 (oversold={}, overbought={})",
                self.oversold, self.overbought
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Rolling window kept per (symbol, timeframe) pair.
    pub max_candles: usize,
    pub sma_fast_period: usize,
    pub sma_slow_period: usize,
    pub wavetrend: WaveTrendSettings,
    pub rsi: RsiSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_candles: 250,
            sma_fast_period: 50,
            sma_slow_period: 200,
            wavetrend: WaveTrendSettings::default(),
            rsi: RsiSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Reads settings from a JSON file. Missing keys fall back to defaults; the
    /// result is validated before it is returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let settings: EngineSettings = serde_json::from_str(&raw)?;
        settings.validate()?;
        tracing::info!(path = %path.display(), max_candles = settings.max_candles, "Loaded engine settings");
        Ok(settings)
    }

    /// Smallest window that lets both oscillators produce a value.
    pub fn min_window(&self) -> usize {
        self.wavetrend.min_candles().max(self.rsi.min_candles())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.wavetrend.validate()?;
        self.rsi.validate()?;
        if self.sma_fast_period == 0 || self.sma_slow_period == 0 {
            return Err(EngineError::ConfigError("SMA periods must be positive".to_string()));
        }
        let required = self.min_window();
        if self.max_candles < required {
            return Err(EngineError::ConfigError(format!(
                "max_candles ({}) is below the {} candles the indicators need",
                self.max_candles, required
            )));
        }
        Ok(())
    }
}
