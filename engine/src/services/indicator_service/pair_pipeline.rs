// Per-pair update pipeline: buffer -> engines -> classification -> snapshot
use chrono::{DateTime, Utc};
use shared::models::{Candle, CrossEvent, CrossKind, IndicatorSnapshot, TimeFrame, TradeSignal};

use crate::config::EngineSettings;
use crate::data::CandleBuffer;
use crate::error::EngineError;
use crate::indicators::{IndicatorCalculator, Rsi, Sma, WaveTrend, WaveTrendReading};
use crate::signals::{classify, classify_rsi, detect_cross, generate_wt_signal};

/// Raw engine output for the latest candle, kept so classification can be
/// redone under new thresholds without touching the oscillator history.
#[derive(Debug, Clone, PartialEq)]
struct RawReading {
    timestamp: Option<DateTime<Utc>>,
    price: f64,
    wavetrend: Option<WaveTrendReading>,
    rsi: Option<f64>,
    sma_fast: Option<f64>,
    sma_slow: Option<f64>,
}

/// Owns the candle window of one (symbol, timeframe) pair. Not shared: the
/// task or thread that owns it is the only writer.
#[derive(Debug, Clone)]
pub struct PairPipeline {
    symbol: String,
    timeframe: TimeFrame,
    buffer: CandleBuffer,
    last_reading: Option<RawReading>,
    last_snapshot: Option<IndicatorSnapshot>,
}

impl PairPipeline {
    pub fn new(symbol: impl Into<String>, timeframe: TimeFrame, max_candles: usize) -> Self {
        PairPipeline {
            symbol: symbol.into(),
            timeframe,
            buffer: CandleBuffer::new(max_candles),
            last_reading: None,
            last_snapshot: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    pub fn buffer(&self) -> &CandleBuffer {
        &self.buffer
    }

    pub fn last_snapshot(&self) -> Option<&IndicatorSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Appends `candle` and recomputes everything over the window.
    ///
    /// Indicators without enough history come back as `None` in the snapshot;
    /// only a candle the buffer refuses is an error.
    pub fn update(&mut self, candle: Candle, settings: &EngineSettings) -> Result<IndicatorSnapshot, EngineError> {
        if let Err(e) = self.buffer.append(candle) {
            tracing::warn!(symbol = %self.symbol, timeframe = %self.timeframe, error = %e, "Rejected candle");
            return Err(e);
        }

        let reading = self.compute(candle, settings);
        let snapshot = self.build_snapshot(&reading, settings);
        tracing::debug!(
            symbol = %self.symbol,
            timeframe = %self.timeframe,
            candles = self.buffer.len(),
            wt1 = ?snapshot.wt1,
            wt2 = ?snapshot.wt2,
            rsi = ?snapshot.rsi,
            signal = ?snapshot.signal,
            "Indicators updated"
        );
        if let Some(cross) = &snapshot.cross_event {
            tracing::info!(symbol = %self.symbol, timeframe = %self.timeframe, kind = ?cross.kind, trade_signal = ?snapshot.trade_signal, "Cross detected");
        }

        self.last_reading = Some(reading);
        self.last_snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Rebuilds the latest snapshot's classification under `settings`.
    /// Returns `None` if no candle has been processed yet.
    pub fn reclassify(&mut self, settings: &EngineSettings) -> Option<IndicatorSnapshot> {
        let reading = self.last_reading.as_ref()?;
        let snapshot = self.build_snapshot(reading, settings);
        self.last_snapshot = Some(snapshot.clone());
        Some(snapshot)
    }

    pub(crate) fn resize(&mut self, max_candles: usize) {
        self.buffer.set_capacity(max_candles);
    }

    fn compute(&mut self, candle: Candle, settings: &EngineSettings) -> RawReading {
        let wt = WaveTrend::new(settings.wavetrend.channel_length, settings.wavetrend.average_length);
        let rsi = Rsi::new(settings.rsi.period);
        let sma_fast = Sma::new(settings.sma_fast_period);
        let sma_slow = Sma::new(settings.sma_slow_period);

        let (symbol, timeframe) = (self.symbol.as_str(), self.timeframe);
        let data = self.buffer.as_slice();

        RawReading {
            timestamp: candle.timestamp,
            price: candle.close,
            wavetrend: indicator_value(&wt, data, symbol, timeframe),
            rsi: indicator_value(&rsi, data, symbol, timeframe).map(|r| r.value),
            sma_fast: indicator_value(&sma_fast, data, symbol, timeframe),
            sma_slow: indicator_value(&sma_slow, data, symbol, timeframe),
        }
    }

    fn build_snapshot(&self, reading: &RawReading, settings: &EngineSettings) -> IndicatorSnapshot {
        let wt_settings = &settings.wavetrend;
        let wt = reading.wavetrend;

        let cross = wt.and_then(|r| r.previous.and_then(|(p1, p2)| detect_cross(r.wt1, r.wt2, p1, p2)));
        let trade_signal = wt
            .and_then(|r| r.previous.map(|(p1, p2)| generate_wt_signal(r.wt1, r.wt2, p1, p2, wt_settings)))
            .unwrap_or(TradeSignal::Neutral);

        IndicatorSnapshot {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            timestamp: reading.timestamp,
            price: reading.price,
            wt1: wt.map(|r| r.wt1),
            wt2: wt.map(|r| r.wt2),
            rsi: reading.rsi,
            signal: wt.map(|r| classify(r.wt1, wt_settings)),
            trade_signal,
            rsi_signal: reading.rsi.map(|v| classify_rsi(v, &settings.rsi)),
            cross_event: cross.map(|kind| CrossEvent {
                kind,
                timestamp: reading.timestamp,
            }),
            cross_over: cross == Some(CrossKind::CrossOver),
            cross_under: cross == Some(CrossKind::CrossUnder),
            overbought: wt.is_some_and(|r| r.wt1 >= wt_settings.overbought),
            oversold: wt.is_some_and(|r| r.wt1 <= wt_settings.oversold),
            sma_fast: reading.sma_fast,
            sma_slow: reading.sma_slow,
            price_above_sma_fast: reading.sma_fast.is_some_and(|sma| reading.price > sma),
        }
    }
}

// Not-ready is the normal state while the window fills; anything else is logged louder.
fn indicator_value<C: IndicatorCalculator>(
    calculator: &C,
    data: &[Candle],
    symbol: &str,
    timeframe: TimeFrame,
) -> Option<C::Output> {
    match calculator.calculate(data) {
        Ok(value) => Some(value),
        Err(e) if e.is_recoverable() => {
            tracing::debug!(%symbol, %timeframe, indicator = calculator.name(), reason = %e, "Indicator not ready");
            None
        }
        Err(e) => {
            tracing::error!(
                %symbol,
                %timeframe,
                indicator = calculator.name(),
                parameters = %calculator.parameters(),
                error = %e,
                "Indicator calculation failed"
            );
            None
        }
    }
}
