// engine/src/services/indicator_service/mod.rs
// Multi-pair front door of the engine: routes candle events to their pair's
// pipeline and owns the settings every pipeline classifies against.
use chrono::{DateTime, Duration, Utc};
use shared::models::{CandleEvent, IndicatorSnapshot, TimeFrame, CROSS_EVENT_TTL_SECS};
use shared::utils::rank_by_buy_signals;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineSettings;
use crate::error::EngineError;

pub mod pair_pipeline;
pub mod replay;

pub use pair_pipeline::PairPipeline;
pub use replay::replay_concurrently;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub symbol: String,
    pub timeframe: TimeFrame,
}

impl PairKey {
    pub fn new(symbol: impl Into<String>, timeframe: TimeFrame) -> Self {
        PairKey {
            symbol: symbol.into(),
            timeframe,
        }
    }

    pub fn of(event: &CandleEvent) -> Self {
        PairKey::new(event.symbol.clone(), event.timeframe)
    }
}

pub struct IndicatorService {
    // Swapped whole on update, never mutated in place, so a batch holding a
    // clone keeps one consistent view.
    settings: Arc<EngineSettings>,
    pipelines: HashMap<PairKey, PairPipeline>,
}

impl IndicatorService {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        settings.validate()?;
        tracing::info!(max_candles = settings.max_candles, min_window = settings.min_window(), "Indicator service ready");
        Ok(IndicatorService {
            settings: Arc::new(settings),
            pipelines: HashMap::new(),
        })
    }

    pub fn settings(&self) -> Arc<EngineSettings> {
        Arc::clone(&self.settings)
    }

    /// Feeds one candle to its pair, creating the pair on first sight.
    pub fn process(&mut self, event: CandleEvent) -> Result<IndicatorSnapshot, EngineError> {
        let settings = Arc::clone(&self.settings);
        self.route(event, &settings)
    }

    /// Processes `events` in order against a single settings snapshot. Each
    /// event gets its own result; a rejected candle does not stop the batch.
    pub fn process_batch<I>(&mut self, events: I) -> Vec<Result<IndicatorSnapshot, EngineError>>
    where
        I: IntoIterator<Item = CandleEvent>,
    {
        let settings = Arc::clone(&self.settings);
        events.into_iter().map(|event| self.route(event, &settings)).collect()
    }

    /// Validates and installs `settings`, then reclassifies every pair's latest
    /// reading under them. Raw oscillator values are not recomputed. On a
    /// validation error the current settings stay in force.
    pub fn update_settings(&mut self, settings: EngineSettings) -> Result<Vec<IndicatorSnapshot>, EngineError> {
        if let Err(e) = settings.validate() {
            tracing::warn!(error = %e, "Rejected settings update");
            return Err(e);
        }
        let settings = Arc::new(settings);
        self.settings = Arc::clone(&settings);

        let mut keys: Vec<PairKey> = self.pipelines.keys().cloned().collect();
        keys.sort();
        let mut reclassified = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(pipeline) = self.pipelines.get_mut(&key) {
                pipeline.resize(settings.max_candles);
                reclassified.extend(pipeline.reclassify(&settings));
            }
        }
        tracing::info!(pairs = reclassified.len(), "Settings updated, pairs reclassified");
        Ok(reclassified)
    }

    pub fn snapshot(&self, symbol: &str, timeframe: TimeFrame) -> Option<&IndicatorSnapshot> {
        self.pipelines
            .get(&PairKey::new(symbol, timeframe))
            .and_then(PairPipeline::last_snapshot)
    }

    /// Latest snapshot per timeframe for `symbol`, shortest timeframe first.
    pub fn snapshots_for(&self, symbol: &str) -> Vec<&IndicatorSnapshot> {
        let mut snapshots: Vec<&IndicatorSnapshot> = self
            .pipelines
            .iter()
            .filter(|(key, _)| key.symbol == symbol)
            .filter_map(|(_, pipeline)| pipeline.last_snapshot())
            .collect();
        snapshots.sort_by_key(|s| s.timeframe);
        snapshots
    }

    pub fn pairs(&self) -> Vec<PairKey> {
        let mut keys: Vec<PairKey> = self.pipelines.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Symbols ordered by how many of their timeframes currently read
    /// buy-class, most first; ties by symbol.
    pub fn rank_by_buy_signals(&self) -> Vec<(String, usize)> {
        rank_by_buy_signals(self.pipelines.values().filter_map(PairPipeline::last_snapshot))
    }

    /// Latest snapshots whose cross fired less than `CROSS_EVENT_TTL_SECS`
    /// before `now`, ordered by pair.
    pub fn active_crosses(&self, now: DateTime<Utc>) -> Vec<&IndicatorSnapshot> {
        let ttl = Duration::seconds(CROSS_EVENT_TTL_SECS);
        let mut active: Vec<&IndicatorSnapshot> = self
            .pipelines
            .values()
            .filter_map(PairPipeline::last_snapshot)
            .filter(|s| s.cross_event.is_some_and(|e| e.is_active(now, ttl)))
            .collect();
        active.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.timeframe.cmp(&b.timeframe)));
        active
    }

    fn route(&mut self, event: CandleEvent, settings: &EngineSettings) -> Result<IndicatorSnapshot, EngineError> {
        let candle = event.candle();
        let pipeline = self.pipelines.entry(PairKey::of(&event)).or_insert_with(|| {
            tracing::info!(symbol = %event.symbol, timeframe = %event.timeframe, "Tracking new pair");
            PairPipeline::new(event.symbol.clone(), event.timeframe, settings.max_candles)
        });
        pipeline.update(candle, settings)
    }
}
