// Concurrent replay: one task per (symbol, timeframe) pair
use shared::models::{CandleEvent, IndicatorSnapshot};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::{PairKey, PairPipeline};
use crate::config::EngineSettings;
use crate::error::EngineError;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 1024;

/// Replays `events` with every pair processed on its own task.
///
/// Pairs share nothing but the read-only `settings`, so no locking is needed.
/// Within a pair, events keep their input order; the returned snapshots are
/// grouped by pair in key order. A pair whose task fails is logged and
/// dropped without affecting the rest.
pub async fn replay_concurrently(
    events: Vec<CandleEvent>,
    settings: Arc<EngineSettings>,
) -> Result<Vec<IndicatorSnapshot>, EngineError> {
    settings.validate()?;

    let mut by_pair: BTreeMap<PairKey, Vec<CandleEvent>> = BTreeMap::new();
    for event in events {
        by_pair.entry(PairKey::of(&event)).or_default().push(event);
    }
    tracing::info!(pairs = by_pair.len(), "Starting concurrent replay");

    let (tx, mut rx) = mpsc::channel::<IndicatorSnapshot>(SNAPSHOT_CHANNEL_CAPACITY);
    let mut tasks = JoinSet::new();

    for (key, pair_events) in by_pair {
        let tx = tx.clone();
        let settings = Arc::clone(&settings);
        tasks.spawn(async move {
            let mut pipeline = PairPipeline::new(key.symbol.clone(), key.timeframe, settings.max_candles);
            let mut rejected = 0usize;
            for event in pair_events {
                match pipeline.update(event.candle(), &settings) {
                    Ok(snapshot) => {
                        if tx.send(snapshot).await.is_err() {
                            tracing::warn!(symbol = %key.symbol, timeframe = %key.timeframe, "Snapshot receiver dropped, stopping pair");
                            break;
                        }
                    }
                    Err(_) => rejected += 1,
                }
            }
            (key, rejected)
        });
    }
    // Only the tasks hold senders now; the channel closes when the last one ends.
    drop(tx);

    let mut snapshots = Vec::new();
    while let Some(snapshot) = rx.recv().await {
        snapshots.push(snapshot);
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((key, rejected)) if rejected > 0 => {
                tracing::warn!(symbol = %key.symbol, timeframe = %key.timeframe, rejected, "Pair finished with rejected candles");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Pair task failed"),
        }
    }

    // Stable sort keeps each pair's own order.
    snapshots.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.timeframe.cmp(&b.timeframe)));
    Ok(snapshots)
}
