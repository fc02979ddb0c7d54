// Helpers shared by the engine and any presentation collaborator.
use crate::models::{IndicatorSnapshot, SignalType};
use std::collections::BTreeMap;

/// Number of buy-class readings (near-buy, buy, extreme-buy) among `signals`.
/// Used to rank symbols by how many of their timeframes lean bullish.
pub fn count_buy_signals<'a, I>(signals: I) -> usize
where
    I: IntoIterator<Item = &'a SignalType>,
{
    signals.into_iter().filter(|s| s.is_buy_class()).count()
}

/// Same count taken over a symbol's snapshots; not-ready snapshots count as none.
pub fn count_buy_snapshots<'a, I>(snapshots: I) -> usize
where
    I: IntoIterator<Item = &'a IndicatorSnapshot>,
{
    count_buy_signals(snapshots.into_iter().filter_map(|s| s.signal.as_ref()))
}

/// Symbols ordered by how many of their timeframes read buy-class, most
/// first; ties by symbol. Only the last snapshot seen for each
/// (symbol, timeframe) counts, so a full replay history can be passed as is.
pub fn rank_by_buy_signals<'a, I>(snapshots: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a IndicatorSnapshot>,
{
    let mut latest: BTreeMap<(&str, _), &IndicatorSnapshot> = BTreeMap::new();
    for snapshot in snapshots {
        latest.insert((snapshot.symbol.as_str(), snapshot.timeframe), snapshot);
    }

    let mut per_symbol: BTreeMap<&str, Vec<&IndicatorSnapshot>> = BTreeMap::new();
    for ((symbol, _), snapshot) in latest {
        per_symbol.entry(symbol).or_default().push(snapshot);
    }

    let mut ranking: Vec<(String, usize)> = per_symbol
        .into_iter()
        .map(|(symbol, snaps)| (symbol.to_string(), count_buy_snapshots(snaps)))
        .collect();
    ranking.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranking
}
