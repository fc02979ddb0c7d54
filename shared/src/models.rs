use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How long a cross event stays worth highlighting after it fires.
pub const CROSS_EVENT_TTL_SECS: i64 = 5;

/// A single price bar. Only the fields the indicators read are kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Candle {
    pub fn new(high: f64, low: f64, close: f64) -> Self {
        Self { high, low, close, timestamp: None }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Average of high, low and close.
    pub fn hlc3(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    pub fn is_finite(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// A candle as delivered by the market-data feed, still carrying its routing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleEvent {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub timestamp: DateTime<Utc>,
}

impl CandleEvent {
    pub fn candle(&self) -> Candle {
        Candle {
            high: self.high,
            low: self.low,
            close: self.close,
            timestamp: Some(self.timestamp),
        }
    }
}

/// Candle interval. Ordered by duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeFrame {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 8] = [
        TimeFrame::Minute1,
        TimeFrame::Minute5,
        TimeFrame::Minute15,
        TimeFrame::Minute30,
        TimeFrame::Hour1,
        TimeFrame::Hour4,
        TimeFrame::Day1,
        TimeFrame::Week1,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            TimeFrame::Minute1 => 1,
            TimeFrame::Minute5 => 5,
            TimeFrame::Minute15 => 15,
            TimeFrame::Minute30 => 30,
            TimeFrame::Hour1 => 60,
            TimeFrame::Hour4 => 4 * 60,
            TimeFrame::Day1 => 24 * 60,
            TimeFrame::Week1 => 7 * 24 * 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Minute1 => "1m",
            TimeFrame::Minute5 => "5m",
            TimeFrame::Minute15 => "15m",
            TimeFrame::Minute30 => "30m",
            TimeFrame::Hour1 => "1h",
            TimeFrame::Hour4 => "4h",
            TimeFrame::Day1 => "1d",
            TimeFrame::Week1 => "1w",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        TimeFrame::ALL
            .into_iter()
            .find(|tf| {
                let name = tf.as_str();
                // Feeds use "1M" for a month, so minute labels must match exactly.
                if name.ends_with('m') {
                    name == label
                } else {
                    name.eq_ignore_ascii_case(label)
                }
            })
            .ok_or_else(|| format!("Unknown timeframe '{}'", s))
    }
}

/// WaveTrend classification of a single reading.
///
/// Variants are declared from most bearish to most bullish so that the derived
/// `Ord` sorts by bullishness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum SignalType {
    ExtremeSell,
    Sell,
    NearSell,
    Neutral,
    NearBuy,
    Buy,
    ExtremeBuy,
}

impl SignalType {
    pub fn is_buy_class(&self) -> bool {
        matches!(self, SignalType::NearBuy | SignalType::Buy | SignalType::ExtremeBuy)
    }

    pub fn is_sell_class(&self) -> bool {
        matches!(self, SignalType::NearSell | SignalType::Sell | SignalType::ExtremeSell)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalType::ExtremeSell => "extreme-sell",
            SignalType::Sell => "sell",
            SignalType::NearSell => "near-sell",
            SignalType::Neutral => "neutral",
            SignalType::NearBuy => "near-buy",
            SignalType::Buy => "buy",
            SignalType::ExtremeBuy => "extreme-buy",
        };
        f.write_str(label)
    }
}

/// Actionable signal: a wt1/wt2 cross that happened inside the gated zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradeSignal {
    Buy,
    Sell,
    #[default]
    Neutral,
}

/// RSI reading against its overbought/oversold levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RsiSignal {
    Buy,
    Sell,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CrossKind {
    CrossOver,
    CrossUnder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrossEvent {
    #[serde(rename = "type")]
    pub kind: CrossKind,
    pub timestamp: Option<DateTime<Utc>>,
}

impl CrossEvent {
    /// Whether the event is still inside its display window at `now`.
    /// Events without a timestamp are never considered active.
    pub fn is_active(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.timestamp {
            Some(ts) => now >= ts && now - ts < ttl,
            None => false,
        }
    }
}

/// Everything the core knows about a (symbol, timeframe) pair after one update.
///
/// Indicator fields are `None` until their engine has enough candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub timestamp: Option<DateTime<Utc>>,
    pub price: f64,
    pub wt1: Option<f64>,
    pub wt2: Option<f64>,
    pub rsi: Option<f64>,
    pub signal: Option<SignalType>,
    pub trade_signal: TradeSignal,
    pub rsi_signal: Option<RsiSignal>,
    pub cross_event: Option<CrossEvent>,
    pub cross_over: bool,
    pub cross_under: bool,
    pub overbought: bool,
    pub oversold: bool,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub price_above_sma_fast: bool,
}

impl IndicatorSnapshot {
    pub fn is_ready(&self) -> bool {
        self.signal.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse_and_display() {
        for tf in TimeFrame::ALL {
            assert_eq!(tf.to_string().parse::<TimeFrame>().unwrap(), tf);
        }
        assert_eq!("4H".parse::<TimeFrame>().unwrap(), TimeFrame::Hour4);
        assert!("2m".parse::<TimeFrame>().is_err());
    }

    #[test]
    fn test_uppercase_m_is_not_a_minute() {
        assert!("1M".parse::<TimeFrame>().is_err());
        assert!("15M".parse::<TimeFrame>().is_err());
        assert_eq!("1D".parse::<TimeFrame>().unwrap(), TimeFrame::Day1);
        assert_eq!("1W".parse::<TimeFrame>().unwrap(), TimeFrame::Week1);
    }

    #[test]
    fn test_timeframe_orders_by_duration() {
        let mut frames = vec![TimeFrame::Hour4, TimeFrame::Minute1, TimeFrame::Day1, TimeFrame::Minute15];
        frames.sort();
        assert_eq!(frames, vec![TimeFrame::Minute1, TimeFrame::Minute15, TimeFrame::Hour4, TimeFrame::Day1]);
        assert!(TimeFrame::ALL.windows(2).all(|w| w[0].minutes() < w[1].minutes()));
    }

    #[test]
    fn test_signal_type_orders_by_bullishness() {
        assert!(SignalType::ExtremeBuy > SignalType::Buy);
        assert!(SignalType::Buy > SignalType::NearBuy);
        assert!(SignalType::NearBuy > SignalType::Neutral);
        assert!(SignalType::Neutral > SignalType::NearSell);
        assert!(SignalType::NearSell > SignalType::Sell);
        assert!(SignalType::Sell > SignalType::ExtremeSell);
    }

    #[test]
    fn test_buy_and_sell_classes_are_disjoint() {
        let all = [
            SignalType::ExtremeSell,
            SignalType::Sell,
            SignalType::NearSell,
            SignalType::Neutral,
            SignalType::NearBuy,
            SignalType::Buy,
            SignalType::ExtremeBuy,
        ];
        for s in all {
            assert!(!(s.is_buy_class() && s.is_sell_class()), "{}", s);
            assert_eq!(s.is_buy_class(), s > SignalType::Neutral);
            assert_eq!(s.is_sell_class(), s < SignalType::Neutral);
        }
    }

    #[test]
    fn test_signal_type_serializes_kebab_case() {
        let json = serde_json::to_string(&SignalType::ExtremeBuy).unwrap();
        assert_eq!(json, "\"extreme-buy\"");
        assert_eq!(SignalType::NearSell.to_string(), "near-sell");
    }

    #[test]
    fn test_cross_event_ttl() {
        let fired = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let event = CrossEvent { kind: CrossKind::CrossOver, timestamp: Some(fired) };
        let ttl = Duration::seconds(CROSS_EVENT_TTL_SECS);
        assert!(event.is_active(fired + Duration::seconds(4), ttl));
        assert!(!event.is_active(fired + Duration::seconds(5), ttl));

        let untimed = CrossEvent { kind: CrossKind::CrossUnder, timestamp: None };
        assert!(!untimed.is_active(fired, ttl));
    }

    #[test]
    fn test_candle_hlc3() {
        let candle = Candle::new(12.0, 6.0, 9.0);
        assert_eq!(candle.hlc3(), 9.0);
        assert!(candle.is_finite());
        assert!(!Candle::new(f64::NAN, 1.0, 1.0).is_finite());
    }
}
