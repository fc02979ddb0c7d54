//! Maps oscillator readings onto discrete signals.
//!
//! Two consumers read these: display colouring uses [`classify`], alerting uses
//! the cross-gated [`generate_wt_signal`].
use crate::config::{RsiSettings, WaveTrendSettings};
use shared::models::{CrossKind, RsiSignal, SignalType, TradeSignal};

/// Width of the "near" band, as a fraction of the threshold's magnitude.
pub const TRANSITION_BAND: f64 = 0.05;

/// Threshold ladder; the first matching rung wins.
pub fn classify(wt1: f64, settings: &WaveTrendSettings) -> SignalType {
    if !wt1.is_finite() {
        tracing::warn!(wt1, "Refusing to classify a non-finite WaveTrend value");
        return SignalType::Neutral;
    }

    let buy_zone = settings.near_buy_level();
    let sell_zone = settings.near_sell_level();

    if wt1 <= settings.extreme_buy_threshold {
        SignalType::ExtremeBuy
    } else if wt1 >= settings.extreme_sell_threshold {
        SignalType::ExtremeSell
    } else if wt1 <= settings.buy_threshold {
        SignalType::Buy
    } else if wt1 <= buy_zone {
        SignalType::NearBuy
    } else if wt1 >= settings.sell_threshold {
        SignalType::Sell
    } else if wt1 >= sell_zone {
        SignalType::NearSell
    } else {
        SignalType::Neutral
    }
}

/// wt1 crossing its signal line between the previous and the current reading.
pub fn detect_cross(wt1: f64, wt2: f64, prev_wt1: f64, prev_wt2: f64) -> Option<CrossKind> {
    if prev_wt1 <= prev_wt2 && wt1 > wt2 {
        Some(CrossKind::CrossOver)
    } else if prev_wt1 >= prev_wt2 && wt1 < wt2 {
        Some(CrossKind::CrossUnder)
    } else {
        None
    }
}

/// A cross is only actionable inside the gated zone: a cross-over below
/// `cross_oversold` buys, a cross-under above `cross_overbought` sells.
pub fn generate_wt_signal(
    wt1: f64,
    wt2: f64,
    prev_wt1: f64,
    prev_wt2: f64,
    settings: &WaveTrendSettings,
) -> TradeSignal {
    match detect_cross(wt1, wt2, prev_wt1, prev_wt2) {
        Some(CrossKind::CrossOver) if wt1 < settings.cross_oversold => TradeSignal::Buy,
        Some(CrossKind::CrossUnder) if wt1 > settings.cross_overbought => TradeSignal::Sell,
        _ => TradeSignal::Neutral,
    }
}

pub fn classify_rsi(rsi: f64, settings: &RsiSettings) -> RsiSignal {
    if rsi >= settings.overbought {
        RsiSignal::Sell
    } else if rsi <= settings.oversold {
        RsiSignal::Buy
    } else {
        RsiSignal::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_ladder() {
        let s = WaveTrendSettings::default();
        assert_eq!(classify(-90.0, &s), SignalType::ExtremeBuy);
        assert_eq!(classify(-80.0, &s), SignalType::ExtremeBuy);
        assert_eq!(classify(-53.0, &s), SignalType::Buy);
        assert_eq!(classify(-50.35, &s), SignalType::NearBuy);
        assert_eq!(classify(-50.0, &s), SignalType::Neutral);
        assert_eq!(classify(0.0, &s), SignalType::Neutral);
        assert_eq!(classify(50.0, &s), SignalType::Neutral);
        assert_eq!(classify(50.35, &s), SignalType::NearSell);
        assert_eq!(classify(53.0, &s), SignalType::Sell);
        assert_eq!(classify(80.0, &s), SignalType::ExtremeSell);
        assert_eq!(classify(90.0, &s), SignalType::ExtremeSell);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let s = WaveTrendSettings::default();
        let mut previous = classify(-120.0, &s);
        let mut wt = -120.0;
        while wt <= 120.0 {
            let current = classify(wt, &s);
            assert!(current <= previous, "{} at {} after {}", current, wt, previous);
            previous = current;
            wt += 0.25;
        }
    }

    #[test]
    fn test_classify_custom_thresholds() {
        let s = WaveTrendSettings {
            buy_threshold: -40.0,
            sell_threshold: 40.0,
            extreme_buy_threshold: -70.0,
            extreme_sell_threshold: 70.0,
            ..WaveTrendSettings::default()
        };
        assert_eq!(classify(-39.0, &s), SignalType::NearBuy);
        assert_eq!(classify(-37.0, &s), SignalType::Neutral);
        assert_eq!(classify(39.0, &s), SignalType::NearSell);
        assert_eq!(classify(-71.0, &s), SignalType::ExtremeBuy);
    }

    #[test]
    fn test_classify_non_finite_is_neutral() {
        let s = WaveTrendSettings::default();
        assert_eq!(classify(f64::NAN, &s), SignalType::Neutral);
        assert_eq!(classify(f64::NEG_INFINITY, &s), SignalType::Neutral);
    }

    #[test]
    fn test_detect_cross() {
        assert_eq!(detect_cross(13.0, 11.0, 10.0, 12.0), Some(CrossKind::CrossOver));
        assert_eq!(detect_cross(9.0, 11.0, 12.0, 10.0), Some(CrossKind::CrossUnder));
        // Touching then separating counts as a cross.
        assert_eq!(detect_cross(5.0, 4.0, 3.0, 3.0), Some(CrossKind::CrossOver));
        assert_eq!(detect_cross(14.0, 11.0, 13.0, 12.0), None);
        assert_eq!(detect_cross(3.0, 3.0, 1.0, 2.0), None);
    }

    #[test]
    fn test_generate_wt_signal_gating() {
        let s = WaveTrendSettings::default();
        // Cross-over deep in oversold territory.
        assert_eq!(generate_wt_signal(-60.0, -62.0, -65.0, -63.0, &s), TradeSignal::Buy);
        // Same cross in neutral territory is only a cross.
        assert_eq!(generate_wt_signal(13.0, 11.0, 10.0, 12.0, &s), TradeSignal::Neutral);
        // Cross-under in overbought territory.
        assert_eq!(generate_wt_signal(60.0, 62.0, 65.0, 63.0, &s), TradeSignal::Sell);
        assert_eq!(generate_wt_signal(9.0, 11.0, 12.0, 10.0, &s), TradeSignal::Neutral);
        // No cross at all.
        assert_eq!(generate_wt_signal(-70.0, -60.0, -71.0, -61.0, &s), TradeSignal::Neutral);
    }

    #[test]
    fn test_classify_rsi() {
        let s = RsiSettings::default();
        assert_eq!(classify_rsi(75.0, &s), RsiSignal::Sell);
        assert_eq!(classify_rsi(70.0, &s), RsiSignal::Sell);
        assert_eq!(classify_rsi(30.0, &s), RsiSignal::Buy);
        assert_eq!(classify_rsi(50.0, &s), RsiSignal::Neutral);
    }
}
