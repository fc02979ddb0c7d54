// Exponential Moving Average (EMA)

/// EMA over `values`, seeded with the SMA of the first `period` values and
/// smoothed with `alpha = 2 / (period + 1)` afterwards.
///
/// Returns one value per input from index `period - 1` onwards, so the output
/// is `period - 1` shorter than the input. Inputs shorter than `period` (or a
/// zero period) give an empty vector.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut results = Vec::with_capacity(values.len() - period + 1);

    let initial_sum: f64 = values[..period].iter().sum();
    let mut previous_ema = initial_sum / period as f64;
    results.push(previous_ema);

    for value in &values[period..] {
        // Same as value*alpha + prev*(1-alpha), but exact when value == prev.
        previous_ema += (value - previous_ema) * multiplier;
        results.push(previous_ema);
    }
    results
}
