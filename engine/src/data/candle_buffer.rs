// Bounded rolling window of candles for a single (symbol, timeframe) pair.
use shared::models::Candle;
use std::collections::VecDeque;

use crate::error::EngineError;

/// FIFO window holding at most `capacity` candles.
///
/// Candles are kept in arrival order. Out-of-order or duplicate timestamps are
/// not corrected here; the feed is expected to deliver them non-decreasing.
#[derive(Debug, Clone)]
pub struct CandleBuffer {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl CandleBuffer {
    pub fn new(capacity: usize) -> Self {
        CandleBuffer {
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `candle`, returning the oldest candle if it had to be evicted.
    pub fn append(&mut self, candle: Candle) -> Result<Option<Candle>, EngineError> {
        if !candle.is_finite() {
            return Err(EngineError::InvalidCandle(format!(
                "non-finite prices (high={}, low={}, close={})",
                candle.high, candle.low, candle.close
            )));
        }
        if self.capacity == 0 {
            return Ok(Some(candle));
        }
        let evicted = if self.candles.len() == self.capacity {
            self.candles.pop_front()
        } else {
            None
        };
        self.candles.push_back(candle);
        Ok(evicted)
    }

    /// The last `n` candles, oldest first.
    pub fn windowed(&self, n: usize) -> Result<Vec<Candle>, EngineError> {
        if self.candles.len() < n {
            return Err(EngineError::InsufficientData {
                required: n,
                available: self.candles.len(),
            });
        }
        Ok(self.candles.iter().skip(self.candles.len() - n).copied().collect())
    }

    /// The whole window as one contiguous slice, oldest first.
    pub fn as_slice(&mut self) -> &[Candle] {
        self.candles.make_contiguous()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the window size, dropping the oldest candles if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        while self.candles.len() > capacity {
            self.candles.pop_front();
        }
        self.capacity = capacity;
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }
}
