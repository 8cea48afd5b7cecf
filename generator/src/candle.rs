//! OHLCV candle records.

use serde::{Deserialize, Serialize};
use shared::entity::candles;

/// One fixed-length bucket of synthetic price/volume activity.
///
/// The most recent candle stays mutable (close/high/low/volume advance on
/// every update tick) until the next interval opens; older candles are
/// immutable history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, unix seconds quantized to the candle interval.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Total range (high - low).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Body size (absolute difference between open and close).
    pub fn body_size(&self) -> f64 {
        (self.close - self.open).abs()
    }
}

impl From<candles::Model> for Candle {
    fn from(model: candles::Model) -> Self {
        Candle {
            time: model.time,
            open: model.open,
            high: model.high,
            low: model.low,
            close: model.close,
            volume: model.volume,
        }
    }
}

/// Partial update applied to the still-open candle, keyed by its time
/// bucket. `open` and `time` never change after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandlePatch {
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

impl From<&Candle> for CandlePatch {
    fn from(candle: &Candle) -> Self {
        CandlePatch {
            close: candle.close,
            high: candle.high,
            low: candle.low,
            volume: candle.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_helpers() {
        let candle = Candle {
            time: 0,
            open: 500.0,
            high: 502.0,
            low: 499.0,
            close: 501.0,
            volume: 20.0,
        };
        assert_eq!(candle.range(), 3.0);
        assert_eq!(candle.body_size(), 1.0);
    }

    #[test]
    fn patch_takes_mutable_fields_only() {
        let candle = Candle {
            time: 60,
            open: 500.0,
            high: 502.0,
            low: 499.0,
            close: 501.0,
            volume: 20.0,
        };
        let patch = CandlePatch::from(&candle);
        assert_eq!(patch.close, 501.0);
        assert_eq!(patch.high, 502.0);
        assert_eq!(patch.low, 499.0);
        assert_eq!(patch.volume, 20.0);
    }
}
