//! Pure candle synthesis: one function per lifecycle path (creation,
//! intra-candle update, gap backfill).

use crate::candle::Candle;
use crate::noise::NoiseSource;
use crate::regime::Regime;

/// Probability of a larger gaussian price shock between intervals.
const GAP_PROBABILITY: f64 = 0.002;
const GAP_SCALE: f64 = 3.0;
/// Gaussian jitter added to the open on top of the regime pull.
const OPEN_JITTER: f64 = 0.7;
const WICK_SCALE: f64 = 1.5;
const CLOSE_SCALE: f64 = 1.2;

/// Probability of a pump/dump move on an update tick.
const PUMP_PROBABILITY: f64 = 0.01;
const PUMP_SCALE: f64 = 8.0;
const UPDATE_NOISE: f64 = 0.7;
const UPDATE_WICK_PROBABILITY: f64 = 0.1;
const UPDATE_WICK_SCALE: f64 = 3.0;
const UPDATE_VOLUME_NOISE: f64 = 3.0;

/// Volume scales with the candle body and total range.
const VOLUME_BODY_WEIGHT: f64 = 8.0;
const VOLUME_RANGE_WEIGHT: f64 = 2.0;
const VOLUME_NOISE: f64 = 5.0;
const VOLUME_BASE: f64 = 20.0;
const VOLUME_MIN: f64 = 1.0;

/// Backfill candles take a smaller random-walk step and stay inside the
/// band inset by this fraction of its width per side.
const BACKFILL_INSET: f64 = 0.1;
const BACKFILL_STEP: f64 = 1.0;
const BACKFILL_WICK: f64 = 2.0;

/// Global price band with a reflection clamp: overshoot mirrors back into
/// range instead of piling up at the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub floor: f64,
    pub ceil: f64,
}

impl PriceBand {
    pub fn new(floor: f64, ceil: f64) -> Self {
        PriceBand { floor, ceil }
    }

    /// Mirrors overshoot back into range: `ceil + d` maps to `ceil - d`,
    /// symmetric at the floor. Values already in band pass through.
    pub fn reflect(&self, value: f64) -> f64 {
        let mut v = value;
        if v > self.ceil {
            v = self.ceil - (v - self.ceil);
        }
        if v < self.floor {
            v = self.floor + (self.floor - v);
        }
        v
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.floor, self.ceil)
    }

    /// Band shaved inward by `frac` of its width on each side.
    pub fn inset(&self, frac: f64) -> PriceBand {
        let margin = (self.ceil - self.floor) * frac;
        PriceBand::new(self.floor + margin, self.ceil - margin)
    }
}

/// Prices are stored rounded to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Synthesizes the candle opening a new interval from the previous close
/// (or the seed price when the store is empty).
pub fn next_candle<N: NoiseSource>(
    time: i64,
    last_close: Option<f64>,
    regime: Regime,
    band: PriceBand,
    seed_price: f64,
    noise: &mut N,
) -> Candle {
    let mut base = last_close.unwrap_or(seed_price);
    if noise.uniform() < GAP_PROBABILITY {
        base += noise.gaussian() * GAP_SCALE;
    }
    base = band.reflect(base);

    let pull = regime.trend.factor() * regime.strength * (noise.uniform() * 0.5 + 0.5);
    let open = round2(band.reflect(base + pull + noise.gaussian() * OPEN_JITTER));

    let mut high = band.reflect(open + (noise.gaussian() * WICK_SCALE).abs());
    let mut low = band.reflect(open - (noise.gaussian() * WICK_SCALE).abs());
    let mut close = open + noise.gaussian() * CLOSE_SCALE;
    high = round2(high.max(open));
    low = round2(low.min(open));
    close = round2(close.clamp(low, high));

    let volume = ((close - open).abs() * VOLUME_BODY_WEIGHT
        + (high - low) * VOLUME_RANGE_WEIGHT
        + noise.gaussian() * VOLUME_NOISE
        + VOLUME_BASE)
        .max(VOLUME_MIN)
        .floor();

    Candle {
        time,
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Advances the still-open candle by one update tick. `open` and `time`
/// are untouched; volume never decreases within an interval.
pub fn advance_candle<N: NoiseSource>(
    current: &Candle,
    regime: Regime,
    band: PriceBand,
    noise: &mut N,
) -> Candle {
    let mut delta = noise.gaussian() * UPDATE_NOISE;
    delta += regime.trend.factor() * regime.strength * (noise.uniform() * 0.3 + 0.2);
    if noise.uniform() < PUMP_PROBABILITY {
        delta += noise.gaussian() * PUMP_SCALE;
    }
    let new_close = band.reflect(round2(current.close + delta));

    let wick_up = if noise.uniform() < UPDATE_WICK_PROBABILITY {
        (noise.gaussian() * UPDATE_WICK_SCALE).abs()
    } else {
        0.0
    };
    let wick_down = if noise.uniform() < UPDATE_WICK_PROBABILITY {
        (noise.gaussian() * UPDATE_WICK_SCALE).abs()
    } else {
        0.0
    };
    let ext_high = band.reflect(round2(new_close + wick_up));
    let ext_low = band.reflect(round2(new_close - wick_down));
    let new_high = current.high.max(new_close).max(ext_high);
    let new_low = current.low.min(new_close).min(ext_low);

    let boost = delta.abs() * VOLUME_BODY_WEIGHT
        + (new_high - new_low) * VOLUME_RANGE_WEIGHT
        + noise.gaussian() * UPDATE_VOLUME_NOISE;
    let new_volume = current.volume + boost.floor().max(0.0);

    Candle {
        time: current.time,
        open: current.open,
        high: new_high,
        low: new_low,
        close: new_close,
        volume: new_volume,
    }
}

/// Lower-fidelity candle used to repair a gap: a small uniform random
/// walk from the previous backfilled close, kept inside the inset band so
/// repaired segments never hug the global boundary.
pub fn backfill_candle<N: NoiseSource>(
    time: i64,
    prev_close: f64,
    band: PriceBand,
    noise: &mut N,
) -> Candle {
    let inner = band.inset(BACKFILL_INSET);
    let base = round2(inner.clamp(prev_close + (noise.uniform() - 0.5) * 2.0 * BACKFILL_STEP));
    let raw_high = base + noise.uniform() * BACKFILL_WICK;
    let raw_low = base - noise.uniform() * BACKFILL_WICK;
    let close = round2(base + (noise.uniform() - 0.5) * 2.0 * BACKFILL_STEP);
    let high = round2(raw_high.max(base).max(close));
    let low = round2(raw_low.min(base).min(close));
    let volume = (noise.uniform() * 50.0).floor() + 10.0;

    Candle {
        time,
        open: base,
        high,
        low,
        close,
        volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{FixedNoise, ThreadRngNoise};
    use crate::regime::{Regime, Trend};

    const BAND: PriceBand = PriceBand {
        floor: 475.0,
        ceil: 525.0,
    };

    fn assert_valid(candle: &Candle, band: PriceBand) {
        assert!(candle.low <= candle.open.min(candle.close), "{candle:?}");
        assert!(candle.high >= candle.open.max(candle.close), "{candle:?}");
        assert!(candle.low >= band.floor && candle.high <= band.ceil, "{candle:?}");
        assert!(candle.volume >= 0.0);
        for price in [candle.open, candle.high, candle.low, candle.close] {
            assert_eq!(round2(price), price, "price not rounded: {price}");
        }
    }

    #[test]
    fn reflect_is_symmetric_at_bounds() {
        assert_eq!(BAND.reflect(525.0), 525.0);
        assert_eq!(BAND.reflect(475.0), 475.0);
        assert_eq!(BAND.reflect(525.25), 524.75);
        assert_eq!(BAND.reflect(474.5), 475.5);
    }

    #[test]
    fn reflect_is_idempotent() {
        for value in [474.2, 475.0, 500.0, 525.0, 526.8] {
            let once = BAND.reflect(value);
            assert_eq!(BAND.reflect(once), once);
        }
    }

    #[test]
    fn inset_shrinks_both_sides() {
        let inner = BAND.inset(0.1);
        assert_eq!(inner.floor, 480.0);
        assert_eq!(inner.ceil, 520.0);
    }

    #[test]
    fn next_candle_zero_noise_is_flat() {
        let mut noise = FixedNoise {
            uniform: 0.5,
            gaussian: 0.0,
        };
        let regime = Regime {
            trend: Trend::Sideways,
            strength: 0.35,
            duration: 10,
        };
        let candle = next_candle(900, Some(500.0), regime, BAND, 500.0, &mut noise);
        assert_eq!(candle.time, 900);
        assert_eq!(candle.open, 500.0);
        assert_eq!(candle.high, 500.0);
        assert_eq!(candle.low, 500.0);
        assert_eq!(candle.close, 500.0);
        assert_eq!(candle.volume, 20.0);
    }

    #[test]
    fn next_candle_seeds_from_default_price() {
        let mut noise = FixedNoise {
            uniform: 0.5,
            gaussian: 0.0,
        };
        let candle = next_candle(0, None, Regime::zero(), BAND, 512.0, &mut noise);
        assert_eq!(candle.open, 512.0);
    }

    #[test]
    fn next_candle_invariants_hold_under_random_noise() {
        let mut noise = ThreadRngNoise;
        let mut regime = Regime::zero();
        let mut last_close = None;
        for i in 0..1_000i64 {
            let used = regime.tick(&mut noise);
            let candle = next_candle(i * 180, last_close, used, BAND, 500.0, &mut noise);
            assert_valid(&candle, BAND);
            assert!(candle.volume >= 1.0);
            last_close = Some(candle.close);
        }
    }

    #[test]
    fn advance_candle_zero_noise_keeps_close_in_range() {
        let mut noise = FixedNoise {
            uniform: 0.5,
            gaussian: 0.0,
        };
        let current = Candle {
            time: 0,
            open: 500.0,
            high: 500.5,
            low: 499.5,
            close: 500.0,
            volume: 20.0,
        };
        let regime = Regime {
            trend: Trend::Sideways,
            strength: 0.35,
            duration: 10,
        };
        let updated = advance_candle(&current, regime, BAND, &mut noise);
        assert_eq!(updated.close, 500.0);
        assert!(updated.close >= updated.low && updated.close <= updated.high);
        assert_eq!(updated.high, 500.5);
        assert_eq!(updated.low, 499.5);
        // Range still feeds the volume term.
        assert_eq!(updated.volume, 22.0);
    }

    #[test]
    fn advance_candle_volume_is_monotone() {
        let mut noise = ThreadRngNoise;
        let mut regime = Regime::zero();
        let mut candle = Candle {
            time: 0,
            open: 500.0,
            high: 500.0,
            low: 500.0,
            close: 500.0,
            volume: 20.0,
        };
        for _ in 0..500 {
            let used = regime.tick(&mut noise);
            let updated = advance_candle(&candle, used, BAND, &mut noise);
            assert_valid(&updated, BAND);
            assert!(updated.volume >= candle.volume);
            assert_eq!(updated.open, candle.open);
            assert_eq!(updated.time, candle.time);
            // High/low only ever extend.
            assert!(updated.high >= candle.high);
            assert!(updated.low <= candle.low);
            candle = updated;
        }
    }

    #[test]
    fn backfill_walks_from_previous_close() {
        let mut noise = FixedNoise {
            uniform: 0.5,
            gaussian: 0.0,
        };
        let candle = backfill_candle(60, 499.0, BAND, &mut noise);
        assert_eq!(candle.open, 499.0);
        assert_eq!(candle.close, 499.0);
        assert_eq!(candle.high, 500.0);
        assert_eq!(candle.low, 498.0);
        assert_eq!(candle.volume, 35.0);
    }

    #[test]
    fn backfill_clamps_into_inset_band() {
        let mut noise = FixedNoise {
            uniform: 0.5,
            gaussian: 0.0,
        };
        let candle = backfill_candle(60, 524.0, BAND, &mut noise);
        assert_eq!(candle.open, 520.0);
        assert_valid(&candle, BAND);
    }

    #[test]
    fn backfill_invariants_hold_under_random_noise() {
        let mut noise = ThreadRngNoise;
        let mut prev_close = 500.0;
        for i in 0..1_000i64 {
            let candle = backfill_candle(i * 180, prev_close, BAND, &mut noise);
            assert_valid(&candle, BAND);
            assert!(candle.volume >= 10.0);
            prev_close = candle.close;
        }
    }
}
