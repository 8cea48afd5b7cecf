//! Trend regime: the generator's short-term market mood.

use crate::noise::NoiseSource;
use shared::entity::market_state;

/// Fixed id of the single `market_state` checkpoint row.
pub const MARKET_STATE_ID: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Down,
    Sideways,
    Up,
}

impl Trend {
    /// Directional multiplier applied to the regime's pull on price.
    pub fn factor(self) -> f64 {
        match self {
            Trend::Down => -1.0,
            Trend::Sideways => 0.0,
            Trend::Up => 1.0,
        }
    }

    fn from_i32(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Trend::Down),
            0 => Some(Trend::Sideways),
            1 => Some(Trend::Up),
            _ => None,
        }
    }

    fn as_i32(self) -> i32 {
        match self {
            Trend::Down => -1,
            Trend::Sideways => 0,
            Trend::Up => 1,
        }
    }
}

/// Current trend direction, its pull strength, and a countdown of ticks
/// until the regime is redrawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regime {
    pub trend: Trend,
    pub strength: f64,
    pub duration: i32,
}

impl Regime {
    /// Neutral state used before any checkpoint exists. `duration` 0
    /// forces a resample on the first consuming tick.
    pub fn zero() -> Self {
        Regime {
            trend: Trend::Sideways,
            strength: 0.0,
            duration: 0,
        }
    }

    /// Draws a fresh regime: 20% up, 20% down, 60% sideways.
    pub fn resample<N: NoiseSource>(&mut self, noise: &mut N) {
        let r = noise.uniform();
        if r < 0.2 {
            self.trend = Trend::Up;
            self.strength = noise.uniform() * 2.0 + 1.0; // 1-3
            self.duration = (noise.uniform() * 10.0) as i32 + 5; // 5-15 ticks
        } else if r < 0.4 {
            self.trend = Trend::Down;
            self.strength = noise.uniform() * 2.0 + 1.0;
            self.duration = (noise.uniform() * 10.0) as i32 + 5;
        } else {
            self.trend = Trend::Sideways;
            self.strength = noise.uniform() * 0.5 + 0.1; // 0.1-0.6
            self.duration = (noise.uniform() * 20.0) as i32 + 10; // 10-30 ticks
        }
    }

    /// Resamples an exhausted regime, burns one tick of duration, and
    /// returns the state the tick should price against. This is the only
    /// mutation path besides [`Regime::resample`] itself.
    pub fn tick<N: NoiseSource>(&mut self, noise: &mut N) -> Regime {
        if self.duration <= 0 {
            self.resample(noise);
        }
        let used = *self;
        self.duration -= 1;
        used
    }

    /// Decodes a persisted checkpoint; unknown trend values or negative
    /// fields mean the row is unusable.
    pub fn from_record(record: &market_state::Model) -> Option<Self> {
        let trend = Trend::from_i32(record.trend)?;
        if record.strength < 0.0 || record.duration < 0 {
            return None;
        }
        Some(Regime {
            trend,
            strength: record.strength,
            duration: record.duration,
        })
    }

    pub fn to_record(self) -> market_state::Model {
        market_state::Model {
            id: MARKET_STATE_ID,
            trend: self.trend.as_i32(),
            strength: self.strength,
            duration: self.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{FixedNoise, ScriptedNoise};

    #[test]
    fn resample_up_branch() {
        let mut regime = Regime::zero();
        let mut noise = ScriptedNoise::new([0.1, 0.5, 0.5]);
        regime.resample(&mut noise);
        assert_eq!(regime.trend, Trend::Up);
        assert_eq!(regime.strength, 2.0);
        assert_eq!(regime.duration, 10);
    }

    #[test]
    fn resample_down_branch() {
        let mut regime = Regime::zero();
        let mut noise = ScriptedNoise::new([0.25, 0.0, 0.0]);
        regime.resample(&mut noise);
        assert_eq!(regime.trend, Trend::Down);
        assert_eq!(regime.strength, 1.0);
        assert_eq!(regime.duration, 5);
    }

    #[test]
    fn resample_sideways_branch() {
        let mut regime = Regime::zero();
        let mut noise = ScriptedNoise::new([0.9, 0.5, 0.5]);
        regime.resample(&mut noise);
        assert_eq!(regime.trend, Trend::Sideways);
        assert_eq!(regime.strength, 0.35);
        assert_eq!(regime.duration, 20);
    }

    #[test]
    fn tick_resamples_exhausted_regime_before_use() {
        let mut regime = Regime::zero();
        let mut noise = FixedNoise {
            uniform: 0.9,
            gaussian: 0.0,
        };
        let used = regime.tick(&mut noise);
        assert!(used.strength > 0.0);
        assert!(used.duration > 0);
        assert_eq!(regime.duration, used.duration - 1);
    }

    #[test]
    fn duration_never_goes_negative() {
        let mut regime = Regime::zero();
        let mut noise = FixedNoise {
            uniform: 0.9,
            gaussian: 0.0,
        };
        for _ in 0..100 {
            regime.tick(&mut noise);
            assert!(regime.duration >= 0);
        }
    }

    #[test]
    fn record_roundtrip() {
        let regime = Regime {
            trend: Trend::Down,
            strength: 1.5,
            duration: 7,
        };
        let record = regime.to_record();
        assert_eq!(record.id, MARKET_STATE_ID);
        assert_eq!(Regime::from_record(&record), Some(regime));
    }

    #[test]
    fn malformed_record_is_rejected() {
        let mut record = Regime::zero().to_record();
        record.trend = 7;
        assert_eq!(Regime::from_record(&record), None);

        let mut record = Regime::zero().to_record();
        record.duration = -3;
        assert_eq!(Regime::from_record(&record), None);
    }
}
