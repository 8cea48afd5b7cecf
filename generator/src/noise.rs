//! Randomness source for the synthesizer.

use rand::Rng;
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Uniform + derived-normal random source.
///
/// The synthesizer consumes randomness only through this trait, so tests
/// can substitute a deterministic generator and assert exact outputs.
pub trait NoiseSource: Send {
    /// Uniform draw in [0, 1).
    fn uniform(&mut self) -> f64;

    /// Standard normal variate via the Box-Muller transform. Zero draws
    /// are rejected; ln(0) is undefined.
    fn gaussian(&mut self) -> f64 {
        let mut u = 0.0;
        while u == 0.0 {
            u = self.uniform();
        }
        let mut v = 0.0;
        while v == 0.0 {
            v = self.uniform();
        }
        (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
    }
}

/// Production source backed by the thread-local rand generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngNoise;

impl NoiseSource for ThreadRngNoise {
    fn uniform(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Deterministic source replaying a scripted sequence of uniform draws.
/// Panics when the script runs out.
pub struct ScriptedNoise {
    draws: VecDeque<f64>,
}

impl ScriptedNoise {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.draws.is_empty()
    }
}

impl NoiseSource for ScriptedNoise {
    fn uniform(&mut self) -> f64 {
        self.draws.pop_front().expect("noise script exhausted")
    }
}

/// Deterministic source pinning both draws. `gaussian` is overridden so a
/// forced zero-noise path is expressible directly.
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise {
    pub uniform: f64,
    pub gaussian: f64,
}

impl NoiseSource for FixedNoise {
    fn uniform(&mut self) -> f64 {
        self.uniform
    }

    fn gaussian(&mut self) -> f64 {
        self.gaussian
    }
}
