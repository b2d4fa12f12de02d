//! Random sources for the simulation.
//!
//! Every random branch (trend changes, event draws, opportunity draws) goes
//! through [`RandomSource`], so tests can swap the seeded ChaCha generator for
//! a scripted sequence.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of uniform random draws.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `[0, len)`. Returns 0 when `len` is 0.
    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.unit() * len as f64) as usize).min(len - 1)
    }

    /// Uniform integer in `[lo, hi]`.
    fn int_inclusive(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as usize;
        lo + self.index(span) as i32
    }

    /// `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }
}

/// Seeded generator used by live sessions.
#[derive(Clone, Debug)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SimRng {
    fn unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.inner.gen_range(0..len)
    }

    fn int_inclusive(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..=hi)
    }
}

/// Replays a fixed list of unit draws, then a fallback value forever.
///
/// The default fallback (0.999) makes every `chance(p)` with `p < 0.999` fail,
/// so ticks that are not under test stay quiet.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Clone, Debug)]
pub struct ScriptedRng {
    draws: std::collections::VecDeque<f64>,
    fallback: f64,
}

#[cfg(any(test, feature = "test-utils"))]
impl ScriptedRng {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            fallback: 0.999,
        }
    }

    /// A source that never triggers any chance roll.
    pub fn quiet() -> Self {
        Self::new([])
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Draws not consumed yet.
    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl RandomSource for ScriptedRng {
    fn unit(&mut self) -> f64 {
        self.draws.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut a = SimRng::seed_from_u64(7);
        let mut b = SimRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(a.unit(), b.unit());
            assert_eq!(a.int_inclusive(1, 3), b.int_inclusive(1, 3));
        }
    }

    #[test]
    fn seeded_ranges_are_bounded() {
        let mut rng = SimRng::seed_from_u64(1);
        for _ in 0..1_000 {
            let v = rng.int_inclusive(1, 3);
            assert!((1..=3).contains(&v));
            assert!(rng.index(9) < 9);
            let u = rng.unit();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn scripted_draws_map_like_floor() {
        let mut rng = ScriptedRng::new([0.0, 0.5, 0.99, 0.34, 0.67]);
        assert_eq!(rng.index(2), 0);
        assert_eq!(rng.index(2), 1);
        assert_eq!(rng.index(2), 1);
        assert_eq!(rng.int_inclusive(1, 3), 2);
        assert_eq!(rng.int_inclusive(1, 3), 3);
        assert_eq!(rng.remaining(), 0);
        assert!(!rng.chance(0.3));
    }

    #[test]
    fn chance_edges() {
        let mut rng = ScriptedRng::new([0.0, 0.2999, 0.3]);
        assert!(rng.chance(0.3));
        assert!(rng.chance(0.3));
        assert!(!rng.chance(0.3));
        assert_eq!(rng.index(0), 0);
    }
}
