//! Injectable source of uniform random numbers.
//!
//! Every randomized step in the crate (scale-factor jitter, synthetic
//! sample shape factors, landmark jitter, confidence variation) draws from a
//! [`RandomSource`] passed in by the caller. Any `rand` generator works:
//!
//! ```
//! use body_measure::RandomSource;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let u = rng.next_f64();
//! assert!((0.0..1.0).contains(&u));
//! ```

use rand::{Rng, RngCore};

/// A source of uniform floats in `[0, 1)`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    /// Uniform draw in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Uniform integer in `[low, high]`.
    fn uniform_inclusive(&mut self, low: u32, high: u32) -> u32 {
        let span = f64::from(high - low + 1);
        let offset = (self.next_f64() * span).floor() as u32;
        low + offset.min(high - low)
    }
}

impl<R: RngCore> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Returns the same value on every draw. Useful for reproducing exact outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSource(f64);

impl ConstantSource {
    /// Values outside `[0, 1)` are clamped into range.
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0 - f64::EPSILON))
    }

    /// The midpoint source: every symmetric jitter evaluates to zero.
    pub fn midpoint() -> Self {
        Self(0.5)
    }
}

impl RandomSource for ConstantSource {
    fn next_f64(&mut self) -> f64 {
        self.0
    }
}
