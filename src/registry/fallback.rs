//! Fallback thresholds for tokens listed without one

use rand::prelude::*;
use rand::rngs::StdRng;

/// Upper bound used when no maximum is configured
pub const DEFAULT_MAX_RANDOM_THRESHOLD: f64 = 1000.0;

/// Source of thresholds for tokens whose list entry has none
pub trait ThresholdFallback: Send {
    fn fallback_threshold(&mut self) -> f64;
}

/// Uniform whole-number draw from `[0, max)`
///
/// Unseeded instances assign a different threshold on every load.
pub struct RandomThreshold {
    max: f64,
    rng: StdRng,
}

impl RandomThreshold {
    /// Create a fallback with optional seed
    pub fn new(max: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let max = if max.is_finite() {
            max
        } else {
            DEFAULT_MAX_RANDOM_THRESHOLD
        };
        Self { max, rng }
    }

    pub fn from_entropy(max: f64) -> Self {
        Self::new(max, None)
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl ThresholdFallback for RandomThreshold {
    fn fallback_threshold(&mut self) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        let u: f64 = self.rng.gen();
        (u * self.max).floor()
    }
}

/// Constant fallback
#[derive(Debug, Clone, Copy)]
pub struct FixedThreshold(pub f64);

impl ThresholdFallback for FixedThreshold {
    fn fallback_threshold(&mut self) -> f64 {
        self.0
    }
}
