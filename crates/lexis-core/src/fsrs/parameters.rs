//! FSRS-6 parameter tables
//!
//! Weights are calibration data, not architecture: the model never hardcodes
//! them, it reads whichever named table it was built with. The table version
//! is written to every review log entry so a history can always be replayed
//! against the weights that produced it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Number of weights in an FSRS-6 table
pub const WEIGHT_COUNT: usize = 21;

/// Published FSRS-6 default weights
pub const FSRS6_WEIGHTS: [f64; WEIGHT_COUNT] = [
    0.212,  // w0  initial stability, fail
    1.2931, // w1  initial stability, hard
    2.3065, // w2  initial stability, success
    8.2956, // w3  initial stability, easy
    6.4133, // w4  initial difficulty
    0.8334, // w5  initial difficulty grade slope
    3.0194, // w6  difficulty delta
    0.001,  // w7  mean reversion toward D0(easy)
    1.8722, // w8  recall stability scale
    0.1666, // w9  recall stability decay
    0.796,  // w10 recall retrievability response
    1.4835, // w11 forget stability scale
    0.0614, // w12 forget difficulty exponent
    0.2629, // w13 forget stability exponent
    1.6483, // w14 forget retrievability response
    0.6014, // w15 hard penalty
    1.8729, // w16 easy bonus
    0.5425, // w17 short-term (unused)
    0.0912, // w18 short-term (unused)
    0.0658, // w19 short-term (unused)
    0.1542, // w20 forgetting curve decay
];

/// Version tag of [`FSRS6_WEIGHTS`]
pub const DEFAULT_PARAMS_VERSION: &str = "fsrs6-default";

/// A named, versioned FSRS-6 weight table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fsrs6Parameters {
    /// Recorded on every review log entry as `params_version`
    pub version: String,
    pub weights: [f64; WEIGHT_COUNT],
}

impl Default for Fsrs6Parameters {
    fn default() -> Self {
        Self {
            version: DEFAULT_PARAMS_VERSION.to_string(),
            weights: FSRS6_WEIGHTS,
        }
    }
}

impl Fsrs6Parameters {
    /// Build a table from custom weights
    pub fn new(version: impl Into<String>, weights: [f64; WEIGHT_COUNT]) -> Self {
        Self {
            version: version.into(),
            weights,
        }
    }

    /// Forgetting curve decay (w20)
    pub fn decay(&self) -> f64 {
        self.weights[20]
    }

    /// Reject tables the formulas cannot evaluate
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(SchedulerError::Config(
                "parameter table version must not be empty".to_string(),
            ));
        }
        if let Some(i) = self.weights.iter().position(|w| !w.is_finite()) {
            return Err(SchedulerError::Config(format!("weight w{} is not finite", i)));
        }
        // Initial stabilities and the forget scale feed divisions and powers
        for i in [0, 1, 2, 3, 11, 20] {
            if self.weights[i] <= 0.0 {
                return Err(SchedulerError::Config(format!(
                    "weight w{} must be positive, got {}",
                    i, self.weights[i]
                )));
            }
        }
        Ok(())
    }
}
