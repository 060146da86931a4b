//! FSRS-6 formulas
//!
//! Pure functions over a weight table. Grades are numeric 1..=4 inside the
//! formulas; callers pass [`Grade`].

use super::grade::Grade;
use super::parameters::WEIGHT_COUNT;

type Weights = [f64; WEIGHT_COUNT];

// ============================================================================
// CONSTANTS
// ============================================================================

/// Lower difficulty bound
pub const MIN_DIFFICULTY: f64 = 1.0;

/// Upper difficulty bound
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Floor applied to stability inside the retrievability divisor
pub const STABILITY_FLOOR: f64 = 1e-4;

/// Retention at which interval equals stability
pub const REFERENCE_RETENTION: f64 = 0.9;

// ============================================================================
// FORGETTING CURVE
// ============================================================================

/// F = 0.9^(-1/decay) - 1
pub fn decay_factor(decay: f64) -> f64 {
    REFERENCE_RETENTION.powf(-1.0 / decay) - 1.0
}

/// Probability of recall after `elapsed_days` at the given stability
pub fn retrievability(elapsed_days: f64, stability: f64, decay: f64) -> f64 {
    let factor = decay_factor(decay);
    (1.0 + factor * elapsed_days / stability.max(STABILITY_FLOOR)).powf(-decay)
}

/// Days until retrievability falls to `target_retention`
pub fn next_interval(stability: f64, target_retention: f64, decay: f64) -> f64 {
    let factor = decay_factor(decay);
    stability / factor * (target_retention.powf(-1.0 / decay) - 1.0)
}

// ============================================================================
// INITIAL STATE
// ============================================================================

/// S0 = w[grade - 1]
pub fn initial_stability(w: &Weights, grade: Grade) -> f64 {
    w[grade.value() as usize - 1]
}

/// D0 = clamp(w4 - e^(w5 * (grade - 1)) + 1)
pub fn initial_difficulty(w: &Weights, grade: Grade) -> f64 {
    clamp_difficulty(w[4] - (w[5] * (grade.as_f64() - 1.0)).exp() + 1.0)
}

// ============================================================================
// UPDATES
// ============================================================================

/// Difficulty after a review, with mean reversion toward D0(easy)
pub fn next_difficulty(w: &Weights, difficulty: f64, grade: Grade) -> f64 {
    let delta = -w[6] * (grade.as_f64() - 3.0);
    let damped = difficulty + delta * (MAX_DIFFICULTY - difficulty) / 9.0;
    // D0(easy) unclamped, as the published formula uses it
    let easy_anchor = w[4] - (w[5] * 3.0).exp() + 1.0;
    clamp_difficulty(w[7] * easy_anchor + (1.0 - w[7]) * damped)
}

/// Post-lapse stability. `difficulty` is the already-updated value.
pub fn next_forget_stability(w: &Weights, difficulty: f64, stability: f64, r: f64) -> f64 {
    w[11]
        * difficulty.powf(-w[12])
        * ((stability + 1.0).powf(w[13]) - 1.0)
        * (w[14] * (1.0 - r)).exp()
}

/// Post-recall stability for hard/success/easy. `difficulty` is the
/// already-updated value.
pub fn next_recall_stability(
    w: &Weights,
    difficulty: f64,
    stability: f64,
    r: f64,
    grade: Grade,
) -> f64 {
    let hard_penalty = if grade == Grade::Hard { w[15] } else { 1.0 };
    let easy_bonus = if grade == Grade::Easy { w[16] } else { 1.0 };
    stability
        * (w[8].exp()
            * (11.0 - difficulty)
            * stability.powf(-w[9])
            * ((w[10] * (1.0 - r)).exp() - 1.0)
            * hard_penalty
            * easy_bonus
            + 1.0)
}

fn clamp_difficulty(d: f64) -> f64 {
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

// ============================================================================
// TESTS
// ============================================================================
