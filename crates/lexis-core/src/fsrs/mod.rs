//! FSRS-6 (Free Spaced Repetition Scheduler) Module
//!
//! Memory model behind every scheduling decision.
//!
//! Reference: https://github.com/open-spaced-repetition/fsrs4anki
//!
//! ## Core Formulas:
//! - Retrievability: R = (1 + FACTOR * t / S)^(-w20) where FACTOR = 0.9^(-1/w20) - 1
//! - Interval: t = S/FACTOR * (retention^(-1/w20) - 1)
//!
//! The same-day short-term weights (w17-w19) are carried in the table but
//! not applied: same-day reviews go through the regular update.

mod algorithm;
mod grade;
mod model;
mod parameters;

pub use algorithm::{
    decay_factor, initial_difficulty, initial_stability, next_difficulty, next_forget_stability,
    next_interval, next_recall_stability, retrievability, MAX_DIFFICULTY, MIN_DIFFICULTY,
    REFERENCE_RETENTION, STABILITY_FLOOR,
};
pub use grade::Grade;
pub use model::{GradePreview, MemoryModel, MemoryState, ModelOutcome};
pub use parameters::{DEFAULT_PARAMS_VERSION, FSRS6_WEIGHTS, Fsrs6Parameters, WEIGHT_COUNT};
