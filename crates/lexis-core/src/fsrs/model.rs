//! Memory model
//!
//! Maps a prior memory state plus a grade to the next memory state and the
//! interval that keeps recall at the learner's target retention.

use serde::{Deserialize, Serialize};

use super::algorithm::{
    initial_difficulty, initial_stability, next_difficulty, next_forget_stability, next_interval,
    next_recall_stability, retrievability,
};
use super::grade::Grade;
use super::parameters::Fsrs6Parameters;
use crate::error::Result;

// ============================================================================
// TYPES
// ============================================================================

/// Stability and difficulty of a reviewed card
///
/// Kept as one value so a card either has both or neither.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    /// Days until recall probability drops to 90%
    pub stability: f64,
    /// Intrinsic difficulty in [1, 10]
    pub difficulty: f64,
}

/// Result of one model step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOutcome {
    pub stability: f64,
    pub difficulty: f64,
    /// Days until the target retention is reached. Not capped.
    pub interval_days: f64,
    /// Recall probability at review time; `None` for a first review
    pub retrievability: Option<f64>,
    pub reps: u32,
    pub lapses: u32,
}

impl ModelOutcome {
    pub fn memory(&self) -> MemoryState {
        MemoryState {
            stability: self.stability,
            difficulty: self.difficulty,
        }
    }
}

/// Outcomes for all four grades from one prior state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradePreview {
    pub fail: ModelOutcome,
    pub hard: ModelOutcome,
    pub success: ModelOutcome,
    pub easy: ModelOutcome,
}

impl GradePreview {
    pub fn get(&self, grade: Grade) -> &ModelOutcome {
        match grade {
            Grade::Fail => &self.fail,
            Grade::Hard => &self.hard,
            Grade::Success => &self.success,
            Grade::Easy => &self.easy,
        }
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// FSRS-6 memory model over an injected parameter table
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryModel {
    params: Fsrs6Parameters,
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self {
            params: Fsrs6Parameters::default(),
        }
    }
}

impl MemoryModel {
    /// Build a model, rejecting weight tables the formulas cannot evaluate
    pub fn new(params: Fsrs6Parameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &Fsrs6Parameters {
        &self.params
    }

    /// Version tag recorded on review log entries
    pub fn params_version(&self) -> &str {
        &self.params.version
    }

    /// Recall probability of a card `elapsed_days` after its last review
    pub fn retrievability(&self, memory: &MemoryState, elapsed_days: f64) -> f64 {
        retrievability(elapsed_days.max(0.0), memory.stability, self.params.decay())
    }

    /// Interval for a stability at the given retention
    pub fn interval(&self, stability: f64, target_retention: f64) -> f64 {
        next_interval(stability, target_retention, self.params.decay())
    }

    /// Apply one grade
    ///
    /// With no prior state the grade seeds stability and difficulty,
    /// `elapsed_days` is ignored and the counters restart at one review.
    pub fn update(
        &self,
        prior: Option<MemoryState>,
        elapsed_days: f64,
        grade: Grade,
        reps: u32,
        lapses: u32,
        target_retention: f64,
    ) -> ModelOutcome {
        let w = &self.params.weights;
        let decay = self.params.decay();

        let Some(prior) = prior else {
            let stability = initial_stability(w, grade);
            return ModelOutcome {
                stability,
                difficulty: initial_difficulty(w, grade),
                interval_days: next_interval(stability, target_retention, decay),
                retrievability: None,
                reps: 1,
                lapses: u32::from(grade.is_fail()),
            };
        };

        let r = retrievability(elapsed_days.max(0.0), prior.stability, decay);
        let difficulty = next_difficulty(w, prior.difficulty, grade);
        let stability = if grade.is_fail() {
            next_forget_stability(w, difficulty, prior.stability, r)
        } else {
            next_recall_stability(w, difficulty, prior.stability, r, grade)
        };

        ModelOutcome {
            stability,
            difficulty,
            interval_days: next_interval(stability, target_retention, decay),
            retrievability: Some(r),
            reps: reps.saturating_add(1),
            lapses: lapses.saturating_add(u32::from(grade.is_fail())),
        }
    }

    /// Outcome of every grade without committing to any
    pub fn preview(
        &self,
        prior: Option<MemoryState>,
        elapsed_days: f64,
        reps: u32,
        lapses: u32,
        target_retention: f64,
    ) -> GradePreview {
        let step = |grade| self.update(prior, elapsed_days, grade, reps, lapses, target_retention);
        GradePreview {
            fail: step(Grade::Fail),
            hard: step(Grade::Hard),
            success: step(Grade::Success),
            easy: step(Grade::Easy),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
