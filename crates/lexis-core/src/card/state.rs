//! Card scheduling state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CardKey;
use crate::fsrs::{Grade, MemoryState};

// ============================================================================
// PHASE
// ============================================================================

/// Where a card sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPhase {
    /// Never graded
    New,
    /// Short-interval steps after a fail or a sub-day interval
    Learning,
    /// Graduated, scheduled in days
    Review,
}

impl CardPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardPhase::New => "new",
            CardPhase::Learning => "learning",
            CardPhase::Review => "review",
        }
    }
}

impl std::fmt::Display for CardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CARD STATE
// ============================================================================

/// Scheduling record for one (learner, word, mode)
///
/// Created lazily on the first event touching the card and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardState {
    #[serde(flatten)]
    pub key: CardKey,
    /// Stability and difficulty; `None` until the first grade
    pub memory: Option<MemoryState>,
    /// Graded reviews
    pub reps: u32,
    /// Fail grades
    pub lapses: u32,
    pub last_grade: Option<Grade>,
    /// Last interval the model produced, uncapped
    pub interval_days: Option<f64>,
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Absent while the card is in learning steps
    pub next_due_at: Option<DateTime<Utc>>,
    /// Set only during the learning phase
    pub learning_due_at: Option<DateTime<Utc>>,
    /// False once hidden
    pub fsrs_enabled: bool,
    pub click_count: u32,
    /// Optimistic concurrency marker; 0 means no row exists yet
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CardState {
    /// Blank state for a card that has no row yet
    pub fn new(key: CardKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            memory: None,
            reps: 0,
            lapses: 0,
            last_grade: None,
            interval_days: None,
            last_seen_at: None,
            next_due_at: None,
            learning_due_at: None,
            fsrs_enabled: true,
            click_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stability(&self) -> Option<f64> {
        self.memory.map(|m| m.stability)
    }

    pub fn difficulty(&self) -> Option<f64> {
        self.memory.map(|m| m.difficulty)
    }

    pub fn phase(&self) -> CardPhase {
        if self.memory.is_none() {
            CardPhase::New
        } else if self.learning_due_at.is_some() {
            CardPhase::Learning
        } else {
            CardPhase::Review
        }
    }

    pub fn is_hidden(&self) -> bool {
        !self.fsrs_enabled
    }

    /// True when the row has been persisted at least once
    pub fn exists(&self) -> bool {
        self.version > 0
    }

    /// Learning due time wins over the review due time
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.learning_due_at.or(self.next_due_at)
    }

    /// Enabled and past its due time
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fsrs_enabled && self.due_at().is_some_and(|due| due <= now)
    }

    /// Fractional days since the last review, never negative
    pub fn elapsed_days(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_seen_at.map(|seen| {
            let millis = (now - seen).num_milliseconds().max(0);
            millis as f64 / 86_400_000.0
        })
    }

    /// Learned under a stability threshold
    pub fn meets_threshold(&self, threshold_days: f64) -> bool {
        self.stability().is_some_and(|s| s >= threshold_days)
    }
}

// ============================================================================
// TESTS
// ============================================================================
