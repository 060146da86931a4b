//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - Cards in each phase with controlled memory state
//! - Word batches for catalog-heavy tests
//! - The reference review corpus used for model parity

use chrono::{DateTime, Duration, TimeZone, Utc};
use lexis_core::{CardKey, CardState, Grade, MemoryState};

/// Factory for creating test data
///
/// ```rust,ignore
/// let card = TestDataFactory::review_card(key, 12.0, 5.0, last_seen, due);
/// let words = TestDataFactory::words("w", 50);
/// ```
pub struct TestDataFactory;

/// One replayable review sequence
#[derive(Debug, Clone)]
pub struct ParityCase {
    pub name: &'static str,
    /// (grade value, days since the previous step)
    pub steps: Vec<(u8, f64)>,
}

impl TestDataFactory {
    /// A fixed mid-day instant so "today" never straddles midnight
    pub fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
            .single()
            .expect("valid fixed instant")
    }

    pub fn key(learner: &str, word: &str, mode: &str) -> CardKey {
        CardKey::new(learner, word, mode)
    }

    /// Review-phase card with the given memory and schedule
    pub fn review_card(
        key: CardKey,
        stability: f64,
        difficulty: f64,
        last_seen: DateTime<Utc>,
        due: DateTime<Utc>,
    ) -> CardState {
        let mut state = CardState::new(key, last_seen);
        state.memory = Some(MemoryState {
            stability,
            difficulty,
        });
        state.reps = 3;
        state.last_grade = Some(Grade::Success);
        state.interval_days = Some(stability);
        state.last_seen_at = Some(last_seen);
        state.next_due_at = Some(due);
        state
    }

    /// Learning-phase card whose relearn step ends at `due`
    pub fn learning_card(key: CardKey, due: DateTime<Utc>) -> CardState {
        let last_seen = due - Duration::minutes(10);
        let mut state = Self::review_card(key, 0.4, 7.0, last_seen, last_seen + Duration::days(1));
        state.lapses = 1;
        state.last_grade = Some(Grade::Fail);
        state.interval_days = Some(0.4);
        state.next_due_at = None;
        state.learning_due_at = Some(due);
        state
    }

    /// `count` distinct word ids with a shared prefix
    pub fn words(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}-{:03}", prefix, i)).collect()
    }

    /// Reference review sequences, each starting from an unseen card
    pub fn parity_corpus() -> Vec<ParityCase> {
        vec![
            ParityCase {
                name: "new-card-good",
                steps: vec![(3, 0.0)],
            },
            ParityCase {
                name: "learning-good-good-easy",
                steps: vec![(3, 0.0), (3, 1.0), (4, 3.0)],
            },
            ParityCase {
                name: "lapse-then-recover",
                steps: vec![(3, 0.0), (1, 4.0), (3, 1.0)],
            },
            ParityCase {
                name: "overdue-capped",
                steps: vec![(3, 0.0), (3, 5.0), (3, 30.0)],
            },
        ]
    }
}
