//! Review recording
//!
//! Every action is one version-conditioned commit: the state write and its
//! ledger entry land together or not at all. A duplicate submission of the
//! same grade finds the version already moved and gets the current row back
//! instead of a second model step.

use chrono::{DateTime, Duration, SubsecRound, Utc};

use super::action::{ReviewAction, ReviewOutcome, ReviewRequest};
use crate::card::{CardKey, CardState, ReviewLogEntry, ReviewMetadata, ReviewType};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::fsrs::{Grade, MemoryModel};
use crate::providers::{ContentCatalog, SettingsProvider};
use crate::storage::{CardCommit, CardStore, CommitOutcome};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn days_to_duration(days: f64) -> Duration {
    Duration::milliseconds((days.max(0.0) * MILLIS_PER_DAY).round() as i64)
}

/// Applies actions to cards
pub struct ReviewRecorder<'a> {
    store: &'a dyn CardStore,
    catalog: &'a dyn ContentCatalog,
    settings: &'a dyn SettingsProvider,
    model: &'a MemoryModel,
    config: &'a SchedulerConfig,
}

impl<'a> ReviewRecorder<'a> {
    pub fn new(
        store: &'a dyn CardStore,
        catalog: &'a dyn ContentCatalog,
        settings: &'a dyn SettingsProvider,
        model: &'a MemoryModel,
        config: &'a SchedulerConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            settings,
            model,
            config,
        }
    }

    pub fn record(&self, req: &ReviewRequest) -> Result<ReviewOutcome> {
        self.record_at(req, Utc::now())
    }

    pub fn record_at(&self, req: &ReviewRequest, now: DateTime<Utc>) -> Result<ReviewOutcome> {
        self.apply(
            &req.key,
            req.action,
            req.expected_version,
            req.turn_id.clone(),
            false,
            now,
        )
    }

    /// A click on the word in running text: a forced fail logged as `click`
    pub fn record_click(&self, key: &CardKey, turn_id: Option<String>) -> Result<ReviewOutcome> {
        self.record_click_at(key, turn_id, Utc::now())
    }

    pub fn record_click_at(
        &self,
        key: &CardKey,
        turn_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        self.apply(key, ReviewAction::Grade(Grade::Fail), None, turn_id, true, now)
    }

    fn apply(
        &self,
        key: &CardKey,
        action: ReviewAction,
        expected_version: Option<u64>,
        turn_id: Option<String>,
        click: bool,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        // Ledger timestamps are stored at microsecond precision
        let now = now.trunc_subsecs(6);
        if !self.catalog.word_exists(&key.word_id)? {
            return Err(SchedulerError::NotFound(format!("word {}", key.word_id)));
        }

        let current = self.store.get_card(key)?;
        let observed = current.as_ref().map_or(0, |c| c.version);
        let expected = expected_version.unwrap_or(observed);
        if expected != observed {
            tracing::warn!(
                "Stale {} on {}: expected version {}, found {}",
                action,
                key,
                expected,
                observed
            );
            return Err(SchedulerError::ConcurrencyConflict {
                key: key.clone(),
                expected,
                current: current.map(Box::new),
            });
        }

        let base = current.unwrap_or_else(|| CardState::new(key.clone(), now));
        let (next, review) = match action {
            ReviewAction::Grade(grade) => {
                let (next, entry) = self.grade(base, grade, click, turn_id, now)?;
                (next, Some(entry))
            }
            ReviewAction::Freeze => (self.freeze(base, now), None),
            ReviewAction::Hide => (Self::hide(base, now), None),
        };

        let outcome = self.store.commit(CardCommit {
            state: next,
            expected_version: expected,
            review: review.clone(),
        })?;

        match outcome {
            CommitOutcome::Committed(state) => {
                tracing::info!(
                    "Recorded {} on {} (version {}, due {:?})",
                    review
                        .as_ref()
                        .map_or(action.as_str(), |r| r.review_type.as_str()),
                    key,
                    state.version,
                    state.due_at()
                );
                Ok(ReviewOutcome { state, review })
            }
            CommitOutcome::Conflict(current) => {
                tracing::warn!("Concurrent update on {}, {} discarded", key, action);
                Err(SchedulerError::ConcurrencyConflict {
                    key: key.clone(),
                    expected,
                    current: current.map(Box::new),
                })
            }
        }
    }

    fn grade(
        &self,
        state: CardState,
        grade: Grade,
        click: bool,
        turn_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(CardState, ReviewLogEntry)> {
        let settings = self.settings.settings(&state.key.learner_id)?;
        settings.validate()?;

        let review_type = if click {
            ReviewType::Click
        } else {
            ReviewType::from_phase(state.phase())
        };

        let elapsed = state.elapsed_days(now);
        let model_elapsed = match (elapsed, self.config.max_elapsed_days) {
            (Some(days), Some(cap)) => days.min(cap),
            (Some(days), None) => days,
            (None, _) => 0.0,
        };
        let outcome = self.model.update(
            state.memory,
            model_elapsed,
            grade,
            state.reps,
            state.lapses,
            settings.target_retention,
        );

        let interval = outcome.interval_days;
        let mut next = state.clone();
        if grade.is_fail() || interval < 1.0 {
            let step = if grade.is_fail() {
                interval.min(self.config.relearn_step_days())
            } else {
                interval
            };
            next.learning_due_at = Some(now + days_to_duration(step));
            next.next_due_at = None;
        } else {
            let capped = interval.min(self.config.maximum_interval_days);
            next.next_due_at = Some(now + days_to_duration(capped));
            next.learning_due_at = None;
        }
        next.memory = Some(outcome.memory());
        next.reps = outcome.reps;
        next.lapses = outcome.lapses;
        next.last_grade = Some(grade);
        next.interval_days = Some(interval);
        next.last_seen_at = Some(now);
        if click {
            next.click_count = next.click_count.saturating_add(1);
        }
        next.updated_at = now;

        let entry = ReviewLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            key: state.key.clone(),
            grade,
            review_type,
            reviewed_at: now,
            scheduled_at: state.due_at(),
            interval_after: interval,
            stability_before: state.stability(),
            stability_after: outcome.stability,
            difficulty_before: state.difficulty(),
            difficulty_after: outcome.difficulty,
            params_version: self.model.params_version().to_string(),
            turn_id,
            metadata: ReviewMetadata {
                elapsed_days: state.memory.and(elapsed),
                retrievability: outcome.retrievability,
                same_day: state
                    .last_seen_at
                    .is_some_and(|seen| self.config.same_day(seen, now)),
                last_reviewed_at_before: state.last_seen_at,
            },
        };

        Ok((next, entry))
    }

    fn freeze(&self, mut state: CardState, now: DateTime<Utc>) -> CardState {
        let tomorrow = self.config.next_day_start(now);
        state.next_due_at = Some(tomorrow);
        if state.learning_due_at.is_some() {
            state.learning_due_at = Some(tomorrow);
        }
        state.updated_at = now;
        state
    }

    fn hide(mut state: CardState, now: DateTime<Utc>) -> CardState {
        state.fsrs_enabled = false;
        state.updated_at = now;
        state
    }
}

// ============================================================================
// TESTS
// ============================================================================
