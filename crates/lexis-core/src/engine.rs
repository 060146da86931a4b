//! Scheduler facade
//!
//! Owns the collaborators and hands out borrowing components per call. Every
//! operation has an `_at` variant taking the current instant.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::card::{CardKey, CardState, LearnerId, ReviewLogEntry, WordId};
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::fsrs::{GradePreview, MemoryModel};
use crate::providers::{ContentCatalog, Scope, SettingsProvider};
use crate::queue::{NextCardSelector, SelectRequest, SelectedCard};
use crate::review::{ReviewOutcome, ReviewRecorder, ReviewRequest};
use crate::scenario::{Scenario, ScenarioAggregator, ScenarioStats};
use crate::stats::{DailyStats, DailyStatsCollector};
use crate::storage::CardStore;

/// Caller entry point of the scheduling core
///
/// `Send + Sync`; share it through `Arc` across request handlers.
pub struct Scheduler {
    store: Arc<dyn CardStore>,
    catalog: Arc<dyn ContentCatalog>,
    settings: Arc<dyn SettingsProvider>,
    model: MemoryModel,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Validates the configuration and builds the memory model from its
    /// parameter table
    pub fn new(
        store: Arc<dyn CardStore>,
        catalog: Arc<dyn ContentCatalog>,
        settings: Arc<dyn SettingsProvider>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let model = MemoryModel::new(config.parameters.clone())?;
        tracing::info!(
            "Scheduler ready: modes {:?}, params {}",
            config.modes.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            model.params_version()
        );
        Ok(Self {
            store,
            catalog,
            settings,
            model,
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn model(&self) -> &MemoryModel {
        &self.model
    }

    pub fn store(&self) -> &dyn CardStore {
        self.store.as_ref()
    }

    pub fn selector(&self) -> NextCardSelector<'_> {
        NextCardSelector::new(
            self.store.as_ref(),
            self.catalog.as_ref(),
            self.settings.as_ref(),
            &self.config,
        )
    }

    pub fn recorder(&self) -> ReviewRecorder<'_> {
        ReviewRecorder::new(
            self.store.as_ref(),
            self.catalog.as_ref(),
            self.settings.as_ref(),
            &self.model,
            &self.config,
        )
    }

    pub fn scenarios(&self) -> ScenarioAggregator<'_> {
        ScenarioAggregator::new(self.store.as_ref(), self.catalog.as_ref())
    }

    // ========================================================================
    // QUEUE
    // ========================================================================

    pub fn select_next(&self, req: &SelectRequest) -> Result<Option<SelectedCard>> {
        self.selector().select(req)
    }

    pub fn select_next_at(
        &self,
        req: &SelectRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<SelectedCard>> {
        self.selector().select_at(req, now)
    }

    // ========================================================================
    // REVIEWS
    // ========================================================================

    pub fn record_review(&self, req: &ReviewRequest) -> Result<ReviewOutcome> {
        self.recorder().record(req)
    }

    pub fn record_review_at(&self, req: &ReviewRequest, now: DateTime<Utc>) -> Result<ReviewOutcome> {
        self.recorder().record_at(req, now)
    }

    pub fn record_click(&self, key: &CardKey, turn_id: Option<String>) -> Result<ReviewOutcome> {
        self.recorder().record_click(key, turn_id)
    }

    pub fn record_click_at(
        &self,
        key: &CardKey,
        turn_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        self.recorder().record_click_at(key, turn_id, now)
    }

    /// Model outcome of every grade for a card, nothing written
    pub fn preview(&self, key: &CardKey) -> Result<GradePreview> {
        self.preview_at(key, Utc::now())
    }

    pub fn preview_at(&self, key: &CardKey, now: DateTime<Utc>) -> Result<GradePreview> {
        let settings = self.settings.settings(&key.learner_id)?;
        let card = self.store.get_card(key)?;
        let (memory, elapsed, reps, lapses) = match &card {
            Some(c) => (
                c.memory,
                self.capped_elapsed(c, now),
                c.reps,
                c.lapses,
            ),
            None => (None, 0.0, 0, 0),
        };
        Ok(self
            .model
            .preview(memory, elapsed, reps, lapses, settings.target_retention))
    }

    fn capped_elapsed(&self, card: &CardState, now: DateTime<Utc>) -> f64 {
        let elapsed = card.elapsed_days(now).unwrap_or(0.0);
        self.config
            .max_elapsed_days
            .map_or(elapsed, |cap| elapsed.min(cap))
    }

    pub fn card(&self, key: &CardKey) -> Result<Option<CardState>> {
        self.store.get_card(key)
    }

    /// Latest ledger entry of a card
    pub fn last_review(&self, key: &CardKey) -> Result<Option<ReviewLogEntry>> {
        self.store.last_review(key)
    }

    pub fn review_history(&self, key: &CardKey, limit: usize) -> Result<Vec<ReviewLogEntry>> {
        self.store.review_history(key, limit)
    }

    // ========================================================================
    // PROGRESS
    // ========================================================================

    pub fn is_learned(
        &self,
        learner: &LearnerId,
        word: &WordId,
        scenario: &Scenario,
    ) -> Result<bool> {
        self.scenarios().is_learned(learner, word, scenario)
    }

    pub fn scenario_stats(
        &self,
        learner: &LearnerId,
        scope: &Scope,
        scenario: &Scenario,
    ) -> Result<ScenarioStats> {
        self.scenarios().stats(learner, scope, scenario)
    }

    pub fn daily_stats(&self, learner: &LearnerId, scope: &Scope) -> Result<DailyStats> {
        self.daily_stats_at(learner, scope, Utc::now())
    }

    pub fn daily_stats_at(
        &self,
        learner: &LearnerId,
        scope: &Scope,
        now: DateTime<Utc>,
    ) -> Result<DailyStats> {
        DailyStatsCollector::new(
            self.store.as_ref(),
            self.catalog.as_ref(),
            self.settings.as_ref(),
            &self.config,
        )
        .collect(learner, scope, now)
    }
}
