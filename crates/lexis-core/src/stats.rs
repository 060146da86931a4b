//! Daily statistics
//!
//! Today's figures are learner-wide, like the caps they mirror. Due and
//! total figures are limited to the requested scope.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{CardKey, LearnerId, ReviewType, WordId};
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::providers::{ContentCatalog, Scope, SettingsProvider};
use crate::storage::CardStore;

/// A learner's day at a glance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub new_cards_today: u32,
    pub new_words_today: u32,
    pub daily_new_limit: u32,
    pub review_cards_done: u32,
    pub review_words_done: u32,
    pub daily_review_limit: u32,
    pub clicks_today: u32,
    pub review_cards_due: u32,
    pub review_words_due: u32,
    /// Words in scope with at least one card
    pub total_words_started: u32,
    pub total_words_in_scope: u32,
}

impl DailyStats {
    pub fn new_remaining(&self) -> u32 {
        self.daily_new_limit.saturating_sub(self.new_cards_today)
    }

    pub fn reviews_remaining(&self) -> u32 {
        self.daily_review_limit.saturating_sub(self.review_cards_done)
    }
}

/// Builds [`DailyStats`] from the store
pub struct DailyStatsCollector<'a> {
    store: &'a dyn CardStore,
    catalog: &'a dyn ContentCatalog,
    settings: &'a dyn SettingsProvider,
    config: &'a SchedulerConfig,
}

impl<'a> DailyStatsCollector<'a> {
    pub fn new(
        store: &'a dyn CardStore,
        catalog: &'a dyn ContentCatalog,
        settings: &'a dyn SettingsProvider,
        config: &'a SchedulerConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            settings,
            config,
        }
    }

    pub fn collect(
        &self,
        learner: &LearnerId,
        scope: &Scope,
        now: DateTime<Utc>,
    ) -> Result<DailyStats> {
        let settings = self.settings.settings(learner)?;
        let modes = &self.config.modes;
        let words = self.catalog.scope_words(scope)?;
        let in_scope: HashSet<&WordId> = words.iter().collect();

        let mut new_cards: HashSet<&CardKey> = HashSet::new();
        let mut new_words: HashSet<&WordId> = HashSet::new();
        let mut review_cards: HashSet<&CardKey> = HashSet::new();
        let mut review_words: HashSet<&WordId> = HashSet::new();
        let mut clicks = 0u32;

        let today = self
            .store
            .reviews_since(learner, modes, self.config.day_start(now))?;
        for entry in &today {
            match entry.review_type {
                ReviewType::New => {
                    new_cards.insert(&entry.key);
                    new_words.insert(&entry.key.word_id);
                }
                ReviewType::Learning | ReviewType::Review => {
                    review_cards.insert(&entry.key);
                    review_words.insert(&entry.key.word_id);
                }
                ReviewType::Click => clicks += 1,
            }
        }

        let cards = self.store.learner_cards(learner, modes)?;
        let mut started: HashSet<&WordId> = HashSet::new();
        let mut due_cards = 0u32;
        let mut due_words: HashSet<&WordId> = HashSet::new();
        for card in cards.iter().filter(|c| in_scope.contains(&c.key.word_id)) {
            started.insert(&card.key.word_id);
            if card.is_due(now) {
                due_cards += 1;
                due_words.insert(&card.key.word_id);
            }
        }

        Ok(DailyStats {
            new_cards_today: len_u32(new_cards.len()),
            new_words_today: len_u32(new_words.len()),
            daily_new_limit: settings.daily_new_limit,
            review_cards_done: len_u32(review_cards.len()),
            review_words_done: len_u32(review_words.len()),
            daily_review_limit: settings.daily_review_limit,
            clicks_today: clicks,
            review_cards_due: due_cards,
            review_words_due: len_u32(due_words.len()),
            total_words_started: len_u32(started.len()),
            total_words_in_scope: len_u32(in_scope.len()),
        })
    }
}

fn len_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
