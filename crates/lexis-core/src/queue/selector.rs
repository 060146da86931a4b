//! Next card selection

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

use super::{CardFilter, QueueSource, QueueStats, QueueTurn, SelectRequest, SelectedCard};
use crate::card::{CardPhase, CardState, Mode, WordId};
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::providers::{ContentCatalog, SettingsProvider};
use crate::storage::CardStore;

/// Whether a pool may serve another card today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Open,
    CapacityExhausted,
}

impl Admission {
    fn check(done_today: u32, daily_limit: u32) -> Self {
        if done_today >= daily_limit {
            Admission::CapacityExhausted
        } else {
            Admission::Open
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pool {
    Due,
    New,
}

/// Pools to try, in order
fn pool_order(filter: CardFilter, turn: QueueTurn) -> &'static [Pool] {
    match (filter, turn) {
        (CardFilter::New, _) => &[Pool::New],
        (CardFilter::Review, _) => &[Pool::Due],
        (CardFilter::Both, QueueTurn::New) => &[Pool::New, Pool::Due],
        (CardFilter::Both, QueueTurn::Review | QueueTurn::Auto) => &[Pool::Due, Pool::New],
    }
}

/// Most overdue first; then learning before review; then weakest first
fn due_order(a: &CardState, b: &CardState) -> Ordering {
    let learning_rank = |c: &CardState| u8::from(c.phase() != CardPhase::Learning);
    a.due_at()
        .cmp(&b.due_at())
        .then_with(|| learning_rank(a).cmp(&learning_rank(b)))
        .then_with(|| {
            a.stability()
                .unwrap_or(0.0)
                .total_cmp(&b.stability().unwrap_or(0.0))
        })
        .then_with(|| a.key.cmp(&b.key))
}

fn due_source(card: &CardState) -> QueueSource {
    if card.phase() == CardPhase::Learning {
        QueueSource::Learning
    } else {
        QueueSource::Review
    }
}

/// Stateless picker over the card store
pub struct NextCardSelector<'a> {
    store: &'a dyn CardStore,
    catalog: &'a dyn ContentCatalog,
    settings: &'a dyn SettingsProvider,
    config: &'a SchedulerConfig,
}

impl<'a> NextCardSelector<'a> {
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

    /// Pick the next card now. `None` means nothing is available.
    pub fn select(&self, req: &SelectRequest) -> Result<Option<SelectedCard>> {
        self.select_at(req, Utc::now())
    }

    pub fn select_at(&self, req: &SelectRequest, now: DateTime<Utc>) -> Result<Option<SelectedCard>> {
        self.select_with_rng(req, now, &mut rand::rng())
    }

    /// Selection with an explicit random source for the new and fallback pools
    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        req: &SelectRequest,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Option<SelectedCard>> {
        let settings = self.settings.settings(&req.learner)?;
        let modes = &self.config.modes;
        let scope_words = self.catalog.scope_words(&req.scope)?;
        let counts =
            self.store
                .count_reviews_since(&req.learner, modes, self.config.day_start(now))?;
        let cards = self.store.learner_cards(&req.learner, modes)?;

        // Existing cards of in-scope words, hidden ones included
        let mut by_word: HashMap<&WordId, Vec<&CardState>> =
            scope_words.iter().map(|w| (w, Vec::new())).collect();
        for card in &cards {
            if let Some(slot) = by_word.get_mut(&card.key.word_id) {
                slot.push(card);
            }
        }

        let mut due: Vec<&CardState> = by_word
            .iter()
            .filter(|(word, _)| !req.exclude.contains(**word))
            .flat_map(|(_, cards)| cards.iter().copied())
            .filter(|card| card.is_due(now))
            .collect();
        due.sort_by(|a, b| due_order(a, b));

        // Only words never started in any mode count as new
        let new_pool: Vec<&WordId> = scope_words
            .iter()
            .filter(|word| !req.exclude.contains(*word))
            .filter(|word| by_word.get(word).is_none_or(Vec::is_empty))
            .collect();

        let learning_due = due
            .iter()
            .filter(|c| c.phase() == CardPhase::Learning)
            .count();
        let stats = QueueStats {
            new_today: counts.new,
            daily_new_limit: settings.daily_new_limit,
            reviews_today: counts.reviewed(),
            daily_review_limit: settings.daily_review_limit,
            new_pool_size: count_u32(new_pool.len()),
            learning_due: count_u32(learning_due),
            review_due: count_u32(due.len() - learning_due),
        };

        for pool in pool_order(req.card_filter, req.queue_turn) {
            match pool {
                Pool::Due => {
                    if Admission::check(counts.reviewed(), settings.daily_review_limit)
                        == Admission::CapacityExhausted
                    {
                        tracing::debug!(
                            "Review cap reached for {} ({}/{})",
                            req.learner,
                            counts.reviewed(),
                            settings.daily_review_limit
                        );
                        continue;
                    }
                    if let Some(card) = due.first() {
                        tracing::debug!("Selected due card {} ({})", card.key, due_source(card));
                        return Ok(Some(SelectedCard {
                            word_id: card.key.word_id.clone(),
                            mode: card.key.mode.clone(),
                            source: due_source(card),
                            state: Some((*card).clone()),
                            stats,
                        }));
                    }
                }
                Pool::New => {
                    if Admission::check(counts.new, settings.daily_new_limit)
                        == Admission::CapacityExhausted
                    {
                        tracing::debug!(
                            "New cap reached for {} ({}/{})",
                            req.learner,
                            counts.new,
                            settings.daily_new_limit
                        );
                        continue;
                    }
                    if let Some(word) = new_pool.choose(rng) {
                        if let Some(mode) = modes.choose(rng) {
                            tracing::debug!("Selected new card {} in {}", word, mode);
                            return Ok(Some(SelectedCard {
                                word_id: (*word).clone(),
                                mode: (*mode).clone(),
                                source: QueueSource::New,
                                state: None,
                                stats,
                            }));
                        }
                    }
                }
            }
        }

        if self.config.fallback_enabled {
            if let Some(selected) = self.fallback(req, &scope_words, &by_word, stats, rng) {
                return Ok(Some(selected));
            }
        }

        tracing::debug!("No card available for {} in {}", req.learner, req.scope);
        Ok(None)
    }

    /// Any non-hidden in-scope card allowed by the filter, caps ignored
    fn fallback<R: Rng + ?Sized>(
        &self,
        req: &SelectRequest,
        scope_words: &[WordId],
        by_word: &HashMap<&WordId, Vec<&CardState>>,
        stats: QueueStats,
        rng: &mut R,
    ) -> Option<SelectedCard> {
        let mut candidates: Vec<(&WordId, &Mode, Option<&CardState>)> = Vec::new();
        for word in scope_words.iter().filter(|w| !req.exclude.contains(*w)) {
            let existing = by_word.get(word).map(Vec::as_slice).unwrap_or(&[]);
            if req.card_filter == CardFilter::New && !existing.is_empty() {
                continue;
            }
            for mode in &self.config.modes {
                let card = existing.iter().copied().find(|c| &c.key.mode == mode);
                let allowed = match (card, req.card_filter) {
                    (Some(c), _) if c.is_hidden() => false,
                    (None, CardFilter::Review) => false,
                    _ => true,
                };
                if allowed {
                    candidates.push((word, mode, card));
                }
            }
        }

        let (word, mode, card) = candidates.choose(rng)?;
        tracing::debug!("Selected fallback card {} in {}", word, mode);
        Some(SelectedCard {
            word_id: (*word).clone(),
            mode: (*mode).clone(),
            source: QueueSource::Fallback,
            state: card.cloned(),
            stats,
        })
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ============================================================================
// TESTS
// ============================================================================
