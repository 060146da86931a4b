//! Scenarios
//!
//! A scenario groups training modes into one "learned" notion: a word is
//! learned when every constituent mode has reached the graduation threshold.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::card::{CardState, LearnerId, Mode, WordId};
use crate::error::{Result, SchedulerError};
use crate::providers::{ContentCatalog, Scope};
use crate::storage::CardStore;

/// Default minimum stability, in days, for a mode to count as learned
pub const DEFAULT_GRADUATION_THRESHOLD: f64 = 21.0;

/// Progress of one word under a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordProgress {
    /// Every mode at or above the threshold
    Learned,
    /// At least one mode reviewed, not all graduated
    InProgress,
    /// No mode reviewed yet
    New,
}

/// Named set of modes with a graduation threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub card_modes: Vec<Mode>,
    pub graduation_threshold: f64,
    pub enabled: bool,
    pub sort_order: i32,
}

impl Scenario {
    pub fn new(id: impl Into<String>, name: impl Into<String>, card_modes: Vec<Mode>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            card_modes,
            graduation_threshold: DEFAULT_GRADUATION_THRESHOLD,
            enabled: true,
            sort_order: 0,
        }
    }

    pub fn with_threshold(mut self, days: f64) -> Self {
        self.graduation_threshold = days;
        self
    }

    /// Scenarios shipped with the trainer
    pub fn builtin() -> Vec<Scenario> {
        vec![
            Scenario {
                sort_order: 1,
                ..Scenario::new(
                    "understanding",
                    "Understanding",
                    vec![Mode::word_to_definition(), Mode::definition_to_word()],
                )
            },
            Scenario {
                sort_order: 2,
                ..Scenario::new("recognition", "Recognition", vec![Mode::word_to_definition()])
            },
        ]
    }

    /// Look up a built-in scenario
    pub fn find_builtin(id: &str) -> Result<Scenario> {
        Self::builtin()
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| SchedulerError::NotFound(format!("scenario {}", id)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.card_modes.is_empty() {
            return Err(SchedulerError::Config(format!(
                "scenario {} has no modes",
                self.id
            )));
        }
        if !(self.graduation_threshold.is_finite() && self.graduation_threshold > 0.0) {
            return Err(SchedulerError::Config(format!(
                "scenario {} threshold must be positive",
                self.id
            )));
        }
        Ok(())
    }

    /// Classify a word from its cards. Cards of other modes are ignored.
    pub fn progress(&self, cards: &[CardState]) -> WordProgress {
        let relevant: Vec<&CardState> = cards
            .iter()
            .filter(|c| self.card_modes.contains(&c.key.mode))
            .collect();

        let learned = !self.card_modes.is_empty()
            && self.card_modes.iter().all(|mode| {
                relevant
                    .iter()
                    .any(|c| &c.key.mode == mode && c.meets_threshold(self.graduation_threshold))
            });
        if learned {
            WordProgress::Learned
        } else if relevant.iter().any(|c| c.memory.is_some()) {
            WordProgress::InProgress
        } else {
            WordProgress::New
        }
    }

    pub fn is_learned(&self, cards: &[CardState]) -> bool {
        self.progress(cards) == WordProgress::Learned
    }
}

/// Word counts of a scope under one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStats {
    pub scenario_id: String,
    pub learned: u32,
    pub in_progress: u32,
    pub new: u32,
    pub total: u32,
}

/// Read-only scenario queries over the card store
pub struct ScenarioAggregator<'a> {
    store: &'a dyn CardStore,
    catalog: &'a dyn ContentCatalog,
}

impl<'a> ScenarioAggregator<'a> {
    pub fn new(store: &'a dyn CardStore, catalog: &'a dyn ContentCatalog) -> Self {
        Self { store, catalog }
    }

    pub fn is_learned(
        &self,
        learner: &LearnerId,
        word: &WordId,
        scenario: &Scenario,
    ) -> Result<bool> {
        let cards = self.store.cards_for_word(learner, word)?;
        Ok(scenario.is_learned(&cards))
    }

    pub fn stats(
        &self,
        learner: &LearnerId,
        scope: &Scope,
        scenario: &Scenario,
    ) -> Result<ScenarioStats> {
        let words = self.catalog.scope_words(scope)?;
        let cards = self.store.learner_cards(learner, &scenario.card_modes)?;

        let mut by_word: HashMap<&WordId, Vec<CardState>> =
            words.iter().map(|w| (w, Vec::new())).collect();
        for card in cards {
            if let Some(slot) = by_word.get_mut(&card.key.word_id) {
                slot.push(card);
            }
        }

        let mut stats = ScenarioStats {
            scenario_id: scenario.id.clone(),
            learned: 0,
            in_progress: 0,
            new: 0,
            total: 0,
        };
        for word in &words {
            let cards = by_word.get(word).map(Vec::as_slice).unwrap_or(&[]);
            match scenario.progress(cards) {
                WordProgress::Learned => stats.learned += 1,
                WordProgress::InProgress => stats.in_progress += 1,
                WordProgress::New => stats.new += 1,
            }
            stats.total += 1;
        }
        Ok(stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================
