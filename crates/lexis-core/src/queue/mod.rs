//! Queue Module
//!
//! Picks the next card for a learner from three pools:
//! - Due pool: learning and review cards past their due time
//! - New pool: in-scope (word, mode) pairs with no card yet
//! - Fallback pool: any non-hidden in-scope card, opt-in
//!
//! Daily caps come from today's review ledger. The selector keeps no
//! session state; turn alternation is the caller's, see [`QueueTurnCursor`].

mod selector;
mod turn;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::card::{CardState, LearnerId, Mode, WordId};
use crate::providers::Scope;

pub use selector::NextCardSelector;
pub use turn::QueueTurnCursor;

// ============================================================================
// REQUEST
// ============================================================================

/// Which pools a selection may draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardFilter {
    New,
    Review,
    #[default]
    Both,
}

impl CardFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardFilter::New => "new",
            CardFilter::Review => "review",
            CardFilter::Both => "both",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(CardFilter::New),
            "review" => Some(CardFilter::Review),
            "both" => Some(CardFilter::Both),
            _ => None,
        }
    }
}

impl std::fmt::Display for CardFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pool preference when both pools are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueTurn {
    New,
    Review,
    #[default]
    Auto,
}

impl QueueTurn {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueTurn::New => "new",
            QueueTurn::Review => "review",
            QueueTurn::Auto => "auto",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(QueueTurn::New),
            "review" => Some(QueueTurn::Review),
            "auto" => Some(QueueTurn::Auto),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueueTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input to one selection
#[derive(Debug, Clone)]
pub struct SelectRequest {
    pub learner: LearnerId,
    pub scope: Scope,
    /// Words already on screen or otherwise off limits this turn
    pub exclude: HashSet<WordId>,
    pub card_filter: CardFilter,
    pub queue_turn: QueueTurn,
}

impl SelectRequest {
    pub fn new(learner: impl Into<LearnerId>, scope: Scope) -> Self {
        Self {
            learner: learner.into(),
            scope,
            exclude: HashSet::new(),
            card_filter: CardFilter::Both,
            queue_turn: QueueTurn::Auto,
        }
    }

    pub fn exclude<I, W>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<WordId>,
    {
        self.exclude.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, card_filter: CardFilter) -> Self {
        self.card_filter = card_filter;
        self
    }

    pub fn turn(mut self, queue_turn: QueueTurn) -> Self {
        self.queue_turn = queue_turn;
        self
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// Pool a selected card came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueSource {
    New,
    Learning,
    Review,
    Fallback,
}

impl QueueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueSource::New => "new",
            QueueSource::Learning => "learning",
            QueueSource::Review => "review",
            QueueSource::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for QueueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Queue figures at selection time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub new_today: u32,
    pub daily_new_limit: u32,
    pub reviews_today: u32,
    pub daily_review_limit: u32,
    /// Unseen words still available as new cards
    pub new_pool_size: u32,
    pub learning_due: u32,
    pub review_due: u32,
}

/// The card to show next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedCard {
    pub word_id: WordId,
    pub mode: Mode,
    pub source: QueueSource,
    /// Current state; `None` for a card with no row yet
    pub state: Option<CardState>,
    pub stats: QueueStats,
}

impl SelectedCard {
    /// Version to pass back when grading this card
    pub fn expected_version(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.version)
    }
}
