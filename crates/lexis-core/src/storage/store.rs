//! Persistence seam of the scheduler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{CardKey, CardState, LearnerId, Mode, ReviewLogEntry, ReviewType, WordId};
use crate::error::Result;

/// One state write plus its optional ledger entry, applied atomically
#[derive(Debug, Clone)]
pub struct CardCommit {
    /// State to persist; its `version` is ignored and assigned by the store
    pub state: CardState,
    /// Version the writer observed; 0 when it saw no row
    pub expected_version: u64,
    pub review: Option<ReviewLogEntry>,
}

/// Result of a version-conditioned commit
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// Written; the row as stored
    Committed(CardState),
    /// Rolled back; the row as it is now
    Conflict(Option<CardState>),
}

/// Today's ledger entries by review type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCounts {
    pub new: u32,
    pub learning: u32,
    pub review: u32,
    pub click: u32,
}

impl ReviewCounts {
    pub fn add(&mut self, review_type: ReviewType, n: u32) {
        let slot = match review_type {
            ReviewType::New => &mut self.new,
            ReviewType::Learning => &mut self.learning,
            ReviewType::Review => &mut self.review,
            ReviewType::Click => &mut self.click,
        };
        *slot = slot.saturating_add(n);
    }

    /// Entries counted against the daily review cap
    pub fn reviewed(&self) -> u32 {
        self.learning.saturating_add(self.review)
    }
}

/// Card state store and review ledger
///
/// Mode filters take a slice; an empty slice matches every mode.
pub trait CardStore: Send + Sync {
    fn get_card(&self, key: &CardKey) -> Result<Option<CardState>>;

    /// Write state and ledger entry in one transaction, conditioned on
    /// `expected_version`
    fn commit(&self, commit: CardCommit) -> Result<CommitOutcome>;

    /// Unconditional write used for seeding and imports; bumps the version
    fn upsert_card(&self, state: &CardState) -> Result<CardState>;

    /// Append a ledger entry outside a state write
    fn append_review(&self, entry: &ReviewLogEntry) -> Result<()>;

    /// Every card of a learner, hidden ones included
    fn learner_cards(&self, learner: &LearnerId, modes: &[Mode]) -> Result<Vec<CardState>>;

    fn cards_for_word(&self, learner: &LearnerId, word: &WordId) -> Result<Vec<CardState>>;

    fn count_reviews_since(
        &self,
        learner: &LearnerId,
        modes: &[Mode],
        since: DateTime<Utc>,
    ) -> Result<ReviewCounts>;

    /// Ledger entries since an instant, oldest first
    fn reviews_since(
        &self,
        learner: &LearnerId,
        modes: &[Mode],
        since: DateTime<Utc>,
    ) -> Result<Vec<ReviewLogEntry>>;

    /// Ledger entries of one card, newest first
    fn review_history(&self, key: &CardKey, limit: usize) -> Result<Vec<ReviewLogEntry>>;

    fn last_review(&self, key: &CardKey) -> Result<Option<ReviewLogEntry>> {
        Ok(self.review_history(key, 1)?.into_iter().next())
    }
}

/// Mode filter shared by store implementations
pub(crate) fn mode_matches(modes: &[Mode], mode: &Mode) -> bool {
    modes.is_empty() || modes.contains(mode)
}
