//! Review actions and requests

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::card::{CardKey, CardState, ReviewLogEntry};
use crate::error::SchedulerError;
use crate::fsrs::Grade;

/// What the learner did with a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    /// Graded recall attempt
    Grade(Grade),
    /// Postpone to the start of the next learner day
    Freeze,
    /// Retire from every pool
    Hide,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Grade(g) => g.as_str(),
            ReviewAction::Freeze => "freeze",
            ReviewAction::Hide => "hide",
        }
    }
}

impl From<Grade> for ReviewAction {
    fn from(grade: Grade) -> Self {
        ReviewAction::Grade(grade)
    }
}

impl FromStr for ReviewAction {
    type Err = SchedulerError;

    /// Accepts action names and numeric grades
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "freeze" => return Ok(ReviewAction::Freeze),
            "hide" => return Ok(ReviewAction::Hide),
            _ => {}
        }
        if let Some(grade) = Grade::parse_name(&name) {
            return Ok(ReviewAction::Grade(grade));
        }
        match name.parse::<i64>() {
            Ok(n) => Grade::from_value(n).map(ReviewAction::Grade),
            Err(_) => Err(SchedulerError::InvalidAction(s.to_string())),
        }
    }
}

impl std::fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One action on one card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub key: CardKey,
    pub action: ReviewAction,
    /// Version the caller saw when the card was selected; `Some(0)` means
    /// it saw no row. `None` uses the recorder's own read.
    pub expected_version: Option<u64>,
    /// Caller's queue turn id, stored on the log entry
    pub turn_id: Option<String>,
}

impl ReviewRequest {
    pub fn new(key: CardKey, action: impl Into<ReviewAction>) -> Self {
        Self {
            key,
            action: action.into(),
            expected_version: None,
            turn_id: None,
        }
    }

    pub fn expect_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn turn_id(mut self, turn_id: impl Into<String>) -> Self {
        self.turn_id = Some(turn_id.into());
        self
    }
}

/// State after an applied action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub state: CardState,
    /// Ledger entry; `None` for freeze and hide
    pub review: Option<ReviewLogEntry>,
}
