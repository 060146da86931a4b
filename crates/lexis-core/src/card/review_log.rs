//! Review ledger entries
//!
//! Append-only. Rows are never updated or deleted; the SQLite schema enforces
//! this with triggers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CardKey, CardPhase};
use crate::fsrs::Grade;

/// Kind of event that produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    /// First grade of a new card; counts toward the daily new cap
    New,
    /// Grade during learning steps; counts toward the daily review cap
    Learning,
    /// Grade of a graduated card; counts toward the daily review cap
    Review,
    /// Forced fail from a click in running text; counts toward no cap
    Click,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::New => "new",
            ReviewType::Learning => "learning",
            ReviewType::Review => "review",
            ReviewType::Click => "click",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "new" => Some(ReviewType::New),
            "learning" => Some(ReviewType::Learning),
            "review" => Some(ReviewType::Review),
            "click" => Some(ReviewType::Click),
            _ => None,
        }
    }

    /// Review type of a grade applied to a card in `phase`
    pub fn from_phase(phase: CardPhase) -> Self {
        match phase {
            CardPhase::New => ReviewType::New,
            CardPhase::Learning => ReviewType::Learning,
            CardPhase::Review => ReviewType::Review,
        }
    }
}

impl std::fmt::Display for ReviewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model context captured at review time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    /// Days since the previous review; `None` on a first review
    pub elapsed_days: Option<f64>,
    pub retrievability: Option<f64>,
    /// Previous review fell on the same learner day
    pub same_day: bool,
    pub last_reviewed_at_before: Option<DateTime<Utc>>,
}

/// One grading or click event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogEntry {
    /// UUID v4
    pub id: String,
    #[serde(flatten)]
    pub key: CardKey,
    pub grade: Grade,
    pub review_type: ReviewType,
    pub reviewed_at: DateTime<Utc>,
    /// Due time the card had before this review
    pub scheduled_at: Option<DateTime<Utc>>,
    pub interval_after: f64,
    pub stability_before: Option<f64>,
    pub stability_after: f64,
    pub difficulty_before: Option<f64>,
    pub difficulty_after: f64,
    pub params_version: String,
    /// Caller-supplied queue turn id, audit only
    pub turn_id: Option<String>,
    pub metadata: ReviewMetadata,
}
