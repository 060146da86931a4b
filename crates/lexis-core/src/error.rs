//! Scheduler error type

use crate::card::{CardKey, CardState};

/// Errors surfaced by the scheduling core
///
/// Persistence failures propagate unmodified. Nothing in the core retries.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Unknown word, list or learner
    #[error("Not found: {0}")]
    NotFound(String),
    /// The card changed between read and write; carries the row as it is now
    #[error("Concurrent update on {key}: expected version {expected}")]
    ConcurrencyConflict {
        key: CardKey,
        expected: u64,
        current: Option<Box<CardState>>,
    },
    /// Grade outside 1..=4
    #[error("Invalid grade: {0}")]
    InvalidGrade(i64),
    /// Unknown review action name
    #[error("Invalid action: {0}")]
    InvalidAction(String),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Learner settings outside their allowed ranges
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON column could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

impl SchedulerError {
    /// The current card row carried by a conflict, if any
    pub fn conflict_state(&self) -> Option<&CardState> {
        match self {
            SchedulerError::ConcurrencyConflict { current, .. } => current.as_deref(),
            _ => None,
        }
    }

    /// True for `ConcurrencyConflict`
    pub fn is_conflict(&self) -> bool {
        matches!(self, SchedulerError::ConcurrencyConflict { .. })
    }
}

/// Scheduler result type
pub type Result<T> = std::result::Result<T, SchedulerError>;
