//! # Lexis Core
//!
//! Spaced-repetition scheduling engine for vocabulary training:
//!
//! - **FSRS-6**: 21-parameter memory model with an injectable, versioned weight table
//! - **Composite cards**: one state per (learner, word, training mode)
//! - **Queue admission**: due, new and opt-in fallback pools under daily caps
//! - **Exactly-once reviews**: version-conditioned commits of state plus ledger entry
//! - **Scenarios**: "learned" across several modes at a stability threshold
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lexis_core::{
//!     CardKey, Grade, ReviewRequest, Scheduler, SchedulerConfig, Scope, SelectRequest,
//!     StaticCatalog, Storage,
//! };
//!
//! let storage = Arc::new(Storage::new(None)?);
//! let catalog = Arc::new(StaticCatalog::with_words(["huis", "boom", "kat"]));
//! let scheduler = Scheduler::new(storage.clone(), catalog, storage, SchedulerConfig::from_env()?)?;
//!
//! if let Some(card) = scheduler.select_next(&SelectRequest::new("learner-1", Scope::All))? {
//!     let key = CardKey::new("learner-1", card.word_id.clone(), card.mode.clone());
//!     let request = ReviewRequest::new(key, Grade::Success).expect_version(card.expected_version());
//!     let outcome = scheduler.record_review(&request)?;
//!     println!("next due {:?}", outcome.state.due_at());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): compile SQLite into the crate
//! - `encryption`: SQLCipher; key from `LEXIS_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod config;
pub mod engine;
pub mod error;
pub mod fsrs;
pub mod providers;
pub mod queue;
pub mod review;
pub mod scenario;
pub mod stats;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Card types
pub use card::{
    CardKey, CardPhase, CardState, LearnerId, LearnerSettings, Mode, ReviewLogEntry,
    ReviewMetadata, ReviewType, WordId,
};

// FSRS-6 model
pub use fsrs::{
    Fsrs6Parameters, Grade, GradePreview, MemoryModel, MemoryState, ModelOutcome,
    DEFAULT_PARAMS_VERSION, FSRS6_WEIGHTS,
};

// Storage layer
pub use storage::{CardCommit, CardStore, CommitOutcome, ReviewCounts, Storage};

// Scheduling
pub use config::SchedulerConfig;
pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use providers::{ContentCatalog, FixedSettings, Scope, SettingsProvider, StaticCatalog};
pub use queue::{
    CardFilter, NextCardSelector, QueueSource, QueueStats, QueueTurn, QueueTurnCursor,
    SelectRequest, SelectedCard,
};
pub use review::{ReviewAction, ReviewOutcome, ReviewRecorder, ReviewRequest};
pub use scenario::{Scenario, ScenarioAggregator, ScenarioStats, WordProgress};
pub use stats::{DailyStats, DailyStatsCollector};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        CardFilter, CardKey, CardState, Grade, LearnerId, Mode, QueueTurn, ReviewAction,
        ReviewRequest, Scheduler, SchedulerConfig, SchedulerError, Scope, SelectRequest,
        SelectedCard, Storage, WordId,
    };
}
