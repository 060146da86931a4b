//! Test Database Manager
//!
//! Provides isolated scheduler instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - An in-memory word catalog the test can grow
//! - Seeding helpers for cards in every phase
//! - Reopening the same file to exercise migrations

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lexis_core::{
    CardKey, CardState, CardStore, LearnerId, LearnerSettings, Mode, Scheduler, SchedulerConfig,
    StaticCatalog, Storage,
};
use tempfile::TempDir;

use crate::mocks::TestDataFactory;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// db.add_words(["huis", "boom"]);
/// db.set_settings("learner", LearnerSettings { daily_new_limit: 1, ..Default::default() });
///
/// let scheduler = db.scheduler();
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// The storage instance, also the settings provider
    pub storage: Arc<Storage>,
    /// Words known to the schedulers built by this manager
    pub catalog: Arc<StaticCatalog>,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    db_path: PathBuf,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_lexis.db");
        let storage = Storage::new(Some(db_path.clone())).expect("Failed to create test storage");

        Self {
            storage: Arc::new(storage),
            catalog: Arc::new(StaticCatalog::new()),
            _temp_dir: Some(temp_dir),
            db_path,
        }
    }

    /// Create a test database at a specific path
    ///
    /// The database is NOT automatically deleted.
    pub fn new_at_path(path: PathBuf) -> Self {
        let storage = Storage::new(Some(path.clone())).expect("Failed to create test storage");
        Self {
            storage: Arc::new(storage),
            catalog: Arc::new(StaticCatalog::new()),
            _temp_dir: None,
            db_path: path,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Scheduler with the default configuration
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler_with(SchedulerConfig::default())
    }

    pub fn scheduler_with(&self, config: SchedulerConfig) -> Scheduler {
        Scheduler::new(
            self.storage.clone(),
            self.catalog.clone(),
            self.storage.clone(),
            config,
        )
        .expect("Failed to build scheduler")
    }

    /// Scheduler restricted to one training mode
    pub fn single_mode_scheduler(&self, mode: Mode) -> Scheduler {
        self.scheduler_with(SchedulerConfig {
            modes: vec![mode],
            ..Default::default()
        })
    }

    pub fn add_words<I, W>(&self, words: I)
    where
        I: IntoIterator<Item = W>,
        W: Into<lexis_core::WordId>,
    {
        for word in words {
            self.catalog.add_word(word);
        }
    }

    pub fn set_settings(&self, learner: &str, settings: LearnerSettings) {
        self.storage
            .save_settings(&LearnerId::from(learner), &settings)
            .expect("Failed to save settings");
    }

    // ========================================================================
    // SEEDING
    // ========================================================================

    /// Write a card as-is, bypassing the recorder
    pub fn seed_card(&self, state: &CardState) -> CardState {
        self.storage.upsert_card(state).expect("Failed to seed card")
    }

    /// Seed a review-phase card due `overdue_days` before `now`
    pub fn seed_overdue(
        &self,
        key: CardKey,
        stability: f64,
        overdue_days: i64,
        now: DateTime<Utc>,
    ) -> CardState {
        let last_seen = now - Duration::days(overdue_days) - Duration::days(stability.ceil() as i64);
        let due = now - Duration::days(overdue_days);
        self.seed_card(&TestDataFactory::review_card(key, stability, 5.0, last_seen, due))
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    pub fn card(&self, key: &CardKey) -> Option<CardState> {
        self.storage.get_card(key).expect("Failed to read card")
    }

    /// Number of ledger entries for a card
    pub fn review_count(&self, key: &CardKey) -> usize {
        self.storage
            .review_history(key, usize::MAX)
            .expect("Failed to read history")
            .len()
    }

    pub fn learner_card_count(&self, learner: &str) -> usize {
        self.storage
            .learner_cards(&LearnerId::from(learner), &[])
            .expect("Failed to read cards")
            .len()
    }

    /// Reopen the database file (migrations run again and must be no-ops)
    pub fn reopen(&mut self) {
        let storage = Storage::new(Some(self.db_path.clone())).expect("Failed to reopen storage");
        self.storage = Arc::new(storage);
    }
}
