//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: card states and review log",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Append-only review log and turn id index",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "Learner settings",
        up: MIGRATION_V3_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Card states keyed by (learner, word, mode) plus the review ledger
const MIGRATION_V1_UP: &str = r#"
-- ============================================================================
-- CARD STATES
-- ============================================================================

CREATE TABLE IF NOT EXISTS card_states (
    learner_id TEXT NOT NULL,
    word_id TEXT NOT NULL,
    mode TEXT NOT NULL,

    -- Memory model state, both or neither
    stability REAL,
    difficulty REAL,
    reps INTEGER NOT NULL DEFAULT 0,
    lapses INTEGER NOT NULL DEFAULT 0,
    last_grade INTEGER,
    interval_days REAL,

    -- Scheduling
    last_seen_at TEXT,
    next_due_at TEXT,
    learning_due_at TEXT,
    fsrs_enabled INTEGER NOT NULL DEFAULT 1,
    click_count INTEGER NOT NULL DEFAULT 0,

    -- Optimistic concurrency
    version INTEGER NOT NULL DEFAULT 1,

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    PRIMARY KEY (learner_id, word_id, mode),
    CHECK ((stability IS NULL) = (difficulty IS NULL)),
    CHECK (stability IS NULL OR stability > 0),
    CHECK (difficulty IS NULL OR (difficulty >= 1 AND difficulty <= 10)),
    CHECK (last_grade IS NULL OR last_grade BETWEEN 1 AND 4),
    CHECK (version >= 1)
);

CREATE INDEX IF NOT EXISTS idx_card_states_next_due ON card_states(learner_id, next_due_at);
CREATE INDEX IF NOT EXISTS idx_card_states_learning_due ON card_states(learner_id, learning_due_at);
CREATE INDEX IF NOT EXISTS idx_card_states_word ON card_states(learner_id, word_id);

-- ============================================================================
-- REVIEW LOG
-- ============================================================================

CREATE TABLE IF NOT EXISTS review_log (
    id TEXT PRIMARY KEY,
    learner_id TEXT NOT NULL,
    word_id TEXT NOT NULL,
    mode TEXT NOT NULL,
    grade INTEGER NOT NULL CHECK (grade BETWEEN 1 AND 4),
    review_type TEXT NOT NULL CHECK (review_type IN ('new', 'learning', 'review', 'click')),
    reviewed_at TEXT NOT NULL,
    scheduled_at TEXT,
    interval_after REAL NOT NULL,
    stability_before REAL,
    stability_after REAL NOT NULL,
    difficulty_before REAL,
    difficulty_after REAL NOT NULL,
    params_version TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_review_log_learner_time ON review_log(learner_id, reviewed_at);
CREATE INDEX IF NOT EXISTS idx_review_log_card ON review_log(learner_id, word_id, mode, reviewed_at);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Ledger immutability and caller turn ids
const MIGRATION_V2_UP: &str = r#"
ALTER TABLE review_log ADD COLUMN turn_id TEXT;

CREATE INDEX IF NOT EXISTS idx_review_log_turn ON review_log(learner_id, turn_id);

CREATE TRIGGER IF NOT EXISTS review_log_no_update
BEFORE UPDATE ON review_log
BEGIN
    SELECT RAISE(ABORT, 'review_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS review_log_no_delete
BEFORE DELETE ON review_log
BEGIN
    SELECT RAISE(ABORT, 'review_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS card_states_no_delete
BEFORE DELETE ON card_states
BEGIN
    SELECT RAISE(ABORT, 'card_states rows are never deleted');
END;

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// V3: Per-learner caps and retention target
const MIGRATION_V3_UP: &str = r#"
CREATE TABLE IF NOT EXISTS learner_settings (
    learner_id TEXT PRIMARY KEY,
    daily_new_limit INTEGER NOT NULL DEFAULT 10 CHECK (daily_new_limit >= 0),
    daily_review_limit INTEGER NOT NULL DEFAULT 40 CHECK (daily_review_limit >= 0),
    target_retention REAL NOT NULL DEFAULT 0.9 CHECK (target_retention > 0 AND target_retention < 1),
    new_review_ratio INTEGER NOT NULL DEFAULT 2 CHECK (new_review_ratio >= 1),
    updated_at TEXT NOT NULL
);

UPDATE schema_version SET version = 3, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // execute_batch handles multi-statement SQL including triggers
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
