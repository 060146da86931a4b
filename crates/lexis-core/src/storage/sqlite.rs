//! SQLite Storage Implementation
//!
//! Card states, the review ledger and learner settings in one database file.

use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::PathBuf;
use std::sync::Mutex;

use super::store::{mode_matches, CardCommit, CardStore, CommitOutcome, ReviewCounts};
use crate::card::{
    CardKey, CardState, LearnerId, LearnerSettings, Mode, ReviewLogEntry, ReviewType, WordId,
};
use crate::error::{Result, SchedulerError};
use crate::fsrs::{Grade, MemoryState};
use crate::providers::SettingsProvider;

const CARD_COLUMNS: &str = "learner_id, word_id, mode, stability, difficulty, reps, lapses,
    last_grade, interval_days, last_seen_at, next_due_at, learning_due_at, fsrs_enabled,
    click_count, version, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, learner_id, word_id, mode, grade, review_type, reviewed_at,
    scheduled_at, interval_after, stability_before, stability_after, difficulty_before,
    difficulty_after, params_version, turn_id, metadata";

// ============================================================================
// STORAGE
// ============================================================================

/// SQLite-backed card store
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, making Storage `Send + Sync` so callers can
/// share an `Arc<Storage>`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.path).finish()
    }
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("LEXIS_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Default database location under the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "lexis", "core").ok_or_else(|| {
            SchedulerError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join("lexis.db"))
    }

    /// Open (or create) a database and bring its schema up to date
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::info!("Applied {} migration(s) to {}", applied, path.display());
        }

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn lock_reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| SchedulerError::Init("Reader lock poisoned".into()))
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| SchedulerError::Init("Writer lock poisoned".into()))
    }

    // ========================================================================
    // LEARNER SETTINGS
    // ========================================================================

    /// Persist a learner's settings after validating them
    pub fn save_settings(&self, learner: &LearnerId, settings: &LearnerSettings) -> Result<()> {
        settings.validate()?;
        let writer = self.lock_writer()?;
        writer.execute(
            "INSERT INTO learner_settings (
                learner_id, daily_new_limit, daily_review_limit, target_retention,
                new_review_ratio, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(learner_id) DO UPDATE SET
                daily_new_limit = excluded.daily_new_limit,
                daily_review_limit = excluded.daily_review_limit,
                target_retention = excluded.target_retention,
                new_review_ratio = excluded.new_review_ratio,
                updated_at = excluded.updated_at",
            params![
                learner.as_str(),
                settings.daily_new_limit,
                settings.daily_review_limit,
                settings.target_retention,
                settings.new_review_ratio,
                format_timestamp(Utc::now()),
            ],
        )?;
        tracing::info!("Saved settings for learner {}", learner);
        Ok(())
    }

    /// Stored settings, or `None` when the learner never saved any
    pub fn load_settings(&self, learner: &LearnerId) -> Result<Option<LearnerSettings>> {
        let reader = self.lock_reader()?;
        let settings = reader
            .query_row(
                "SELECT daily_new_limit, daily_review_limit, target_retention, new_review_ratio
                 FROM learner_settings WHERE learner_id = ?1",
                params![learner.as_str()],
                |row| {
                    Ok(LearnerSettings {
                        daily_new_limit: row.get(0)?,
                        daily_review_limit: row.get(1)?,
                        target_retention: row.get(2)?,
                        new_review_ratio: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    /// Parse an RFC3339 timestamp column
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                    )),
                )
            })
    }

    fn parse_optional_timestamp(
        row: &rusqlite::Row,
        field_name: &str,
    ) -> rusqlite::Result<Option<DateTime<Utc>>> {
        let value: Option<String> = row.get(field_name)?;
        value
            .map(|v| Self::parse_timestamp(&v, field_name))
            .transpose()
    }

    fn parse_grade(value: i64) -> rusqlite::Result<Grade> {
        Grade::from_value(value).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                Box::new(e),
            )
        })
    }

    fn parse_version(value: i64) -> rusqlite::Result<u64> {
        u64::try_from(value).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                Box::new(e),
            )
        })
    }

    fn version_param(version: u64) -> rusqlite::Result<i64> {
        i64::try_from(version).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    }

    /// Convert a row to CardState
    fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<CardState> {
        let stability: Option<f64> = row.get("stability")?;
        let difficulty: Option<f64> = row.get("difficulty")?;
        let memory = match (stability, difficulty) {
            (Some(stability), Some(difficulty)) => Some(MemoryState {
                stability,
                difficulty,
            }),
            _ => None,
        };

        let last_grade: Option<i64> = row.get("last_grade")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(CardState {
            key: CardKey::new(
                row.get::<_, String>("learner_id")?,
                row.get::<_, String>("word_id")?,
                row.get::<_, String>("mode")?,
            ),
            memory,
            reps: row.get("reps")?,
            lapses: row.get("lapses")?,
            last_grade: last_grade.map(Self::parse_grade).transpose()?,
            interval_days: row.get("interval_days")?,
            last_seen_at: Self::parse_optional_timestamp(row, "last_seen_at")?,
            next_due_at: Self::parse_optional_timestamp(row, "next_due_at")?,
            learning_due_at: Self::parse_optional_timestamp(row, "learning_due_at")?,
            fsrs_enabled: row.get("fsrs_enabled")?,
            click_count: row.get("click_count")?,
            version: Self::parse_version(row.get("version")?)?,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
            updated_at: Self::parse_timestamp(&updated_at, "updated_at")?,
        })
    }

    /// Convert a row to ReviewLogEntry
    fn row_to_review(row: &rusqlite::Row) -> rusqlite::Result<ReviewLogEntry> {
        let review_type: String = row.get("review_type")?;
        let review_type = ReviewType::parse_name(&review_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Unknown review_type '{}'", review_type),
                )),
            )
        })?;
        let reviewed_at: String = row.get("reviewed_at")?;
        let metadata_json: String = row.get("metadata")?;

        Ok(ReviewLogEntry {
            id: row.get("id")?,
            key: CardKey::new(
                row.get::<_, String>("learner_id")?,
                row.get::<_, String>("word_id")?,
                row.get::<_, String>("mode")?,
            ),
            grade: Self::parse_grade(row.get("grade")?)?,
            review_type,
            reviewed_at: Self::parse_timestamp(&reviewed_at, "reviewed_at")?,
            scheduled_at: Self::parse_optional_timestamp(row, "scheduled_at")?,
            interval_after: row.get("interval_after")?,
            stability_before: row.get("stability_before")?,
            stability_after: row.get("stability_after")?,
            difficulty_before: row.get("difficulty_before")?,
            difficulty_after: row.get("difficulty_after")?,
            params_version: row.get("params_version")?,
            turn_id: row.get("turn_id")?,
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
        })
    }

    // ========================================================================
    // SQL HELPERS
    // ========================================================================

    fn select_card(conn: &Connection, key: &CardKey) -> Result<Option<CardState>> {
        let sql = format!(
            "SELECT {} FROM card_states WHERE learner_id = ?1 AND word_id = ?2 AND mode = ?3",
            CARD_COLUMNS
        );
        let card = conn
            .query_row(
                &sql,
                params![key.learner_id.as_str(), key.word_id.as_str(), key.mode.as_str()],
                Self::row_to_card,
            )
            .optional()?;
        Ok(card)
    }

    fn select_version(conn: &Connection, key: &CardKey) -> Result<u64> {
        let version: Option<i64> = conn
            .query_row(
                "SELECT version FROM card_states
                 WHERE learner_id = ?1 AND word_id = ?2 AND mode = ?3",
                params![key.learner_id.as_str(), key.word_id.as_str(), key.mode.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.map(Self::parse_version).transpose()?.unwrap_or(0))
    }

    fn insert_card(conn: &Connection, state: &CardState) -> Result<()> {
        conn.execute(
            "INSERT INTO card_states (
                learner_id, word_id, mode, stability, difficulty, reps, lapses,
                last_grade, interval_days, last_seen_at, next_due_at, learning_due_at,
                fsrs_enabled, click_count, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 1, ?15, ?16)",
            params![
                state.key.learner_id.as_str(),
                state.key.word_id.as_str(),
                state.key.mode.as_str(),
                state.stability(),
                state.difficulty(),
                state.reps,
                state.lapses,
                state.last_grade.map(Grade::value),
                state.interval_days,
                state.last_seen_at.map(format_timestamp),
                state.next_due_at.map(format_timestamp),
                state.learning_due_at.map(format_timestamp),
                state.fsrs_enabled,
                state.click_count,
                format_timestamp(state.created_at),
                format_timestamp(state.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Update conditioned on the observed version; returns rows changed
    fn update_card(conn: &Connection, state: &CardState, expected_version: u64) -> Result<usize> {
        let expected_version = Self::version_param(expected_version)?;
        let changed = conn.execute(
            "UPDATE card_states SET
                stability = ?4, difficulty = ?5, reps = ?6, lapses = ?7, last_grade = ?8,
                interval_days = ?9, last_seen_at = ?10, next_due_at = ?11,
                learning_due_at = ?12, fsrs_enabled = ?13, click_count = ?14,
                version = version + 1, updated_at = ?15
             WHERE learner_id = ?1 AND word_id = ?2 AND mode = ?3 AND version = ?16",
            params![
                state.key.learner_id.as_str(),
                state.key.word_id.as_str(),
                state.key.mode.as_str(),
                state.stability(),
                state.difficulty(),
                state.reps,
                state.lapses,
                state.last_grade.map(Grade::value),
                state.interval_days,
                state.last_seen_at.map(format_timestamp),
                state.next_due_at.map(format_timestamp),
                state.learning_due_at.map(format_timestamp),
                state.fsrs_enabled,
                state.click_count,
                format_timestamp(state.updated_at),
                expected_version,
            ],
        )?;
        Ok(changed)
    }

    fn insert_review(conn: &Connection, entry: &ReviewLogEntry) -> Result<()> {
        let metadata = serde_json::to_string(&entry.metadata)?;
        conn.execute(
            "INSERT INTO review_log (
                id, learner_id, word_id, mode, grade, review_type, reviewed_at,
                scheduled_at, interval_after, stability_before, stability_after,
                difficulty_before, difficulty_after, params_version, turn_id, metadata
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                entry.id,
                entry.key.learner_id.as_str(),
                entry.key.word_id.as_str(),
                entry.key.mode.as_str(),
                entry.grade.value(),
                entry.review_type.as_str(),
                format_timestamp(entry.reviewed_at),
                entry.scheduled_at.map(format_timestamp),
                entry.interval_after,
                entry.stability_before,
                entry.stability_after,
                entry.difficulty_before,
                entry.difficulty_after,
                entry.params_version,
                entry.turn_id,
                metadata,
            ],
        )?;
        Ok(())
    }

    fn query_cards(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
        modes: &[Mode],
    ) -> Result<Vec<CardState>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(sql)?;
        let cards = stmt
            .query_map(params, Self::row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards
            .into_iter()
            .filter(|card| mode_matches(modes, &card.key.mode))
            .collect())
    }

    fn query_reviews(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<ReviewLogEntry>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(sql)?;
        let entries = stmt
            .query_map(params, Self::row_to_review)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

/// Fixed-width UTC timestamps so text comparison in SQL orders correctly
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ============================================================================
// CARD STORE
// ============================================================================

impl CardStore for Storage {
    fn get_card(&self, key: &CardKey) -> Result<Option<CardState>> {
        let reader = self.lock_reader()?;
        Self::select_card(&reader, key)
    }

    fn commit(&self, commit: CardCommit) -> Result<CommitOutcome> {
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let key = commit.state.key.clone();

        let observed = Self::select_version(&tx, &key)?;
        if observed != commit.expected_version {
            let current = Self::select_card(&tx, &key)?;
            tx.rollback()?;
            tracing::debug!(
                "Version mismatch on {}: expected {}, found {}",
                key,
                commit.expected_version,
                observed
            );
            return Ok(CommitOutcome::Conflict(current));
        }

        if observed == 0 {
            Self::insert_card(&tx, &commit.state)?;
        } else if Self::update_card(&tx, &commit.state, observed)? == 0 {
            let current = Self::select_card(&tx, &key)?;
            tx.rollback()?;
            return Ok(CommitOutcome::Conflict(current));
        }

        if let Some(entry) = &commit.review {
            Self::insert_review(&tx, entry)?;
        }

        let stored = Self::select_card(&tx, &key)?
            .ok_or_else(|| SchedulerError::NotFound(format!("card {}", key)))?;
        tx.commit()?;
        Ok(CommitOutcome::Committed(stored))
    }

    fn upsert_card(&self, state: &CardState) -> Result<CardState> {
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let observed = Self::select_version(&tx, &state.key)?;
        if observed == 0 {
            Self::insert_card(&tx, state)?;
        } else {
            Self::update_card(&tx, state, observed)?;
        }
        let stored = Self::select_card(&tx, &state.key)?
            .ok_or_else(|| SchedulerError::NotFound(format!("card {}", state.key)))?;
        tx.commit()?;
        Ok(stored)
    }

    fn append_review(&self, entry: &ReviewLogEntry) -> Result<()> {
        let writer = self.lock_writer()?;
        Self::insert_review(&writer, entry)
    }

    fn learner_cards(&self, learner: &LearnerId, modes: &[Mode]) -> Result<Vec<CardState>> {
        let sql = format!(
            "SELECT {} FROM card_states WHERE learner_id = ?1",
            CARD_COLUMNS
        );
        self.query_cards(&sql, &[&learner.as_str()], modes)
    }

    fn cards_for_word(&self, learner: &LearnerId, word: &WordId) -> Result<Vec<CardState>> {
        let sql = format!(
            "SELECT {} FROM card_states WHERE learner_id = ?1 AND word_id = ?2",
            CARD_COLUMNS
        );
        self.query_cards(&sql, &[&learner.as_str(), &word.as_str()], &[])
    }

    fn count_reviews_since(
        &self,
        learner: &LearnerId,
        modes: &[Mode],
        since: DateTime<Utc>,
    ) -> Result<ReviewCounts> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT review_type, mode, COUNT(*) FROM review_log
             WHERE learner_id = ?1 AND reviewed_at >= ?2
             GROUP BY review_type, mode",
        )?;
        let rows = stmt
            .query_map(params![learner.as_str(), format_timestamp(since)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts = ReviewCounts::default();
        for (review_type, mode, n) in rows {
            if !mode_matches(modes, &Mode::from(mode)) {
                continue;
            }
            match ReviewType::parse_name(&review_type) {
                Some(t) => counts.add(t, n),
                None => tracing::warn!("Skipping unknown review_type '{}'", review_type),
            }
        }
        Ok(counts)
    }

    fn reviews_since(
        &self,
        learner: &LearnerId,
        modes: &[Mode],
        since: DateTime<Utc>,
    ) -> Result<Vec<ReviewLogEntry>> {
        let sql = format!(
            "SELECT {} FROM review_log
             WHERE learner_id = ?1 AND reviewed_at >= ?2
             ORDER BY reviewed_at ASC, rowid ASC",
            REVIEW_COLUMNS
        );
        let since = format_timestamp(since);
        let entries = self.query_reviews(&sql, &[&learner.as_str(), &since])?;
        Ok(entries
            .into_iter()
            .filter(|e| mode_matches(modes, &e.key.mode))
            .collect())
    }

    fn review_history(&self, key: &CardKey, limit: usize) -> Result<Vec<ReviewLogEntry>> {
        let sql = format!(
            "SELECT {} FROM review_log
             WHERE learner_id = ?1 AND word_id = ?2 AND mode = ?3
             ORDER BY reviewed_at DESC, rowid DESC
             LIMIT ?4",
            REVIEW_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_reviews(
            &sql,
            &[
                &key.learner_id.as_str(),
                &key.word_id.as_str(),
                &key.mode.as_str(),
                &limit,
            ],
        )
    }
}

impl SettingsProvider for Storage {
    fn settings(&self, learner: &LearnerId) -> Result<LearnerSettings> {
        Ok(self.load_settings(learner)?.unwrap_or_default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
