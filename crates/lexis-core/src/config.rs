//! Scheduler configuration
//!
//! Loaded from a TOML file, then overridden by `LEXIS_*` environment
//! variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `LEXIS_MODES` | `modes` (comma separated) |
//! | `LEXIS_RELEARN_STEP_MINUTES` | `relearn_step_minutes` |
//! | `LEXIS_MAXIMUM_INTERVAL_DAYS` | `maximum_interval_days` |
//! | `LEXIS_MAX_ELAPSED_DAYS` | `max_elapsed_days` |
//! | `LEXIS_FALLBACK_ENABLED` | `fallback_enabled` |
//! | `LEXIS_DAY_OFFSET_MINUTES` | `day_offset_minutes` |

use std::path::Path;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::card::Mode;
use crate::error::{Result, SchedulerError};
use crate::fsrs::Fsrs6Parameters;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Tunables of the scheduling core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Training modes new cards are drawn in
    pub modes: Vec<Mode>,
    /// Upper bound of the learning step after a fail
    pub relearn_step_minutes: u32,
    /// Cap applied to graduated intervals when scheduling
    pub maximum_interval_days: f64,
    /// Cap on elapsed days fed to the model; `None` leaves it uncapped
    pub max_elapsed_days: Option<f64>,
    /// Serve any non-hidden in-scope card once both pools are empty
    pub fallback_enabled: bool,
    /// Learner day boundary as an offset from UTC, in minutes
    pub day_offset_minutes: i32,
    pub parameters: Fsrs6Parameters,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            modes: vec![Mode::word_to_definition(), Mode::definition_to_word()],
            relearn_step_minutes: 10,
            maximum_interval_days: 36_500.0,
            max_elapsed_days: None,
            fallback_enabled: false,
            day_offset_minutes: 0,
            parameters: Fsrs6Parameters::default(),
        }
    }
}

impl SchedulerConfig {
    /// Load from a TOML file; missing fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| SchedulerError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SchedulerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with process environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `LEXIS_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(modes) = lookup("LEXIS_MODES") {
            self.modes = modes
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(Mode::from)
                .collect();
        }
        if let Some(v) = lookup("LEXIS_RELEARN_STEP_MINUTES") {
            self.relearn_step_minutes = parse_var("LEXIS_RELEARN_STEP_MINUTES", &v)?;
        }
        if let Some(v) = lookup("LEXIS_MAXIMUM_INTERVAL_DAYS") {
            self.maximum_interval_days = parse_var("LEXIS_MAXIMUM_INTERVAL_DAYS", &v)?;
        }
        if let Some(v) = lookup("LEXIS_MAX_ELAPSED_DAYS") {
            self.max_elapsed_days = if v.trim().is_empty() {
                None
            } else {
                Some(parse_var("LEXIS_MAX_ELAPSED_DAYS", &v)?)
            };
        }
        if let Some(v) = lookup("LEXIS_FALLBACK_ENABLED") {
            self.fallback_enabled = matches!(
                v.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(v) = lookup("LEXIS_DAY_OFFSET_MINUTES") {
            self.day_offset_minutes = parse_var("LEXIS_DAY_OFFSET_MINUTES", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.modes.is_empty() {
            return Err(SchedulerError::Config(
                "at least one training mode is required".to_string(),
            ));
        }
        if self.relearn_step_minutes == 0 {
            return Err(SchedulerError::Config(
                "relearn_step_minutes must be positive".to_string(),
            ));
        }
        if !(self.maximum_interval_days.is_finite() && self.maximum_interval_days >= 1.0) {
            return Err(SchedulerError::Config(format!(
                "maximum_interval_days must be at least 1, got {}",
                self.maximum_interval_days
            )));
        }
        if let Some(cap) = self.max_elapsed_days {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(SchedulerError::Config(format!(
                    "max_elapsed_days must be positive, got {}",
                    cap
                )));
            }
        }
        if self.day_offset_minutes.abs() >= MINUTES_PER_DAY {
            return Err(SchedulerError::Config(format!(
                "day_offset_minutes must be within one day, got {}",
                self.day_offset_minutes
            )));
        }
        self.parameters.validate()
    }

    /// Learning step after a fail, in days
    pub fn relearn_step_days(&self) -> f64 {
        f64::from(self.relearn_step_minutes) / f64::from(MINUTES_PER_DAY)
    }

    /// UTC instant at which the learner day containing `now` started
    pub fn day_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let offset = Duration::minutes(i64::from(self.day_offset_minutes));
        let local_midnight = (now.naive_utc() + offset).date().and_time(NaiveTime::MIN);
        Utc.from_utc_datetime(&(local_midnight - offset))
    }

    /// UTC instant at which the next learner day starts
    pub fn next_day_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.day_start(now) + Duration::days(1)
    }

    /// Both instants fall on the same learner day
    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.day_start(a) == self.day_start(b)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| SchedulerError::Config(format!("{}={}: {}", key, value, e)))
}

// ============================================================================
// TESTS
// ============================================================================
