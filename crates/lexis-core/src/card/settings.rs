//! Per-learner study settings

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Daily caps and retention target, owned by the learner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LearnerSettings {
    /// New cards per learner day
    pub daily_new_limit: u32,
    /// Learning plus review grades per learner day
    pub daily_review_limit: u32,
    /// Recall probability the intervals aim for, strictly within (0, 1)
    pub target_retention: f64,
    /// Review turns per new turn
    pub new_review_ratio: u32,
}

impl Default for LearnerSettings {
    fn default() -> Self {
        Self {
            daily_new_limit: 10,
            daily_review_limit: 40,
            target_retention: 0.9,
            new_review_ratio: 2,
        }
    }
}

impl LearnerSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.target_retention > 0.0 && self.target_retention < 1.0) {
            return Err(SchedulerError::InvalidSettings(format!(
                "target_retention must be within (0, 1), got {}",
                self.target_retention
            )));
        }
        if self.new_review_ratio < 1 {
            return Err(SchedulerError::InvalidSettings(
                "new_review_ratio must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
