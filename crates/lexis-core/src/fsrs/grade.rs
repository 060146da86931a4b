//! Review grades

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Learner's self-assessment of a recall attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    /// Forgot (1)
    Fail,
    /// Recalled with serious difficulty (2)
    Hard,
    /// Recalled (3)
    Success,
    /// Recalled effortlessly (4)
    Easy,
}

impl Grade {
    /// All grades in ascending order
    pub const ALL: [Grade; 4] = [Grade::Fail, Grade::Hard, Grade::Success, Grade::Easy];

    /// Numeric grade 1..=4
    pub fn value(self) -> u8 {
        match self {
            Grade::Fail => 1,
            Grade::Hard => 2,
            Grade::Success => 3,
            Grade::Easy => 4,
        }
    }

    /// Numeric grade as f64 for the formulas
    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }

    /// Parse a numeric grade
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Grade::Fail),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Success),
            4 => Ok(Grade::Easy),
            other => Err(SchedulerError::InvalidGrade(other)),
        }
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Fail => "fail",
            Grade::Hard => "hard",
            Grade::Success => "success",
            Grade::Easy => "easy",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fail" | "again" => Some(Grade::Fail),
            "hard" => Some(Grade::Hard),
            "success" | "good" => Some(Grade::Success),
            "easy" => Some(Grade::Easy),
            _ => None,
        }
    }

    pub fn is_fail(self) -> bool {
        self == Grade::Fail
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
