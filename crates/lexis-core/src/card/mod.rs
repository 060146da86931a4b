//! Card Module
//!
//! Per-(learner, word, mode) scheduling records and the review ledger:
//! - Identifier newtypes and the composite [`CardKey`]
//! - [`CardState`] with its new/learning/review phase
//! - [`ReviewLogEntry`] audit rows
//! - [`LearnerSettings`] caps and retention target

mod review_log;
mod settings;
mod state;

use serde::{Deserialize, Serialize};

pub use review_log::{ReviewLogEntry, ReviewMetadata, ReviewType};
pub use settings::LearnerSettings;
pub use state::{CardPhase, CardState};

// ============================================================================
// IDENTIFIERS
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Opaque learner identifier
    LearnerId
);

string_id!(
    /// Opaque word identifier owned by the content catalog
    WordId
);

string_id!(
    /// Training mode, the direction a card is asked in
    Mode
);

impl Mode {
    /// Show the word, recall its definition
    pub const WORD_TO_DEFINITION: &'static str = "word-to-definition";
    /// Show the definition, recall the word
    pub const DEFINITION_TO_WORD: &'static str = "definition-to-word";

    pub fn word_to_definition() -> Self {
        Self::new(Self::WORD_TO_DEFINITION)
    }

    pub fn definition_to_word() -> Self {
        Self::new(Self::DEFINITION_TO_WORD)
    }
}

/// Composite identity of a card
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardKey {
    pub learner_id: LearnerId,
    pub word_id: WordId,
    pub mode: Mode,
}

impl CardKey {
    pub fn new(
        learner_id: impl Into<LearnerId>,
        word_id: impl Into<WordId>,
        mode: impl Into<Mode>,
    ) -> Self {
        Self {
            learner_id: learner_id.into(),
            word_id: word_id.into(),
            mode: mode.into(),
        }
    }
}

impl std::fmt::Display for CardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.learner_id, self.word_id, self.mode)
    }
}
