//! External collaborators
//!
//! Word content and learner settings live outside the scheduler. The core
//! only sees these narrow traits.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::card::{LearnerId, LearnerSettings, WordId};
use crate::error::{Result, SchedulerError};

// ============================================================================
// SCOPE
// ============================================================================

/// Which words a selection may draw from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum Scope {
    /// Every word the catalog knows
    All,
    /// Members of one word list
    List(String),
}

impl Scope {
    pub fn list(id: impl Into<String>) -> Self {
        Scope::List(id.into())
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::All => write!(f, "all"),
            Scope::List(id) => write!(f, "list:{}", id),
        }
    }
}

// ============================================================================
// TRAITS
// ============================================================================

/// Word content provider
pub trait ContentCatalog: Send + Sync {
    /// Words in scope, in a stable order. `NotFound` for an unknown list.
    fn scope_words(&self, scope: &Scope) -> Result<Vec<WordId>>;

    fn word_exists(&self, word: &WordId) -> Result<bool>;
}

/// Learner settings provider
pub trait SettingsProvider: Send + Sync {
    /// Settings for a learner; unknown learners get defaults
    fn settings(&self, learner: &LearnerId) -> Result<LearnerSettings>;
}

/// The same settings for every learner
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSettings(pub LearnerSettings);

impl SettingsProvider for FixedSettings {
    fn settings(&self, _learner: &LearnerId) -> Result<LearnerSettings> {
        Ok(self.0)
    }
}

// ============================================================================
// IN-MEMORY CATALOG
// ============================================================================

#[derive(Debug, Default)]
struct CatalogInner {
    words: Vec<WordId>,
    known: HashSet<WordId>,
    lists: BTreeMap<String, Vec<WordId>>,
}

/// In-memory catalog for embedding applications, tools and tests
#[derive(Debug, Default)]
pub struct StaticCatalog {
    inner: RwLock<CatalogInner>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the given words and no lists
    pub fn with_words<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<WordId>,
    {
        let catalog = Self::new();
        for word in words {
            catalog.add_word(word);
        }
        catalog
    }

    /// Add a word; duplicates are ignored
    pub fn add_word(&self, word: impl Into<WordId>) {
        let word = word.into();
        if let Ok(mut inner) = self.inner.write() {
            if inner.known.insert(word.clone()) {
                inner.words.push(word);
            }
        }
    }

    /// Define or replace a list. Members are added to the catalog.
    pub fn set_list<I, W>(&self, list_id: impl Into<String>, members: I)
    where
        I: IntoIterator<Item = W>,
        W: Into<WordId>,
    {
        let members: Vec<WordId> = members.into_iter().map(Into::into).collect();
        for word in &members {
            self.add_word(word.clone());
        }
        if let Ok(mut inner) = self.inner.write() {
            inner.lists.insert(list_id.into(), members);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.words.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, CatalogInner>> {
        self.inner
            .read()
            .map_err(|_| SchedulerError::Init("Catalog lock poisoned".to_string()))
    }
}

impl ContentCatalog for StaticCatalog {
    fn scope_words(&self, scope: &Scope) -> Result<Vec<WordId>> {
        let inner = self.read()?;
        match scope {
            Scope::All => Ok(inner.words.clone()),
            Scope::List(id) => inner
                .lists
                .get(id)
                .cloned()
                .ok_or_else(|| SchedulerError::NotFound(format!("word list {}", id))),
        }
    }

    fn word_exists(&self, word: &WordId) -> Result<bool> {
        Ok(self.read()?.known.contains(word))
    }
}
