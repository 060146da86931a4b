//! Storage Module
//!
//! Persistence for card states and the review ledger:
//! - [`CardStore`] trait the scheduler depends on
//! - SQLite implementation with versioned migrations
//! - Version-conditioned commits for exactly-once review accounting

mod migrations;
mod sqlite;
mod store;

pub use migrations::MIGRATIONS;
pub use sqlite::Storage;
pub use store::{CardCommit, CardStore, CommitOutcome, ReviewCounts};
