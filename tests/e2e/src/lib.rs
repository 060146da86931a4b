//! Lexis End-to-End Test Support
//!
//! Shared harness and fixtures for the journey, parity, queue, concurrency
//! and scenario suites under `tests/`.

pub mod harness;
pub mod mocks;

pub use harness::TestDatabaseManager;
pub use mocks::{ParityCase, TestDataFactory};
