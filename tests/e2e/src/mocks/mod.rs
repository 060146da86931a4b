//! Test fixtures

mod fixtures;

pub use fixtures::{ParityCase, TestDataFactory};
