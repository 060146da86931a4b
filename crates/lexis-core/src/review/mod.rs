//! Review Module
//!
//! Grading, freeze, hide and click events applied to card states.

mod action;
mod recorder;

pub use action::{ReviewAction, ReviewOutcome, ReviewRequest};
pub use recorder::ReviewRecorder;
