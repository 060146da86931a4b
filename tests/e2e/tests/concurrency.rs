//! Concurrency Tests
//!
//! Duplicate and racing submissions against one card must produce exactly one
//! model step and one ledger entry.

use std::sync::Barrier;
use std::thread;

use chrono::Duration;
use lexis_core::{Grade, Mode, ReviewRequest, SchedulerError};
use lexis_e2e_tests::{TestDataFactory, TestDatabaseManager};

const LEARNER: &str = "learner";

#[test]
fn test_duplicate_submission_is_idempotent() {
    let db = TestDatabaseManager::new_temp();
    db.add_words(["huis"]);
    let scheduler = db.scheduler();
    let now = TestDataFactory::clock();
    let key = TestDataFactory::key(LEARNER, "huis", Mode::WORD_TO_DEFINITION);
    let req = ReviewRequest::new(key.clone(), Grade::Success)
        .expect_version(0)
        .turn_id("turn-7");

    let first = scheduler.record_review_at(&req, now).unwrap();
    let err = scheduler
        .record_review_at(&req, now + Duration::seconds(2))
        .unwrap_err();

    assert!(err.is_conflict());
    let current = err.conflict_state().expect("conflict carries the current row");
    assert_eq!(current, &first.state);
    assert_eq!(db.review_count(&key), 1);
    assert_eq!(db.card(&key).unwrap().reps, 1);
}

#[test]
fn test_racing_submissions_commit_once() {
    const THREADS: usize = 8;

    let db = TestDatabaseManager::new_temp();
    db.add_words(["boom"]);
    let scheduler = db.scheduler();
    let now = TestDataFactory::clock();
    let key = TestDataFactory::key(LEARNER, "boom", Mode::DEFINITION_TO_WORD);
    let barrier = Barrier::new(THREADS);

    let results: Vec<Result<_, SchedulerError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let scheduler = &scheduler;
                let barrier = &barrier;
                let req = ReviewRequest::new(key.clone(), Grade::Success)
                    .expect_version(0)
                    .turn_id(format!("tab-{}", i));
                s.spawn(move || {
                    barrier.wait();
                    scheduler.record_review_at(&req, now)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    });

    let committed = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| r.as_ref().err().is_some_and(SchedulerError::is_conflict))
        .count();
    assert_eq!(committed, 1);
    assert_eq!(conflicts, THREADS - 1);

    assert_eq!(db.review_count(&key), 1);
    let card = db.card(&key).unwrap();
    assert_eq!((card.version, card.reps), (1, 1));
}

#[test]
fn test_stale_version_after_other_tab_graded() {
    let db = TestDatabaseManager::new_temp();
    db.add_words(["kat"]);
    let scheduler = db.scheduler();
    let now = TestDataFactory::clock();
    let key = TestDataFactory::key(LEARNER, "kat", Mode::WORD_TO_DEFINITION);

    // Both tabs saw version 0; the first one grades
    scheduler
        .record_review_at(&ReviewRequest::new(key.clone(), Grade::Easy).expect_version(0), now)
        .unwrap();

    // The second tab's different grade is rejected, not applied on top
    let err = scheduler
        .record_review_at(
            &ReviewRequest::new(key.clone(), Grade::Fail).expect_version(0),
            now + Duration::seconds(5),
        )
        .unwrap_err();
    match err {
        SchedulerError::ConcurrencyConflict {
            expected, current, ..
        } => {
            assert_eq!(expected, 0);
            assert_eq!(current.map(|c| c.version), Some(1));
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    let card = db.card(&key).unwrap();
    assert_eq!(card.lapses, 0);
    assert_eq!(card.last_grade, Some(Grade::Easy));

    // Retrying with the fresh version goes through
    scheduler
        .record_review_at(
            &ReviewRequest::new(key.clone(), Grade::Fail).expect_version(card.version),
            now + Duration::seconds(6),
        )
        .unwrap();
    assert_eq!(db.review_count(&key), 2);
}

#[test]
fn test_ledger_survives_reopen() {
    let mut db = TestDatabaseManager::new_temp();
    db.add_words(["vis"]);
    let now = TestDataFactory::clock();
    let key = TestDataFactory::key(LEARNER, "vis", Mode::WORD_TO_DEFINITION);

    db.scheduler()
        .record_review_at(&ReviewRequest::new(key.clone(), Grade::Hard), now)
        .unwrap();
    let before = db.card(&key).unwrap();

    db.reopen();
    assert_eq!(db.card(&key).unwrap(), before);
    assert_eq!(db.review_count(&key), 1);
    let last = db.scheduler().last_review(&key).unwrap().unwrap();
    assert_eq!(last.grade, Grade::Hard);
}
